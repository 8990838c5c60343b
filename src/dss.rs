//! Dynamic SPAD selection.
//!
//! After each sample the number of enabled SPADs for the next one is derived
//! from the observed rate per SPAD so that the total return rate stays near
//! [`TARGET_RATE`].

use crate::ranging::ResultBuffer;

/// Target total rate in `DSS_CONFIG__TARGET_TOTAL_RATE_MCPS` (9.7 MCPS).
pub(crate) const TARGET_RATE: u16 = 0x0A00;

/// Requested SPAD count used when the rate per SPAD cannot be computed.
const MID_POINT_SPADS: u16 = 0x8000;

/// Effective SPAD count (8.8 format) to request for the next sample.
pub(crate) fn required_effective_spads(results: &ResultBuffer) -> u16 {
    let spad_count = u32::from(results.dss_actual_effective_spads_sd0);
    if spad_count != 0 {
        let total_rate = (u32::from(results.peak_signal_count_rate_crosstalk_corrected_mcps_sd0)
            + u32::from(results.ambient_count_rate_mcps_sd0))
        .min(0xFFFF);

        // shifted up to keep precision through the division
        let total_rate_per_spad = (total_rate << 16) / spad_count;

        if total_rate_per_spad != 0 {
            let required_spads = ((u32::from(TARGET_RATE) << 16) / total_rate_per_spad).min(0xFFFF);
            #[allow(clippy::cast_possible_truncation)]
            return required_spads as u16;
        }
    }

    debug!("DSS rate per SPAD unavailable, requesting mid point");
    MID_POINT_SPADS
}
