//! Conversions between macro-clock timeout register encodings and
//! microseconds.
//!
//! Macro periods are carried in 12.12 fixed point microseconds, as the
//! sensor firmware does, so every rounding step here matches the values the
//! device latches.

/// Number of VCSEL periods in one macro period.
const MACRO_PERIOD_VCSEL_PERIODS: u64 = 2304;

/// Decodes a timeout register value into macro clocks.
///
/// The register holds `(mantissa << exponent) + 1` with the mantissa in the
/// low byte and the exponent in the high byte. The all-zero word and
/// exponents that overflow 32 bits decode to `0`.
#[must_use]
pub fn decode_timeout(encoded: u16) -> u32 {
    if encoded == 0 {
        return 0;
    }
    let mantissa = u64::from(encoded & 0x00FF);
    let exponent = u32::from(encoded >> 8);
    if exponent >= 32 {
        return 0;
    }
    u32::try_from((mantissa << exponent) + 1).unwrap_or(0)
}

/// Encodes a macro clock count into the timeout register format.
///
/// Exact for counts up to 256. Above that the low `exponent` bits of
/// `mclks - 1` are dropped, so `decode_timeout(encode_timeout(m))` lands in
/// `(m - 2^exponent, m]`. A single macro clock is stored as `0x0100`
/// (mantissa 0, exponent 1) since the all-zero word is reserved for `0`.
#[must_use]
pub fn encode_timeout(mclks: u32) -> u16 {
    match mclks {
        0 => return 0,
        1 => return 0x0100,
        _ => {}
    }
    let mut mantissa = mclks - 1;
    let mut exponent: u16 = 0;
    while mantissa > 0xFF {
        mantissa >>= 1;
        exponent += 1;
    }
    #[allow(clippy::cast_possible_truncation)]
    let mantissa = mantissa as u16;
    (exponent << 8) | mantissa
}

/// Converts a macro clock count to microseconds, rounding half up.
#[must_use]
pub fn timeout_mclks_to_microseconds(mclks: u32, macro_period_us: u32) -> u32 {
    let us = (u64::from(mclks) * u64::from(macro_period_us) + 0x800) >> 12;
    u32::try_from(us).unwrap_or(u32::MAX)
}

/// Converts microseconds to a macro clock count, rounding half up.
///
/// Returns `0` for a zero macro period (oscillator not read yet).
#[must_use]
pub fn timeout_microseconds_to_mclks(us: u32, macro_period_us: u32) -> u32 {
    if macro_period_us == 0 {
        return 0;
    }
    let mclks = ((u64::from(us) << 12) + u64::from(macro_period_us >> 1))
        / u64::from(macro_period_us);
    u32::try_from(mclks).unwrap_or(u32::MAX)
}

/// Macro period in 12.12 fixed point microseconds for a VCSEL period
/// register value.
///
/// `fast_osc_frequency` is the 4.12 MHz value from
/// `OSC_MEASURED__FAST_OSC__FREQUENCY`. A zero frequency yields `0`.
#[must_use]
pub fn calc_macro_period(fast_osc_frequency: u16, vcsel_period: u8) -> u32 {
    if fast_osc_frequency == 0 {
        return 0;
    }
    // PLL period in 0.24 format
    let pll_period_us = (1u64 << 30) / u64::from(fast_osc_frequency);
    let vcsel_period_pclks = (u64::from(vcsel_period) + 1) << 1;

    let mut macro_period_us = MACRO_PERIOD_VCSEL_PERIODS * pll_period_us;
    macro_period_us >>= 6;
    macro_period_us *= vcsel_period_pclks;
    macro_period_us >>= 6;

    u32::try_from(macro_period_us).unwrap_or(u32::MAX)
}
