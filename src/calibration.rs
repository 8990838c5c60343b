//! One-shot VHV calibration for low-power autonomous ranging.
//!
//! The first sample of a run carries the result of the sensor's automatic
//! VHV and phase calibration. After that sample the driver pins both values
//! so later samples skip the calibration steps. Anything that changes the
//! timing or stops ranging undoes the pinning.

#[cfg(not(feature = "async"))]
use embedded_hal::i2c::I2c;
#[cfg(feature = "async")]
use embedded_hal_async::i2c::I2c;

use crate::{Error, Register, VL53L1x};

/// VHV search loop bound used once calibration is pinned (tuning default).
const LOWPOWER_AUTO_VHV_LOOP_BOUND: u8 = 3;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CalibrationState {
    /// Calibration has been pinned for the current run
    pub(crate) performed: bool,
    /// Device VHV settings from before pinning, held until they are restored
    saved: Option<SavedVhv>,
}

#[derive(Debug, Clone, Copy)]
struct SavedVhv {
    init: u8,
    timeout: u8,
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), keep_self),
    async(feature = "async", keep_self)
)]
impl<I2C, E, D, C> VL53L1x<I2C, D, C>
where
    I2C: I2c<Error = E>,
    E: embedded_hal::i2c::Error,
{
    /// Pins the VHV and phase calibration found by the first sample.
    ///
    /// The device settings are only read while none are held, so a retry
    /// after a failed attempt never saves already pinned values.
    pub(crate) async fn setup_manual_calibration(&mut self) -> Result<(), Error<E>> {
        debug!("Pinning VHV and phase calibration");
        let saved = match self.calibration.saved {
            Some(saved) => saved,
            None => {
                let init = self.read_byte(Register::VhvConfigInit).await?;
                let timeout = self.read_byte(Register::VhvConfigTimeoutMacropLoopBound).await?;
                let saved = SavedVhv { init, timeout };
                self.calibration.saved = Some(saved);
                saved
            }
        };

        // bit 7 clear: do not rerun the VHV search
        self.write_byte(Register::VhvConfigInit, saved.init & 0x7F)
            .await?;
        self.write_byte(
            Register::VhvConfigTimeoutMacropLoopBound,
            (saved.timeout & 0x03) + (LOWPOWER_AUTO_VHV_LOOP_BOUND << 2),
        )
        .await?;

        self.write_byte(Register::PhasecalConfigOverride, 0x01).await?;
        let vcsel_start = self.read_byte(Register::PhasecalResultVcselStart).await?;
        self.write_byte(Register::CalConfigVcselStart, vcsel_start)
            .await?;

        self.calibration.performed = true;
        Ok(())
    }

    /// Forces calibration to run again on the next sample.
    ///
    /// Does nothing unless calibration is currently pinned. Calibration
    /// stays marked as pinned if restoring fails.
    pub(crate) async fn invalidate_calibration(&mut self) -> Result<(), Error<E>> {
        if !self.calibration.performed {
            return Ok(());
        }
        self.restore_vhv_configuration().await?;
        self.calibration.performed = false;
        Ok(())
    }

    /// Writes back the VHV settings saved before pinning and releases the
    /// phase calibration override.
    pub(crate) async fn restore_vhv_configuration(&mut self) -> Result<(), Error<E>> {
        debug!("Restoring automatic VHV and phase calibration");
        if let Some(saved) = self.calibration.saved {
            if saved.init != 0 {
                self.write_byte(Register::VhvConfigInit, saved.init).await?;
            }
            if saved.timeout != 0 {
                self.write_byte(Register::VhvConfigTimeoutMacropLoopBound, saved.timeout)
                    .await?;
            }
        }
        self.write_byte(Register::PhasecalConfigOverride, 0x00).await?;
        self.calibration.saved = None;
        Ok(())
    }
}
