//! Continuous acquisition and sample decoding.

#[cfg(not(feature = "async"))]
use embedded_hal::i2c::I2c;
#[cfg(feature = "async")]
use embedded_hal_async::i2c::I2c;

use crate::dss;
use crate::status::decode_device_status;
use crate::{ClockSource, Error, RangeStatus, Register, VL53L1x};

/// Length of the result block starting at `RESULT__RANGE_STATUS`.
const RESULT_BLOCK_LEN: usize = 17;

/// Gain applied to the raw range (tuning default, 5.11 format).
const LITE_RANGING_GAIN_FACTOR: u32 = 2011;

/// Where continuous ranging stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AcquisitionState {
    /// Ranging is stopped
    Stopped,
    /// Ranging, calibration runs with the next sample
    Starting,
    /// Ranging with pinned calibration
    Running,
}

/// Raw result registers of one sample.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ResultBuffer {
    pub(crate) range_status: u8,
    pub(crate) stream_count: u8,
    /// 8.8 format
    pub(crate) dss_actual_effective_spads_sd0: u16,
    /// 9.7 format
    pub(crate) ambient_count_rate_mcps_sd0: u16,
    pub(crate) final_crosstalk_corrected_range_mm_sd0: u16,
    /// 9.7 format
    pub(crate) peak_signal_count_rate_crosstalk_corrected_mcps_sd0: u16,
}

impl ResultBuffer {
    fn from_bytes(data: &[u8; RESULT_BLOCK_LEN]) -> Self {
        let word = |offset: usize| u16::from_be_bytes([data[offset], data[offset + 1]]);
        Self {
            range_status: data[0],
            // data[1]: report status
            stream_count: data[2],
            dss_actual_effective_spads_sd0: word(3),
            // data[5..7]: peak signal count rate
            ambient_count_rate_mcps_sd0: word(7),
            // data[9..13]: sigma and phase
            final_crosstalk_corrected_range_mm_sd0: word(13),
            peak_signal_count_rate_crosstalk_corrected_mcps_sd0: word(15),
        }
    }
}

/// A decoded ranging sample.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RangingData {
    /// Distance to the target in millimeters
    pub range_mm: u16,
    /// Quality of the sample; only trust `range_mm` if this is valid
    pub range_status: RangeStatus,
    /// Peak signal rate in mega counts per second
    pub peak_signal_count_rate_mcps: f32,
    /// Ambient rate in mega counts per second
    pub ambient_count_rate_mcps: f32,
}

impl RangingData {
    fn from_results(results: &ResultBuffer) -> Self {
        let range = u32::from(results.final_crosstalk_corrected_range_mm_sd0);
        let range_mm = (range * LITE_RANGING_GAIN_FACTOR + 0x400) / 0x800;

        Self {
            // gain is below 1, so the range never grows past 16 bits
            range_mm: u16::try_from(range_mm).unwrap_or(u16::MAX),
            range_status: decode_device_status(results.range_status, results.stream_count),
            peak_signal_count_rate_mcps: count_rate_to_mcps(
                results.peak_signal_count_rate_crosstalk_corrected_mcps_sd0,
            ),
            ambient_count_rate_mcps: count_rate_to_mcps(results.ambient_count_rate_mcps_sd0),
        }
    }

    fn no_update() -> Self {
        Self {
            range_mm: 0,
            range_status: RangeStatus::NoUpdate,
            peak_signal_count_rate_mcps: 0.0,
            ambient_count_rate_mcps: 0.0,
        }
    }
}

// 9.7 fixed point to float
fn count_rate_to_mcps(rate: u16) -> f32 {
    f32::from(rate) / 128.0
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), keep_self),
    async(feature = "async", keep_self)
)]
impl<I2C, E, D, C> VL53L1x<I2C, D, C>
where
    I2C: I2c<Error = E>,
    E: embedded_hal::i2c::Error,
    C: ClockSource,
{
    /// Starts continuous ranging.
    ///
    /// The sensor takes a sample every `period_ms` milliseconds and sleeps in
    /// between. The period should be at least as long as the timing budget;
    /// a shorter period makes the sensor range back to back. The first sample
    /// after starting also runs calibration.
    ///
    /// # Arguments
    ///
    /// * `period_ms` - Inter-measurement period in milliseconds
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use vl53l1x_continuous::VL53L1x;
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    /// let mut sensor = VL53L1x::new(i2c, delay, || 0u32);
    ///
    /// sensor.init(true).unwrap();
    /// sensor.start_continuous(100).unwrap();
    /// ```
    pub async fn start_continuous(&mut self, period_ms: u32) -> Result<(), Error<E>> {
        self.invalidate_calibration().await?;
        self.write_dword(
            Register::SystemIntermeasurementPeriod,
            period_ms.saturating_mul(u32::from(self.osc_calibrate_val)),
        )
        .await?;
        self.clear_interrupt().await?;
        self.write_byte(Register::SystemModeStart, 0x40).await?;
        self.running = true;
        info!("Continuous ranging started, period {} ms", period_ms);
        Ok(())
    }

    /// Stops continuous ranging and re-enables automatic calibration.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn stop_continuous(&mut self) -> Result<(), Error<E>> {
        self.write_byte(Register::SystemModeStart, 0x80).await?;
        self.running = false;
        self.calibration.performed = false;
        self.restore_vhv_configuration().await?;
        info!("Continuous ranging stopped");
        Ok(())
    }

    /// Checks whether a new sample is available.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - A sample is waiting to be read
    /// * `Ok(false)` - No new sample yet
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn check_for_data_ready(&mut self) -> Result<bool, Error<E>> {
        let status = self.read_byte(Register::GpioTioHvStatus).await?;
        // interrupt output is active low
        Ok(status & 0x01 == 0)
    }

    /// Clears the data ready interrupt so the next sample can be signalled.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn clear_interrupt(&mut self) -> Result<(), Error<E>> {
        self.write_byte(Register::SystemInterruptClear, 0x01).await
    }

    /// Reads the next sample and returns its distance in millimeters.
    ///
    /// With `blocking` set, waits for a sample until the IO timeout expires
    /// (see [`set_timeout`](Self::set_timeout)). On expiry the call returns
    /// `Ok(0)`, [`timeout_occurred`](Self::timeout_occurred) turns true and
    /// the stored sample reads as [`RangeStatus::NoUpdate`]. Without
    /// `blocking` the caller is expected to have checked
    /// [`check_for_data_ready`](Self::check_for_data_ready).
    ///
    /// The complete sample is available from
    /// [`get_ranging_data`](Self::get_ranging_data) afterwards.
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotRunning)` - If continuous ranging has not been started
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error.
    ///   When only the calibration or DSS writes failed, the sample is still
    ///   stored and the interrupt cleared.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use vl53l1x_continuous::VL53L1x;
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    /// let mut sensor = VL53L1x::new(i2c, delay, || 0u32);
    ///
    /// sensor.init(true).unwrap();
    /// sensor.start_continuous(50).unwrap();
    /// let distance = sensor.read(true).unwrap();
    /// match sensor.get_ranging_data() {
    ///     Some(data) if data.range_status.is_valid() => println!("{} mm", distance),
    ///     Some(data) => println!("Invalid sample: {}", data.range_status),
    ///     None => println!("No sample"),
    /// }
    /// ```
    pub async fn read(&mut self, blocking: bool) -> Result<u16, Error<E>> {
        if !self.running {
            warn!("Read requested while ranging is stopped");
            return Err(Error::NotRunning);
        }

        if blocking {
            self.io_timeout.start(&self.clock);
            while !self.check_for_data_ready().await? {
                if self.io_timeout.expired(&self.clock) {
                    warn!("Timed out waiting for a sample");
                    self.did_timeout = true;
                    self.ranging_data = Some(RangingData::no_update());
                    return Ok(0);
                }
            }
        }

        let data = self.acquire_sample().await?;
        Ok(data.range_mm)
    }

    /// Same as [`read`](Self::read).
    ///
    /// # Errors
    ///
    /// See [`read`](Self::read).
    pub async fn read_range_continuous_millimeters(&mut self, blocking: bool) -> Result<u16, Error<E>> {
        self.read(blocking).await
    }

    /// Reads a sample if one is ready, without waiting.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(data))` - The newly read sample
    /// * `Ok(None)` - No new sample yet
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotRunning)` - If continuous ranging has not been started
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn try_read(&mut self) -> Result<Option<RangingData>, Error<E>> {
        if !self.running {
            return Err(Error::NotRunning);
        }
        if !self.check_for_data_ready().await? {
            return Ok(None);
        }
        self.acquire_sample().await.map(Some)
    }

    // Once the result block is in, the cycle runs to the end: a failed
    // calibration or DSS write still stores the sample and clears the
    // interrupt, and the first failure is reported afterwards.
    async fn acquire_sample(&mut self) -> Result<RangingData, Error<E>> {
        let mut block = [0u8; RESULT_BLOCK_LEN];
        self.read_bytes(Register::ResultRangeStatus, &mut block)
            .await?;
        let results = ResultBuffer::from_bytes(&block);

        let calibrated = if self.calibration.performed {
            Ok(())
        } else {
            self.setup_manual_calibration().await
        };

        let dss_updated = self
            .write_word(
                Register::DssConfigManualEffectiveSpadsSelect,
                dss::required_effective_spads(&results),
            )
            .await;

        let data = RangingData::from_results(&results);
        trace!("Sample: {} mm, status {}", data.range_mm, u8::from(data.range_status));
        self.ranging_data = Some(data);
        self.did_timeout = false;

        let cleared = self.clear_interrupt().await;
        self.keep_failure(calibrated.and(dss_updated).and(cleared))?;
        Ok(data)
    }
}

impl<I2C, D, C> VL53L1x<I2C, D, C> {
    /// Returns whether ranging is stopped, waiting for its calibration
    /// sample, or running with pinned calibration.
    pub fn get_acquisition_state(&self) -> AcquisitionState {
        match (self.running, self.calibration.performed) {
            (false, _) => AcquisitionState::Stopped,
            (true, false) => AcquisitionState::Starting,
            (true, true) => AcquisitionState::Running,
        }
    }
}

#[cfg(all(test, not(feature = "async")))]
mod tests {
    use super::*;
    use crate::testing::{initialized_sensor, FakeSensor};

    #[test]
    fn result_block_layout() {
        let mut block = [0u8; RESULT_BLOCK_LEN];
        block[0] = 0x09;
        block[2] = 0x07;
        block[3..5].copy_from_slice(&0x1234u16.to_be_bytes());
        block[7..9].copy_from_slice(&0x0040u16.to_be_bytes());
        block[13..15].copy_from_slice(&1000u16.to_be_bytes());
        block[15..17].copy_from_slice(&0x0280u16.to_be_bytes());

        let results = ResultBuffer::from_bytes(&block);
        assert_eq!(results.range_status, 0x09);
        assert_eq!(results.stream_count, 0x07);
        assert_eq!(results.dss_actual_effective_spads_sd0, 0x1234);
        assert_eq!(results.ambient_count_rate_mcps_sd0, 0x0040);
        assert_eq!(results.final_crosstalk_corrected_range_mm_sd0, 1000);
        assert_eq!(
            results.peak_signal_count_rate_crosstalk_corrected_mcps_sd0,
            0x0280
        );
    }

    #[test]
    fn samples_are_scaled_by_the_range_gain() {
        let results = ResultBuffer {
            range_status: 9,
            stream_count: 1,
            final_crosstalk_corrected_range_mm_sd0: 1000,
            peak_signal_count_rate_crosstalk_corrected_mcps_sd0: 0x0280,
            ambient_count_rate_mcps_sd0: 0x0040,
            ..ResultBuffer::default()
        };
        let data = RangingData::from_results(&results);
        assert_eq!(data.range_mm, 982);
        assert_eq!(data.range_status, RangeStatus::RangeValid);
        assert!((data.peak_signal_count_rate_mcps - 5.0).abs() < f32::EPSILON);
        assert!((data.ambient_count_rate_mcps - 0.5).abs() < f32::EPSILON);

        let results = ResultBuffer {
            final_crosstalk_corrected_range_mm_sd0: u16::MAX,
            ..results
        };
        assert_eq!(RangingData::from_results(&results).range_mm, 64_351);
    }

    #[test]
    fn start_programs_the_period_in_oscillator_ticks() {
        let mut sensor = initialized_sensor();
        sensor.start_continuous(100).unwrap();
        assert_eq!(
            sensor.i2c.dword(Register::SystemIntermeasurementPeriod),
            100 * u32::from(FakeSensor::OSC_CALIBRATE_VAL)
        );
        assert_eq!(sensor.i2c.writes_to(Register::SystemModeStart), [0x40]);
        assert_eq!(sensor.get_acquisition_state(), AcquisitionState::Starting);
    }

    #[test]
    fn start_saturates_long_periods() {
        let mut sensor = initialized_sensor();
        sensor.start_continuous(u32::MAX).unwrap();
        assert_eq!(
            sensor.i2c.dword(Register::SystemIntermeasurementPeriod),
            u32::MAX
        );
    }

    #[test]
    fn reading_while_stopped_is_refused() {
        let mut sensor = initialized_sensor();
        assert!(matches!(sensor.read(true), Err(Error::NotRunning)));
        assert!(matches!(sensor.try_read(), Err(Error::NotRunning)));
        assert_eq!(sensor.get_ranging_data(), None);
    }

    #[test]
    fn read_decodes_and_acknowledges_the_sample() {
        let mut sensor = initialized_sensor();
        sensor.start_continuous(60).unwrap();
        sensor.i2c.latch_sample(9, 3, 200 << 8, 0x0040, 1000, 0x0280);

        assert_eq!(sensor.read(true).unwrap(), 982);
        let data = sensor.get_ranging_data().unwrap();
        assert_eq!(data.range_status, RangeStatus::RangeValid);
        assert!(!sensor.timeout_occurred());
        assert!(!sensor.check_for_data_ready().unwrap());
        assert_ne!(
            sensor.i2c.word(Register::DssConfigManualEffectiveSpadsSelect),
            200 << 8
        );
    }

    #[test]
    fn alias_reads_the_same_sample() {
        let mut sensor = initialized_sensor();
        sensor.start_continuous(60).unwrap();
        sensor.i2c.latch_sample(9, 3, 200 << 8, 0x0040, 1000, 0x0280);
        assert_eq!(sensor.read_range_continuous_millimeters(false).unwrap(), 982);
    }

    #[test]
    fn blocking_read_times_out() {
        let mut sensor = initialized_sensor();
        sensor.set_timeout(50);
        sensor.start_continuous(60).unwrap();

        let started = sensor.clock.now.get();
        assert_eq!(sensor.read(true).unwrap(), 0);
        let elapsed = sensor.clock.now.get() - started;

        assert!((50..=60).contains(&elapsed), "gave up after {elapsed} ms");
        assert!(sensor.timeout_occurred());
        let data = sensor.get_ranging_data().unwrap();
        assert_eq!(data.range_status, RangeStatus::NoUpdate);
        assert_eq!(data.range_mm, 0);
    }

    #[test]
    fn timeout_flag_is_sticky_until_the_next_sample() {
        let mut sensor = initialized_sensor();
        sensor.set_timeout(10);
        sensor.start_continuous(60).unwrap();
        sensor.read(true).unwrap();
        assert!(sensor.timeout_occurred());
        assert!(sensor.timeout_occurred());

        sensor.i2c.latch_sample(9, 3, 200 << 8, 0x0040, 1000, 0x0280);
        sensor.read(true).unwrap();
        assert!(!sensor.timeout_occurred());
    }

    #[test]
    fn zero_timeout_waits_for_the_sample() {
        let mut sensor = initialized_sensor();
        sensor.set_timeout(0);
        sensor.start_continuous(60).unwrap();
        sensor.i2c.latch_sample_after_polls(5_000, 9, 3, 200 << 8, 0x0040, 1000, 0x0280);

        assert_eq!(sensor.read(true).unwrap(), 982);
        assert!(!sensor.timeout_occurred());
    }

    #[test]
    fn try_read_returns_none_until_a_sample_arrives() {
        let mut sensor = initialized_sensor();
        sensor.start_continuous(60).unwrap();
        assert_eq!(sensor.try_read().unwrap(), None);

        sensor.i2c.latch_sample(4, 3, 200 << 8, 0x0040, 0, 0);
        let data = sensor.try_read().unwrap().unwrap();
        assert_eq!(data.range_status, RangeStatus::SignalFail);
        assert_eq!(sensor.get_ranging_data(), Some(data));
    }

    #[test]
    fn failed_dss_write_still_delivers_the_sample() {
        let mut sensor = initialized_sensor();
        sensor.start_continuous(60).unwrap();
        sensor.i2c.latch_sample(9, 3, 200 << 8, 0x0040, 1000, 0x0280);
        sensor.i2c.fail_writes_to = Some(Register::DssConfigManualEffectiveSpadsSelect.into());

        assert!(matches!(sensor.read(true), Err(Error::I2cError(_))));
        assert_eq!(sensor.get_last_status(), Some(embedded_hal::i2c::ErrorKind::Other));
        let data = sensor.get_ranging_data().unwrap();
        assert_eq!(data.range_mm, 982);
        assert_eq!(data.range_status, RangeStatus::RangeValid);
        // interrupt was still acknowledged
        assert!(!sensor.check_for_data_ready().unwrap());
        // calibration ran before the failing write
        assert_eq!(sensor.get_acquisition_state(), AcquisitionState::Running);
    }

    #[test]
    fn bus_error_keeps_the_previous_sample() {
        let mut sensor = initialized_sensor();
        sensor.start_continuous(60).unwrap();
        sensor.i2c.latch_sample(9, 3, 200 << 8, 0x0040, 1000, 0x0280);
        sensor.read(true).unwrap();
        let previous = sensor.get_ranging_data();

        sensor.i2c.latch_sample(9, 4, 200 << 8, 0x0040, 2000, 0x0280);
        sensor.i2c.fail_io = true;
        assert!(matches!(sensor.read(false), Err(Error::I2cError(_))));
        assert_eq!(sensor.get_ranging_data(), previous);
        assert!(sensor.get_last_status().is_some());
    }
}
