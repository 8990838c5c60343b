//! # VL53L1X Time-of-Flight Distance Sensor Driver
//!
//! This crate provides a `no_std` driver for ST-Microelectronics' VL53L1X
//! time-of-flight ranging sensor running in low-power autonomous continuous
//! mode. Enable the `async` feature to get the same API on top of
//! `embedded-hal-async`.
//!
//! The driver translates a timing budget and distance mode into the sensor's
//! macro-clock timeout registers, performs the one-time VHV calibration on
//! the first sample of a run, and adjusts the number of active SPADs after
//! every sample (dynamic SPAD selection).
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use vl53l1x_continuous::{DistanceMode, VL53L1x};
//!
//! let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
//! let delay = embedded_hal_mock::eh1::delay::NoopDelay;
//! // replace with a monotonic millisecond counter
//! let clock = || 0u32;
//! let mut sensor = VL53L1x::new(i2c, delay, clock);
//!
//! sensor.set_timeout(500);
//! sensor.init(true).unwrap();
//! sensor.set_distance_mode(DistanceMode::Long).unwrap();
//! sensor.set_measurement_timing_budget(50_000).unwrap();
//! sensor.start_continuous(50).unwrap();
//!
//! loop {
//!     let distance_mm = sensor.read(true).unwrap();
//!     if sensor.timeout_occurred() {
//!         println!("Timed out waiting for a sample");
//!         continue;
//!     }
//!     if let Some(data) = sensor.get_ranging_data() {
//!         println!("Distance: {} mm ({})", distance_mm, data.range_status);
//!     }
//! }
//! ```
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod fmt; // <-- must be first module!

mod calibration;
mod config;
mod dss;
mod ranging;
mod register;
mod status;
#[cfg(all(test, not(feature = "async")))]
mod testing;
mod timeout;
mod timing;

#[cfg(not(feature = "async"))]
use embedded_hal::{delay::DelayNs, i2c::I2c};
#[cfg(feature = "async")]
use embedded_hal_async::{delay::DelayNs, i2c::I2c};

use embedded_hal::i2c::ErrorKind;

use calibration::CalibrationState;
pub use config::{DistanceMode, TIMING_GUARD_US};
pub use ranging::{AcquisitionState, RangingData};
pub use register::Register;
pub use status::{range_status_to_string, RangeStatus};
pub use timeout::ClockSource;
use timeout::IoTimeout;
pub use timing::{
    calc_macro_period, decode_timeout, encode_timeout, timeout_mclks_to_microseconds,
    timeout_microseconds_to_mclks,
};

/// The default 7-bit I2C address of the VL53L1X.
pub const DEFAULT_ADDRESS: u8 = 0x29;

/// Value of the identification model ID register of a VL53L1X.
const MODEL_ID: u16 = 0xEACC;

/// Budget applied by [`VL53L1x::init`].
const DEFAULT_TIMING_BUDGET_US: u32 = 50_000;

/// VL53L1X time-of-flight distance sensor driver.
///
/// The driver owns the bus handle and all per-sensor state: the cached
/// oscillator calibration, the calibration saved for the current run, and the
/// last decoded sample. Use one instance per physical sensor.
pub struct VL53L1x<I2C, D, C> {
    /// I2C interface for communication with the sensor
    i2c: I2C,
    /// Current I2C slave address of the sensor
    address: u8,
    /// Delay implementation used during reset
    delay: D,
    /// Millisecond time source for the IO timeout
    clock: C,
    /// Fast oscillator frequency (4.12 MHz), cached by `init`
    fast_osc_frequency: u16,
    /// Oscillator calibration value, cached by `init`
    osc_calibrate_val: u16,
    distance_mode: DistanceMode,
    calibration: CalibrationState,
    running: bool,
    io_timeout: IoTimeout,
    did_timeout: bool,
    ranging_data: Option<RangingData>,
    last_status: Option<ErrorKind>,
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), keep_self),
    async(feature = "async", keep_self)
)]
impl<I2C, E, D, C> VL53L1x<I2C, D, C>
where
    I2C: I2c<Error = E>,
    E: embedded_hal::i2c::Error,
    D: DelayNs,
    C: ClockSource,
{
    /// Creates a new VL53L1X sensor driver instance.
    ///
    /// The driver talks to the default address (0x29). The sensor is not
    /// touched until [`init`](Self::init) is called.
    ///
    /// # Arguments
    ///
    /// * `i2c` - I2C interface implementation for sensor communication
    /// * `delay` - Delay implementation used for the reset pulse
    /// * `clock` - Millisecond time source used by the IO timeout
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use vl53l1x_continuous::VL53L1x;
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    ///
    /// let mut sensor = VL53L1x::new(i2c, delay, || 0u32);
    /// ```
    pub fn new(i2c: I2C, delay: D, clock: C) -> Self {
        Self {
            i2c,
            address: DEFAULT_ADDRESS,
            delay,
            clock,
            fast_osc_frequency: 0,
            osc_calibrate_val: 0,
            distance_mode: DistanceMode::Unknown,
            calibration: CalibrationState::default(),
            running: false,
            io_timeout: IoTimeout::default(),
            did_timeout: false,
            ranging_data: None,
            last_status: None,
        }
    }

    /// Sets the 7-bit I2C address of the sensor.
    ///
    /// The new address is written to the sensor and used for every following
    /// transaction of this driver instance. The sensor forgets it on reset.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn set_address(&mut self, address: u8) -> Result<(), Error<E>> {
        let address = address & 0x7F;
        self.write_byte(Register::I2cSlaveDeviceAddress, address)
            .await?;
        self.address = address;
        Ok(())
    }

    /// Initializes the VL53L1X sensor for low-power autonomous ranging.
    ///
    /// Verifies the model ID, soft-resets the sensor, waits for it to boot,
    /// caches the oscillator calibration, loads the static configuration and
    /// applies long distance mode with a 50 ms timing budget. Any previous
    /// acquisition and calibration state of this instance is discarded.
    ///
    /// The boot wait is bounded by the IO timeout (see
    /// [`set_timeout`](Self::set_timeout)); with a zero timeout it waits
    /// forever.
    ///
    /// # Arguments
    ///
    /// * `io_2v8` - Switch the I/O pads to 2.8 V (the sensor boots in 1.8 V mode)
    ///
    /// # Errors
    ///
    /// * `Err(Error::InvalidModelId(id))` - If the device is not a VL53L1X
    /// * `Err(Error::Timeout)` - If the sensor did not boot before the IO timeout
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn init(&mut self, io_2v8: bool) -> Result<(), Error<E>> {
        let model_id = self.read_word(Register::IdentificationModelId).await?;
        if model_id != MODEL_ID {
            error!("Unexpected model ID: {}", model_id);
            return Err(Error::InvalidModelId(model_id));
        }

        self.running = false;
        self.calibration = CalibrationState::default();
        self.distance_mode = DistanceMode::Unknown;
        self.ranging_data = None;
        self.did_timeout = false;

        info!("Resetting sensor");
        self.write_byte(Register::SoftReset, 0x00).await?;
        self.delay.delay_us(100).await;
        self.write_byte(Register::SoftReset, 0x01).await?;
        self.delay.delay_ms(1).await;

        info!("Waiting for sensor to boot");
        self.io_timeout.start(&self.clock);
        loop {
            // the sensor NACKs until it has booted
            if let Ok(status) = self.read_byte(Register::FirmwareSystemStatus).await {
                if status & 0x01 != 0 {
                    break;
                }
            }
            if self.io_timeout.expired(&self.clock) {
                warn!("Sensor did not boot within {} ms", self.io_timeout.threshold_ms);
                self.did_timeout = true;
                return Err(Error::Timeout);
            }
        }

        if io_2v8 {
            let pad_config = self.read_byte(Register::PadI2cHvExtsupConfig).await?;
            self.write_byte(Register::PadI2cHvExtsupConfig, pad_config | 0x01)
                .await?;
        }

        self.fast_osc_frequency = self.read_word(Register::OscMeasuredFastOscFrequency).await?;
        self.osc_calibrate_val = self.read_word(Register::ResultOscCalibrateVal).await?;
        debug!(
            "Fast oscillator: {}, oscillator calibration: {}",
            self.fast_osc_frequency,
            self.osc_calibrate_val
        );

        info!("Loading low power autonomous configuration");
        self.load_static_configuration().await?;

        self.set_distance_mode(DistanceMode::Long).await?;
        self.set_measurement_timing_budget(DEFAULT_TIMING_BUDGET_US)
            .await?;

        // assumes the mode mitigation steps are disabled
        let outer_offset_mm = self.read_word(Register::MmConfigOuterOffsetMm).await?;
        self.write_word(
            Register::AlgoPartToPartRangeOffsetMm,
            outer_offset_mm.wrapping_mul(4),
        )
        .await?;

        info!("Sensor initialized");
        Ok(())
    }

    // Standard ranging preset followed by the low power autonomous overrides.
    // Values marked "tuning" are vendor tuning parameter defaults.
    async fn load_static_configuration(&mut self) -> Result<(), Error<E>> {
        self.write_word(Register::DssConfigTargetTotalRateMcps, dss::TARGET_RATE)
            .await?;
        self.write_byte(Register::GpioTioHvStatus, 0x02).await?;
        self.write_byte(Register::SigmaEstimatorEffectivePulseWidthNs, 8)
            .await?; // tuning
        self.write_byte(Register::SigmaEstimatorEffectiveAmbientWidthNs, 16)
            .await?; // tuning
        self.write_byte(Register::AlgoCrosstalkCompensationValidHeightMm, 0x01)
            .await?;
        self.write_byte(Register::AlgoRangeIgnoreValidHeightMm, 0xFF)
            .await?;
        self.write_byte(Register::AlgoRangeMinClip, 0).await?; // tuning
        self.write_byte(Register::AlgoConsistencyCheckTolerance, 2)
            .await?; // tuning

        self.write_word(Register::SystemThreshRateHigh, 0x0000).await?;
        self.write_word(Register::SystemThreshRateLow, 0x0000).await?;
        self.write_byte(Register::DssConfigApertureAttenuation, 0x38)
            .await?;

        self.write_word(Register::RangeConfigSigmaThresh, 360).await?; // tuning
        self.write_word(Register::RangeConfigMinCountRateRtnLimitMcps, 192)
            .await?; // tuning

        self.write_byte(Register::SystemGroupedParameterHold0, 0x01)
            .await?;
        self.write_byte(Register::SystemGroupedParameterHold1, 0x01)
            .await?;
        self.write_byte(Register::SdConfigQuantifier, 2).await?; // tuning

        // writing both hold registers above leaves GPH set; ranging fails
        // unless it goes back to 0
        self.write_byte(Register::SystemGroupedParameterHold, 0x00)
            .await?;
        self.write_byte(Register::SystemSeedConfig, 1).await?; // tuning

        // sequence: VHV, PHASECAL, DSS1, RANGE
        self.write_byte(Register::SystemSequenceConfig, 0x8B).await?;
        self.write_word(Register::DssConfigManualEffectiveSpadsSelect, 200 << 8)
            .await?;
        // requested effective SPADs
        self.write_byte(Register::DssConfigRoiModeControl, 2).await?;
        Ok(())
    }
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
    /// Writes a single byte to a sensor register.
    ///
    /// This is a low-level function; most applications should use the
    /// configuration functions instead. The outcome is recorded in
    /// [`get_last_status`](Self::get_last_status).
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use vl53l1x_continuous::{VL53L1x, Register};
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    /// let mut sensor = VL53L1x::new(i2c, delay, || 0u32);
    ///
    /// sensor.write_byte(Register::SystemInterruptClear, 0x01).unwrap();
    ///
    /// // Or write to a hardcoded address
    /// sensor.write_byte(0x0086u16, 0x01).unwrap();
    /// ```
    pub async fn write_byte<R>(&mut self, register_address: R, value: u8) -> Result<(), Error<E>>
    where
        R: Into<u16>,
    {
        let reg: u16 = register_address.into();
        let mut buffer = [0u8; 3];
        buffer[0..2].copy_from_slice(&reg.to_be_bytes());
        buffer[2] = value;
        let result = self.i2c.write(self.address, &buffer).await;
        self.record(result)
    }

    /// Reads a single byte from a sensor register.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn read_byte<R>(&mut self, register_address: R) -> Result<u8, Error<E>>
    where
        R: Into<u16>,
    {
        let mut read_buffer = [0u8; 1];
        self.read_bytes(register_address, &mut read_buffer).await?;
        Ok(read_buffer[0])
    }

    /// Writes a 16-bit big-endian word to a sensor register.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn write_word<R>(&mut self, register_address: R, value: u16) -> Result<(), Error<E>>
    where
        R: Into<u16>,
    {
        let reg: u16 = register_address.into();
        let mut buffer = [0u8; 4];
        buffer[0..2].copy_from_slice(&reg.to_be_bytes());
        buffer[2..4].copy_from_slice(&value.to_be_bytes());
        let result = self.i2c.write(self.address, &buffer).await;
        self.record(result)
    }

    /// Reads a 16-bit big-endian word from a sensor register.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use vl53l1x_continuous::{VL53L1x, Register};
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    /// let mut sensor = VL53L1x::new(i2c, delay, || 0u32);
    ///
    /// let model_id = sensor.read_word(Register::IdentificationModelId).unwrap();
    /// println!("Model ID: 0x{:04X}", model_id);
    /// ```
    pub async fn read_word<R>(&mut self, register_address: R) -> Result<u16, Error<E>>
    where
        R: Into<u16>,
    {
        let mut read_buffer = [0u8; 2];
        self.read_bytes(register_address, &mut read_buffer).await?;
        Ok(u16::from_be_bytes(read_buffer))
    }

    /// Writes a 32-bit big-endian double word to a sensor register.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn write_dword<R>(&mut self, register_address: R, value: u32) -> Result<(), Error<E>>
    where
        R: Into<u16>,
    {
        let reg: u16 = register_address.into();
        let mut buffer = [0u8; 6];
        buffer[0..2].copy_from_slice(&reg.to_be_bytes());
        buffer[2..6].copy_from_slice(&value.to_be_bytes());
        let result = self.i2c.write(self.address, &buffer).await;
        self.record(result)
    }

    /// Reads a 32-bit big-endian double word from a sensor register.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn read_dword<R>(&mut self, register_address: R) -> Result<u32, Error<E>>
    where
        R: Into<u16>,
    {
        let mut read_buffer = [0u8; 4];
        self.read_bytes(register_address, &mut read_buffer).await?;
        Ok(u32::from_be_bytes(read_buffer))
    }

    // Burst read of consecutive registers starting at `register_address`.
    async fn read_bytes<R>(&mut self, register_address: R, buffer: &mut [u8]) -> Result<(), Error<E>>
    where
        R: Into<u16>,
    {
        let reg: u16 = register_address.into();
        let write_buffer = reg.to_be_bytes();
        let result = self.i2c.write_read(self.address, &write_buffer, buffer).await;
        self.record(result)
    }
}

impl<I2C, D, C> VL53L1x<I2C, D, C> {
    /// Returns the I2C address the driver currently talks to.
    pub fn get_address(&self) -> u8 {
        self.address
    }

    /// Sets the IO timeout in milliseconds; 0 disables it.
    ///
    /// The timeout bounds the wait of a blocking [`read`](Self::read) and the
    /// boot wait of [`init`](Self::init).
    pub fn set_timeout(&mut self, timeout_ms: u16) {
        self.io_timeout.threshold_ms = timeout_ms;
    }

    /// Returns the IO timeout in milliseconds.
    pub fn get_timeout(&self) -> u16 {
        self.io_timeout.threshold_ms
    }

    /// Returns true if the last wait for the sensor timed out.
    ///
    /// The flag stays set until a sample is read successfully.
    pub fn timeout_occurred(&self) -> bool {
        self.did_timeout
    }

    /// Returns the last applied distance mode, or [`DistanceMode::Unknown`]
    /// if none has been applied.
    pub fn get_distance_mode(&self) -> DistanceMode {
        self.distance_mode
    }

    /// Returns the most recent sample, or `None` if nothing has been read yet.
    pub fn get_ranging_data(&self) -> Option<RangingData> {
        self.ranging_data
    }

    /// Returns the error kind of the last bus transaction, or `None` if it
    /// succeeded.
    pub fn get_last_status(&self) -> Option<ErrorKind> {
        self.last_status
    }

    fn record<E>(&mut self, result: Result<(), E>) -> Result<(), Error<E>>
    where
        E: embedded_hal::i2c::Error,
    {
        match result {
            Ok(()) => {
                self.last_status = None;
                Ok(())
            }
            Err(error) => {
                self.last_status = Some(error.kind());
                Err(Error::I2cError(error))
            }
        }
    }

    // Puts a failure back into `last_status` after later transactions of
    // the same operation succeeded.
    fn keep_failure<E>(&mut self, result: Result<(), Error<E>>) -> Result<(), Error<E>>
    where
        E: embedded_hal::i2c::Error,
    {
        if let Err(Error::I2cError(error)) = &result {
            self.last_status = Some(error.kind());
        }
        result
    }
}

/// Error type for VL53L1X sensor operations.
///
/// # Examples
///
/// ```rust,no_run
/// use vl53l1x_continuous::Error;
///
/// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
/// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
/// let mut sensor = vl53l1x_continuous::VL53L1x::new(i2c, delay, || 0u32);
///
/// match sensor.init(true) {
///     Ok(()) => println!("Sensor initialized successfully"),
///     Err(Error::Timeout) => println!("Sensor did not boot"),
///     Err(Error::InvalidModelId(id)) => println!("Not a VL53L1X: 0x{:04X}", id),
///     Err(e) => println!("Initialization failed: {:?}", e),
/// }
/// ```
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E: core::fmt::Debug> {
    /// I2C communication error from the underlying hardware
    I2cError(E),
    /// Sensor operation timed out
    Timeout,
    /// Invalid parameter value provided
    InvalidArgument,
    /// The identification register does not hold the VL53L1X model ID
    InvalidModelId(u16),
    /// A sample was requested while continuous ranging is stopped
    NotRunning,
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl<E: core::fmt::Debug> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Error::I2cError(error)
    }
}
