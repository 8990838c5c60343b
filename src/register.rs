/// Register addresses of the VL53L1X used by this driver.
///
/// Only the registers the low-power autonomous ranging flow touches are
/// listed. Multi-byte registers are addressed by their most significant byte.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Soft reset register (0x0000)
    SoftReset = 0x0000,
    /// I2C slave device address register (0x0001)
    I2cSlaveDeviceAddress = 0x0001,
    /// Measured fast oscillator frequency, 4.12 MHz (0x0006)
    OscMeasuredFastOscFrequency = 0x0006,
    /// VHV timeout macro loop bound register (0x0008)
    VhvConfigTimeoutMacropLoopBound = 0x0008,
    /// VHV init register (0x000B)
    VhvConfigInit = 0x000B,
    /// Part-to-part range offset register (0x001E)
    AlgoPartToPartRangeOffsetMm = 0x001E,
    /// Mode mitigation outer offset register (0x0022)
    MmConfigOuterOffsetMm = 0x0022,
    /// DSS target total rate register (0x0024)
    DssConfigTargetTotalRateMcps = 0x0024,
    /// I2C pad supply configuration register (0x002E)
    PadI2cHvExtsupConfig = 0x002E,
    /// GPIO TIO HV status register (0x0031)
    GpioTioHvStatus = 0x0031,
    /// Sigma estimator effective pulse width register (0x0036)
    SigmaEstimatorEffectivePulseWidthNs = 0x0036,
    /// Sigma estimator effective ambient width register (0x0037)
    SigmaEstimatorEffectiveAmbientWidthNs = 0x0037,
    /// Crosstalk compensation valid height register (0x0039)
    AlgoCrosstalkCompensationValidHeightMm = 0x0039,
    /// Range ignore valid height register (0x003E)
    AlgoRangeIgnoreValidHeightMm = 0x003E,
    /// Range minimum clip register (0x003F)
    AlgoRangeMinClip = 0x003F,
    /// Consistency check tolerance register (0x0040)
    AlgoConsistencyCheckTolerance = 0x0040,
    /// VCSEL start calibration register (0x0047)
    CalConfigVcselStart = 0x0047,
    /// Phase calibration timeout register (0x004B)
    PhasecalConfigTimeoutMacrop = 0x004B,
    /// Phase calibration override register (0x004D)
    PhasecalConfigOverride = 0x004D,
    /// DSS ROI mode control register (0x004F)
    DssConfigRoiModeControl = 0x004F,
    /// System rate threshold high register (0x0050)
    SystemThreshRateHigh = 0x0050,
    /// System rate threshold low register (0x0052)
    SystemThreshRateLow = 0x0052,
    /// Manual effective SPAD select register, 8.8 format (0x0054)
    DssConfigManualEffectiveSpadsSelect = 0x0054,
    /// DSS aperture attenuation register (0x0057)
    DssConfigApertureAttenuation = 0x0057,
    /// Mode mitigation timeout A register (0x005A)
    MmConfigTimeoutMacropA = 0x005A,
    /// Mode mitigation timeout B register (0x005C)
    MmConfigTimeoutMacropB = 0x005C,
    /// Range timeout A register (0x005E)
    RangeConfigTimeoutMacropA = 0x005E,
    /// VCSEL period A register (0x0060)
    RangeConfigVcselPeriodA = 0x0060,
    /// Range timeout B register (0x0061)
    RangeConfigTimeoutMacropB = 0x0061,
    /// VCSEL period B register (0x0063)
    RangeConfigVcselPeriodB = 0x0063,
    /// Range sigma threshold register (0x0064)
    RangeConfigSigmaThresh = 0x0064,
    /// Minimum count rate return limit register (0x0066)
    RangeConfigMinCountRateRtnLimitMcps = 0x0066,
    /// Valid phase high register (0x0069)
    RangeConfigValidPhaseHigh = 0x0069,
    /// Inter-measurement period register (0x006C)
    SystemIntermeasurementPeriod = 0x006C,
    /// Grouped parameter hold 0 register (0x0071)
    SystemGroupedParameterHold0 = 0x0071,
    /// Seed configuration register (0x0077)
    SystemSeedConfig = 0x0077,
    /// Window of interest SD0 register (0x0078)
    SdConfigWoiSd0 = 0x0078,
    /// Window of interest SD1 register (0x0079)
    SdConfigWoiSd1 = 0x0079,
    /// Initial phase SD0 register (0x007A)
    SdConfigInitialPhaseSd0 = 0x007A,
    /// Initial phase SD1 register (0x007B)
    SdConfigInitialPhaseSd1 = 0x007B,
    /// Grouped parameter hold 1 register (0x007C)
    SystemGroupedParameterHold1 = 0x007C,
    /// SD quantifier register (0x007E)
    SdConfigQuantifier = 0x007E,
    /// Sequence configuration register (0x0081)
    SystemSequenceConfig = 0x0081,
    /// Grouped parameter hold register (0x0082)
    SystemGroupedParameterHold = 0x0082,
    /// System interrupt clear register (0x0086)
    SystemInterruptClear = 0x0086,
    /// System mode start register (0x0087)
    SystemModeStart = 0x0087,
    /// First register of the result block (0x0089)
    ResultRangeStatus = 0x0089,
    /// Phase calibration VCSEL start result register (0x00D8)
    PhasecalResultVcselStart = 0x00D8,
    /// Oscillator calibration value register (0x00DE)
    ResultOscCalibrateVal = 0x00DE,
    /// Firmware system status register (0x00E5)
    FirmwareSystemStatus = 0x00E5,
    /// Identification model ID register (0x010F)
    IdentificationModelId = 0x010F,
}

impl From<Register> for u16 {
    fn from(r: Register) -> Self {
        r as u16
    }
}
