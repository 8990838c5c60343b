/// Semantic status of a ranging sample.
///
/// The numeric values follow the vendor `VL53L1_RANGESTATUS_*` codes. Codes
/// outside that set are carried in [`RangeStatus::Unknown`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RangeStatus {
    /// The range is valid
    RangeValid,
    /// Sigma estimator is above the internal threshold
    SigmaFail,
    /// Signal is below the internal threshold
    SignalFail,
    /// Target is below the minimum detection threshold
    RangeValidMinRangeClipped,
    /// Phase out of valid limits; try a longer distance mode
    OutOfBoundsFail,
    /// Hardware or VCSEL failure
    HardwareFail,
    /// The range is valid but the wraparound check has not been done
    RangeValidNoWrapCheckFail,
    /// Wrapped target, no matching phase in the other VCSEL period
    WrapTargetFail,
    /// Internal algorithm underflow or overflow
    ProcessingFail,
    /// Crosstalk signal failure
    XtalkSignalFail,
    /// First interrupt after starting back-to-back ranging; ignore the data
    SynchronizationInt,
    /// Valid range, but the target is the result of merged pulses
    RangeValidMergedPulse,
    /// A target is present but the signal is too weak
    TargetPresentLackOfSignal,
    /// The requested region of interest is not valid
    MinRangeFail,
    /// The reported range is invalid
    RangeInvalid,
    /// No update
    NoUpdate,
    /// Code not defined by the vendor table
    Unknown(u8),
}

impl RangeStatus {
    /// Returns true when the distance of the sample can be used as is.
    #[must_use]
    pub fn is_valid(self) -> bool {
        matches!(
            self,
            RangeStatus::RangeValid | RangeStatus::RangeValidMergedPulse
        )
    }

    /// Human readable label of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RangeStatus::RangeValid => "range valid",
            RangeStatus::SigmaFail => "sigma fail",
            RangeStatus::SignalFail => "signal fail",
            RangeStatus::RangeValidMinRangeClipped => "range valid, min range clipped",
            RangeStatus::OutOfBoundsFail => "out of bounds fail",
            RangeStatus::HardwareFail => "hardware fail",
            RangeStatus::RangeValidNoWrapCheckFail => "range valid, no wrap check fail",
            RangeStatus::WrapTargetFail => "wrap target fail",
            RangeStatus::ProcessingFail => "processing fail",
            RangeStatus::XtalkSignalFail => "xtalk signal fail",
            RangeStatus::SynchronizationInt => "synchronization int",
            RangeStatus::RangeValidMergedPulse => "range valid, merged pulse",
            RangeStatus::TargetPresentLackOfSignal => "target present, lack of signal",
            RangeStatus::MinRangeFail => "min range fail",
            RangeStatus::RangeInvalid => "range invalid",
            RangeStatus::NoUpdate => "no update",
            RangeStatus::Unknown(_) => "unknown status",
        }
    }
}

impl From<RangeStatus> for u8 {
    fn from(status: RangeStatus) -> Self {
        match status {
            RangeStatus::RangeValid => 0,
            RangeStatus::SigmaFail => 1,
            RangeStatus::SignalFail => 2,
            RangeStatus::RangeValidMinRangeClipped => 3,
            RangeStatus::OutOfBoundsFail => 4,
            RangeStatus::HardwareFail => 5,
            RangeStatus::RangeValidNoWrapCheckFail => 6,
            RangeStatus::WrapTargetFail => 7,
            RangeStatus::ProcessingFail => 8,
            RangeStatus::XtalkSignalFail => 9,
            RangeStatus::SynchronizationInt => 10,
            RangeStatus::RangeValidMergedPulse => 11,
            RangeStatus::TargetPresentLackOfSignal => 12,
            RangeStatus::MinRangeFail => 13,
            RangeStatus::RangeInvalid => 14,
            RangeStatus::NoUpdate => 255,
            RangeStatus::Unknown(value) => value,
        }
    }
}

impl From<u8> for RangeStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => RangeStatus::RangeValid,
            1 => RangeStatus::SigmaFail,
            2 => RangeStatus::SignalFail,
            3 => RangeStatus::RangeValidMinRangeClipped,
            4 => RangeStatus::OutOfBoundsFail,
            5 => RangeStatus::HardwareFail,
            6 => RangeStatus::RangeValidNoWrapCheckFail,
            7 => RangeStatus::WrapTargetFail,
            8 => RangeStatus::ProcessingFail,
            9 => RangeStatus::XtalkSignalFail,
            10 => RangeStatus::SynchronizationInt,
            11 => RangeStatus::RangeValidMergedPulse,
            12 => RangeStatus::TargetPresentLackOfSignal,
            13 => RangeStatus::MinRangeFail,
            14 => RangeStatus::RangeInvalid,
            255 => RangeStatus::NoUpdate,
            _ => {
                warn!("Unknown RangeStatus value: {}", value);
                RangeStatus::Unknown(value)
            }
        }
    }
}

impl core::fmt::Display for RangeStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the label of a semantic range status code.
///
/// ```rust
/// use vl53l1x_continuous::range_status_to_string;
///
/// assert_eq!(range_status_to_string(0), "range valid");
/// assert_eq!(range_status_to_string(255), "no update");
/// assert_eq!(range_status_to_string(42), "unknown status");
/// ```
#[must_use]
pub fn range_status_to_string(status: u8) -> &'static str {
    RangeStatus::from(status).as_str()
}

// Device status (RESULT__RANGE_STATUS & 0x1F) to semantic status. Device
// code 9 (range complete) is refined by the stream count in `decode_device_status`.
const DEVICE_STATUS: [RangeStatus; 32] = {
    use RangeStatus::{
        HardwareFail as HW, MinRangeFail, NoUpdate as NU, OutOfBoundsFail, RangeValid,
        RangeValidMinRangeClipped, SigmaFail, SignalFail, SynchronizationInt, WrapTargetFail,
        XtalkSignalFail,
    };
    [
        NU,                        // 0
        HW,                        // 1  VCSELCONTINUITYTESTFAILURE
        HW,                        // 2  VCSELWATCHDOGTESTFAILURE
        HW,                        // 3  NOVHVVALUEFOUND
        SignalFail,                // 4  MSRCNOTARGET
        OutOfBoundsFail,           // 5  RANGEPHASECHECK
        SigmaFail,                 // 6  SIGMATHRESHOLDCHECK
        WrapTargetFail,            // 7  PHASECONSISTENCY
        RangeValidMinRangeClipped, // 8  MINCLIP
        RangeValid,                // 9  RANGECOMPLETE
        NU,                        // 10
        NU,                        // 11
        XtalkSignalFail,           // 12 RANGEIGNORETHRESHOLD
        MinRangeFail,              // 13 USERROICLIP
        NU,                        // 14
        NU,                        // 15
        NU,                        // 16
        HW,                        // 17 MULTCLIPFAIL
        SynchronizationInt,        // 18 GPHSTREAMCOUNT0READY
        NU,                        // 19
        NU,                        // 20
        NU,                        // 21
        NU,                        // 22
        NU,                        // 23
        NU,                        // 24
        NU,                        // 25
        NU,                        // 26
        NU,                        // 27
        NU,                        // 28
        NU,                        // 29
        NU,                        // 30
        NU,                        // 31
    ]
};

/// Maps the raw `RESULT__RANGE_STATUS` byte to a semantic status.
pub(crate) fn decode_device_status(range_status: u8, stream_count: u8) -> RangeStatus {
    match DEVICE_STATUS[usize::from(range_status & 0x1F)] {
        RangeStatus::RangeValid if stream_count == 0 => RangeStatus::RangeValidNoWrapCheckFail,
        status => status,
    }
}
