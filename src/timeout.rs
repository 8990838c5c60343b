/// A time source with millisecond precision.
///
/// Only differences between two readings are used, computed with wrapping
/// arithmetic, so the counter may start anywhere and roll over.
pub trait ClockSource {
    /// Get the current time in milliseconds.
    fn get_ms(&self) -> u32;
}

impl<F> ClockSource for F
where
    F: Fn() -> u32,
{
    fn get_ms(&self) -> u32 {
        self()
    }
}

/// Host-side watchdog for operations that poll the sensor.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct IoTimeout {
    /// Threshold in milliseconds; 0 disables the watchdog.
    pub(crate) threshold_ms: u16,
    start_ms: u32,
}

impl IoTimeout {
    /// Records the current time to check an upcoming timeout against.
    pub(crate) fn start(&mut self, clock: &impl ClockSource) {
        self.start_ms = clock.get_ms();
    }

    /// Returns true if the watchdog is enabled and has expired.
    pub(crate) fn expired(&self, clock: &impl ClockSource) -> bool {
        self.threshold_ms > 0
            && clock.get_ms().wrapping_sub(self.start_ms) > u32::from(self.threshold_ms)
    }
}
