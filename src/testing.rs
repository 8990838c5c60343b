//! Register-file model of a VL53L1X for unit tests.

use core::cell::Cell;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use embedded_hal_mock::eh1::delay::NoopDelay;

use crate::{ClockSource, Register, VL53L1x, DEFAULT_ADDRESS};

pub(crate) type TestSensor = VL53L1x<FakeSensor, NoopDelay, FakeClock>;

/// Driver around a fake sensor in its power-on state.
pub(crate) fn sensor() -> TestSensor {
    VL53L1x::new(FakeSensor::new(), NoopDelay, FakeClock::default())
}

/// Driver around a fake sensor that went through `init(true)`.
pub(crate) fn initialized_sensor() -> TestSensor {
    let mut sensor = sensor();
    sensor.init(true).unwrap();
    sensor
}

/// Millisecond clock that moves forward by `step_ms` on every reading.
pub(crate) struct FakeClock {
    pub(crate) now: Cell<u32>,
    pub(crate) step_ms: u32,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self {
            now: Cell::new(1_000),
            step_ms: 1,
        }
    }
}

impl ClockSource for FakeClock {
    fn get_ms(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step_ms));
        now
    }
}

/// A sample waiting for a number of data ready polls.
struct PendingSample {
    polls_left: usize,
    block: [u8; 17],
}

pub(crate) struct FakeSensor {
    address: u8,
    regs: [u8; 0x200],
    pending: Option<PendingSample>,
    /// Register and value of every byte written, in order
    pub(crate) writes: Vec<(u16, u8)>,
    /// Fail every transaction
    pub(crate) fail_io: bool,
    /// Fail writes touching this register
    pub(crate) fail_writes_to: Option<u16>,
}

impl FakeSensor {
    pub(crate) const FAST_OSC_FREQUENCY: u16 = 0xBCCC;
    pub(crate) const OSC_CALIBRATE_VAL: u16 = 0x0150;
    pub(crate) const VHV_CONFIG_INIT: u8 = 0xA0;
    pub(crate) const VHV_CONFIG_TIMEOUT: u8 = 0x21;
    pub(crate) const PHASECAL_VCSEL_START: u8 = 0x0C;

    pub(crate) fn new() -> Self {
        let mut sensor = Self {
            address: DEFAULT_ADDRESS,
            regs: [0; 0x200],
            pending: None,
            writes: Vec::new(),
            fail_io: false,
            fail_writes_to: None,
        };
        sensor.set_word(Register::IdentificationModelId, 0xEACC);
        sensor.set_byte(Register::FirmwareSystemStatus, 0x01);
        sensor.set_byte(Register::GpioTioHvStatus, 0x01);
        sensor.set_word(Register::OscMeasuredFastOscFrequency, Self::FAST_OSC_FREQUENCY);
        sensor.set_word(Register::ResultOscCalibrateVal, Self::OSC_CALIBRATE_VAL);
        sensor.set_byte(Register::VhvConfigInit, Self::VHV_CONFIG_INIT);
        sensor.set_byte(Register::VhvConfigTimeoutMacropLoopBound, Self::VHV_CONFIG_TIMEOUT);
        sensor.set_byte(Register::PhasecalResultVcselStart, Self::PHASECAL_VCSEL_START);
        // reset values of a long mode, ~100 ms configuration
        sensor.set_byte(Register::RangeConfigVcselPeriodA, 0x0F);
        sensor.set_byte(Register::RangeConfigVcselPeriodB, 0x0D);
        sensor.set_word(Register::RangeConfigTimeoutMacropA, 0x01CC);
        sensor.set_word(Register::RangeConfigTimeoutMacropB, 0x01EA);
        sensor
    }

    pub(crate) fn byte<R: Into<u16>>(&self, reg: R) -> u8 {
        self.regs[usize::from(reg.into())]
    }

    pub(crate) fn word<R: Into<u16>>(&self, reg: R) -> u16 {
        let reg = usize::from(reg.into());
        u16::from_be_bytes([self.regs[reg], self.regs[reg + 1]])
    }

    pub(crate) fn dword<R: Into<u16>>(&self, reg: R) -> u32 {
        let reg = usize::from(reg.into());
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.regs[reg..reg + 4]);
        u32::from_be_bytes(bytes)
    }

    pub(crate) fn set_byte<R: Into<u16>>(&mut self, reg: R, value: u8) {
        self.regs[usize::from(reg.into())] = value;
    }

    pub(crate) fn set_word<R: Into<u16>>(&mut self, reg: R, value: u16) {
        let reg = usize::from(reg.into());
        self.regs[reg..reg + 2].copy_from_slice(&value.to_be_bytes());
    }

    /// Values written to the first byte of `reg`, in order.
    pub(crate) fn writes_to<R: Into<u16>>(&self, reg: R) -> Vec<u8> {
        let reg = reg.into();
        self.writes
            .iter()
            .filter(|(address, _)| *address == reg)
            .map(|&(_, value)| value)
            .collect()
    }

    /// Makes a sample available right away.
    pub(crate) fn latch_sample(
        &mut self,
        device_status: u8,
        stream_count: u8,
        spads: u16,
        ambient: u16,
        range_mm: u16,
        peak: u16,
    ) {
        self.latch_sample_after_polls(0, device_status, stream_count, spads, ambient, range_mm, peak);
    }

    /// Makes a sample available once data ready has been polled `polls` times.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn latch_sample_after_polls(
        &mut self,
        polls: usize,
        device_status: u8,
        stream_count: u8,
        spads: u16,
        ambient: u16,
        range_mm: u16,
        peak: u16,
    ) {
        let mut block = [0u8; 17];
        block[0] = device_status;
        block[2] = stream_count;
        block[3..5].copy_from_slice(&spads.to_be_bytes());
        block[7..9].copy_from_slice(&ambient.to_be_bytes());
        block[13..15].copy_from_slice(&range_mm.to_be_bytes());
        block[15..17].copy_from_slice(&peak.to_be_bytes());
        self.pending = Some(PendingSample {
            polls_left: polls,
            block,
        });
        self.advance_pending();
    }

    fn advance_pending(&mut self) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        if pending.polls_left > 0 {
            pending.polls_left -= 1;
            return;
        }
        let block = pending.block;
        self.pending = None;
        let start = usize::from(u16::from(Register::ResultRangeStatus));
        self.regs[start..start + block.len()].copy_from_slice(&block);
        self.regs[usize::from(u16::from(Register::GpioTioHvStatus))] &= !0x01;
    }

    fn write_register(&mut self, reg: u16, value: u8) -> Result<(), ErrorKind> {
        if self.fail_writes_to == Some(reg) {
            return Err(ErrorKind::Other);
        }
        self.writes.push((reg, value));
        self.regs[usize::from(reg)] = value;

        if reg == u16::from(Register::SystemInterruptClear) && value & 0x01 != 0 {
            self.regs[usize::from(u16::from(Register::GpioTioHvStatus))] |= 0x01;
        } else if reg == u16::from(Register::I2cSlaveDeviceAddress) {
            self.address = value & 0x7F;
        }
        Ok(())
    }
}

impl ErrorType for FakeSensor {
    type Error = ErrorKind;
}

impl I2c for FakeSensor {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.fail_io {
            return Err(ErrorKind::Bus);
        }
        if address != self.address {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        let mut index: Option<u16> = None;
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    let (mut reg, payload) = match index {
                        Some(reg) => (reg, &bytes[..]),
                        None => (u16::from_be_bytes([bytes[0], bytes[1]]), &bytes[2..]),
                    };
                    for &value in payload {
                        self.write_register(reg, value)?;
                        reg += 1;
                    }
                    index = Some(reg);
                }
                Operation::Read(buffer) => {
                    let reg = index.unwrap_or(0);
                    if reg == u16::from(Register::GpioTioHvStatus) {
                        self.advance_pending();
                    }
                    let start = usize::from(reg);
                    buffer.copy_from_slice(&self.regs[start..start + buffer.len()]);
                    index = Some(reg + u16::try_from(buffer.len()).unwrap());
                }
            }
        }
        Ok(())
    }
}
