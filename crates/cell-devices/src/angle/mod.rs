//! Angle-correction client (C5): the camera-B detect sequence plus the
//! servo bridge worker that consumes its output.

use crate::error::DeviceError;
use cell_protocol::{decode_i32_be, registers::camera_b, StatusWord, ANGLE_DETECT_COMMAND};
use cell_transport::ModbusTransport;
use std::time::{Duration, Instant};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Used when a caller doesn't have a configured timeout to hand in (tests,
/// mainly); production wiring passes `TimingConfig::angle_detect`.
pub const DEFAULT_DETECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a single `detect_angle` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleDetection {
    /// Hundredths of a degree, already divided down to degrees.
    pub measured_angle: f64,
    pub measured_center: (i32, i32),
    pub execution_time: Duration,
}

#[derive(Clone)]
pub struct AngleClient {
    transport: ModbusTransport,
    base: u16,
    detect_timeout: Duration,
}

impl AngleClient {
    pub fn new(transport: ModbusTransport, base: u16) -> Self {
        Self::with_detect_timeout(transport, base, DEFAULT_DETECT_TIMEOUT)
    }

    pub fn with_detect_timeout(transport: ModbusTransport, base: u16, detect_timeout: Duration) -> Self {
        Self { transport, base, detect_timeout }
    }

    fn reg(&self, offset: u16) -> u16 {
        self.base + offset
    }

    fn read_status(&self) -> Result<StatusWord, DeviceError> {
        let raw = self.transport.read_u16(self.reg(camera_b::STATUS_WORD))?;
        Ok(StatusWord::from_raw(raw))
    }

    /// Runs the camera-B capture+angle-detect sequence for the given
    /// detection mode. Steps follow the register protocol exactly: this
    /// module doesn't reuse the generic handshake primitive because the
    /// "completed" signal here is a distinct status value (`8`), not plain
    /// `Running=0`.
    pub fn detect_angle(&self, mode: u16) -> Result<AngleDetection, DeviceError> {
        let started = Instant::now();

        // Step 1: require Ready=1, Initialized=1 (raw status word == 9).
        let raw = self.transport.read_u16(self.reg(camera_b::STATUS_WORD))?;
        if raw != StatusWord::IDLE_READY {
            return Err(DeviceError::SystemNotReady);
        }

        // Step 2: write detection mode.
        self.transport.write_u16(self.reg(camera_b::MODE), mode)?;

        // Step 3: write command 16 (capture + angle detect).
        self.transport
            .write_u16(self.reg(camera_b::COMMAND), ANGLE_DETECT_COMMAND)?;

        // Step 4: poll status until it reads 8 (result ready).
        let deadline = Instant::now() + self.detect_timeout;
        loop {
            let status = self.read_status()?;
            if status.alarm() {
                return Err(DeviceError::SystemError);
            }
            let raw = self.transport.read_u16(self.reg(camera_b::STATUS_WORD))?;
            if raw == StatusWord::RESULT_READY {
                break;
            }
            if Instant::now() >= deadline {
                return Err(DeviceError::Failed);
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        // Step 5: read the success flag.
        let success = self.transport.read_u16(self.reg(camera_b::SUCCESS_FLAG))?;
        if success == 0 {
            self.finish()?;
            return Err(DeviceError::NoValidContour);
        }

        // Step 6: read the angle, center, and area.
        let angle_hi = self.transport.read_u16(self.reg(camera_b::ANGLE_HI))?;
        let angle_lo = self.transport.read_u16(self.reg(camera_b::ANGLE_LO))?;
        let angle_centihundredths = decode_i32_be(angle_hi, angle_lo);
        let measured_angle = angle_centihundredths as f64 / 100.0;

        let rect = self.transport.read_block(self.reg(camera_b::AXES_RECT_START), 4)?;
        let measured_center = (rect[0] as i32, rect[1] as i32);

        // Step 7-8: clear command/success and wait for Ready=1.
        self.finish()?;

        Ok(AngleDetection {
            measured_angle,
            measured_center,
            execution_time: started.elapsed(),
        })
    }

    fn finish(&self) -> Result<(), DeviceError> {
        self.transport.write_u16(self.reg(camera_b::COMMAND), 0)?;
        self.transport.write_u16(self.reg(camera_b::SUCCESS_FLAG), 0)?;

        let deadline = Instant::now() + self.detect_timeout;
        loop {
            let raw = self.transport.read_u16(self.reg(camera_b::STATUS_WORD))?;
            if raw == StatusWord::IDLE_READY {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DeviceError::Timeout);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Target servo position in tenths of a degree, matching the documented
/// `9000 - round(angle * 10)` rule.
pub fn target_servo_position(measured_angle: f64) -> i32 {
    9000 - (measured_angle * 10.0).round() as i32
}

/// Drives the angle-correction servo through its own serial-style ready
/// bit. The servo sits behind the same Modbus bus as everything else, so
/// this is wrapped by the same Ready/Running/Alarm status word as every
/// other peripheral — "moving" is just Running=1 here, not a free-standing
/// bit of its own.
#[derive(Clone)]
pub struct ServoBridge {
    transport: ModbusTransport,
    status_reg: u16,
    target_reg: u16,
    detect_timeout: Duration,
}

impl ServoBridge {
    pub fn new(transport: ModbusTransport, status_reg: u16, target_reg: u16) -> Self {
        Self::with_detect_timeout(transport, status_reg, target_reg, DEFAULT_DETECT_TIMEOUT)
    }

    pub fn with_detect_timeout(
        transport: ModbusTransport,
        status_reg: u16,
        target_reg: u16,
        detect_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            status_reg,
            target_reg,
            detect_timeout,
        }
    }

    /// Commands the servo to `target_tenths_of_degree` and waits for
    /// Running to clear on the status word.
    pub fn drive_to(&self, target_tenths_of_degree: i32) -> Result<(), DeviceError> {
        let status = StatusWord::from_raw(self.transport.read_u16(self.status_reg)?);
        if !status.accepts_command() {
            return Err(DeviceError::NotReady);
        }

        self.transport.write_i32_be(self.target_reg, target_tenths_of_degree)?;

        let deadline = Instant::now() + self.detect_timeout;
        loop {
            let status = StatusWord::from_raw(self.transport.read_u16(self.status_reg)?);
            if !status.running() {
                debug!(target_tenths_of_degree, "servo bridge: move complete");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DeviceError::Timeout);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl crate::peripheral::Sealed for AngleClient {}
impl crate::peripheral::Peripheral for AngleClient {
    fn transport(&self) -> &ModbusTransport {
        &self.transport
    }

    fn status_reg(&self) -> u16 {
        self.reg(camera_b::STATUS_WORD)
    }

    fn command_reg(&self) -> u16 {
        self.reg(camera_b::COMMAND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn servo_target_matches_documented_formula() {
        assert_eq!(target_servo_position(0.0), 9000);
        assert_eq!(target_servo_position(45.0), 8550);
        assert_eq!(target_servo_position(-10.25), 9103);
    }
}
