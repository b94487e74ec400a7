//! Gripper client (C4): command issue, a monotonic `cmd_id`, and the three
//! distinct completion-detection strategies the gripper's command set needs.

use crate::error::DeviceError;
use cell_protocol::{registers::gripper, GripperCommand};
use cell_transport::ModbusTransport;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

const INIT_POLL_INTERVAL: Duration = Duration::from_millis(100);
const INIT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);
const INIT_ATTEMPTS: u32 = 3;

const POSITION_TOLERANCE: i32 = 5;
const MOVEMENT_THRESHOLD: i32 = 100;
const SETTLE_MOVEMENT_THRESHOLD: i32 = 50;
const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(100);
const SETTLE_STABLE_SAMPLES: u32 = 3;
const GRIP_STATUS_STABLE_POLLS: u32 = 2;

const CMD_ID_CLEAR_POLL_INTERVAL: Duration = Duration::from_millis(50);
const CMD_ID_CLEAR_TIMEOUT: Duration = Duration::from_secs(10);

/// The peer reports these grip-status codes once a move completes under
/// the movement/grip-status branch of the absolute-position wait.
const GRIP_STATUS_REACHED: u16 = 1;
const GRIP_STATUS_GRIPPED: u16 = 2;

#[derive(Debug, Clone, Copy)]
pub enum CancelSignal {
    Continue,
    Abort,
}

/// Lets a caller abort an absolute-position wait; the peer is left as-is
/// and the next command issued simply supersedes it.
pub trait CancelPoll {
    fn poll(&self) -> CancelSignal;
}

impl CancelPoll for () {
    fn poll(&self) -> CancelSignal {
        CancelSignal::Continue
    }
}

#[derive(Clone)]
pub struct GripperClient {
    transport: ModbusTransport,
    base: u16,
    cmd_id: std::sync::Arc<AtomicU16>,
}

impl GripperClient {
    pub fn new(transport: ModbusTransport, base: u16) -> Self {
        Self {
            transport,
            base,
            cmd_id: std::sync::Arc::new(AtomicU16::new(1)),
        }
    }

    fn reg(&self, offset: u16) -> u16 {
        self.base + offset
    }

    fn next_cmd_id(&self) -> u16 {
        let id = self.cmd_id.fetch_add(1, Ordering::SeqCst);
        if id == 0 {
            self.cmd_id.store(1, Ordering::SeqCst);
            1
        } else {
            id
        }
    }

    /// Writes `{cmd, param1, param2, cmd_id}` as a single contiguous block.
    /// A prior command still occupying `cmd_id` is waited out first: the
    /// peer clears it back to 0 once it has consumed the previous write, so
    /// a second call observes it non-zero, waits for the clear, then issues
    /// its own write.
    fn issue(&self, cmd: GripperCommand, param1: u16, param2: u16) -> Result<u16, DeviceError> {
        self.wait_for_cmd_id_clear()?;
        let cmd_id = self.next_cmd_id();
        let values = vec![cmd.into(), param1, param2, cmd_id];
        self.transport.write_block(self.reg(gripper::CMD), values)?;
        Ok(cmd_id)
    }

    fn wait_for_cmd_id_clear(&self) -> Result<(), DeviceError> {
        let deadline = Instant::now() + CMD_ID_CLEAR_TIMEOUT;
        loop {
            let observed = self.transport.read_u16(self.reg(gripper::CMD_ID))?;
            if observed == 0 {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DeviceError::Timeout);
            }
            debug!(observed, "gripper: waiting for prior command's cmd_id to clear");
            std::thread::sleep(CMD_ID_CLEAR_POLL_INTERVAL);
        }
    }

    pub fn quick_open(&self) -> Result<(), DeviceError> {
        self.issue(GripperCommand::QuickOpen, 0, 0)?;
        Ok(())
    }

    pub fn quick_close(&self) -> Result<(), DeviceError> {
        self.issue(GripperCommand::QuickClose, 0, 0)?;
        Ok(())
    }

    pub fn stop(&self) -> Result<(), DeviceError> {
        self.issue(GripperCommand::Stop, 0, 0)?;
        Ok(())
    }

    pub fn set_force(&self, force: u16) -> Result<(), DeviceError> {
        self.issue(GripperCommand::SetForce, force, 0)?;
        Ok(())
    }

    pub fn set_speed(&self, speed: u16) -> Result<(), DeviceError> {
        self.issue(GripperCommand::SetSpeed, speed, 0)?;
        Ok(())
    }

    /// Issues an absolute-position move and waits for one of the three
    /// documented completion conditions.
    pub fn absolute_position(&self, target: u16, cancel: &impl CancelPoll) -> Result<(), DeviceError> {
        let cmd_id = self.issue(GripperCommand::AbsolutePosition, target, 0)?;

        // (a) wait for the peer to accept: cmd_id register returns to 0.
        loop {
            if matches!(cancel.poll(), CancelSignal::Abort) {
                return Err(DeviceError::Cancelled);
            }
            let observed = self.transport.read_u16(self.reg(gripper::CMD_ID))?;
            if observed == 0 {
                break;
            }
            debug!(cmd_id, observed, "gripper: waiting for command acceptance");
            std::thread::sleep(SETTLE_POLL_INTERVAL);
        }

        // (b) position-proximity condition.
        let mut last_position = self.transport.read_u16(self.reg(gripper::POSITION))? as i32;
        let start_position = last_position;
        let mut moved_at_least_movement_threshold = false;
        let mut grip_status_stable_count = 0u32;
        let mut settled_count = 0u32;

        loop {
            if matches!(cancel.poll(), CancelSignal::Abort) {
                return Err(DeviceError::Cancelled);
            }

            let position = self.transport.read_u16(self.reg(gripper::POSITION))? as i32;
            let target = target as i32;

            if (position - target).abs() <= POSITION_TOLERANCE {
                return Ok(());
            }

            let total_movement = (position - start_position).abs();
            if total_movement >= MOVEMENT_THRESHOLD {
                moved_at_least_movement_threshold = true;
            }
            if moved_at_least_movement_threshold {
                let grip_status = self.transport.read_u16(self.reg(gripper::GRIP_STATUS))?;
                if grip_status == GRIP_STATUS_REACHED || grip_status == GRIP_STATUS_GRIPPED {
                    grip_status_stable_count += 1;
                    if grip_status_stable_count >= GRIP_STATUS_STABLE_POLLS {
                        return Ok(());
                    }
                } else {
                    grip_status_stable_count = 0;
                }
            }

            if (position - start_position).abs() >= SETTLE_MOVEMENT_THRESHOLD {
                if position == last_position {
                    settled_count += 1;
                    if settled_count >= SETTLE_STABLE_SAMPLES {
                        return Ok(());
                    }
                } else {
                    settled_count = 0;
                }
            }

            last_position = position;
            std::thread::sleep(SETTLE_POLL_INTERVAL);
        }
    }

    /// Polls `device_status` for `1`, retrying up to 3 attempts of up to
    /// 10s each.
    pub fn init(&self) -> Result<(), DeviceError> {
        self.issue(GripperCommand::Init, 0, 0)?;

        for attempt in 1..=INIT_ATTEMPTS {
            let deadline = Instant::now() + INIT_ATTEMPT_TIMEOUT;
            loop {
                let status = self.transport.read_u16(self.reg(gripper::DEVICE_STATUS))?;
                if status == 1 {
                    return Ok(());
                }
                if Instant::now() >= deadline {
                    debug!(attempt, "gripper: init attempt timed out, retrying");
                    break;
                }
                std::thread::sleep(INIT_POLL_INTERVAL);
            }
        }
        Err(DeviceError::Timeout)
    }
}

impl crate::peripheral::Sealed for GripperClient {}
impl crate::peripheral::Peripheral for GripperClient {
    fn transport(&self) -> &ModbusTransport {
        &self.transport
    }

    fn status_reg(&self) -> u16 {
        self.reg(gripper::MODULE_STATUS)
    }

    fn command_reg(&self) -> u16 {
        self.reg(gripper::CMD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmd_id_is_monotonic_and_never_zero() {
        let transport = ModbusTransport::connect("127.0.0.1:1".parse().unwrap());
        let client = GripperClient::new(transport, 500);
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(client.next_cmd_id());
        }
        assert!(seen.iter().all(|id| *id != 0));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }
}
