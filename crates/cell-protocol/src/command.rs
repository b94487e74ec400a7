//! Command-code conventions shared by the camera-style modules, plus the
//! gripper's distinct command set.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Command code convention shared by camera-A and camera-B: peer clears its
/// result flags once the command register returns to `Clear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum VisionCommand {
    Clear = 0,
    Capture = 8,
    CaptureDetect = 16,
    Initialize = 32,
}

/// Command code issued to the angle-correction servo bridge.
pub const ANGLE_DETECT_COMMAND: u16 = 16;

/// Gripper command set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum GripperCommand {
    Init = 1,
    Stop = 2,
    AbsolutePosition = 3,
    SetForce = 5,
    SetSpeed = 6,
    QuickOpen = 7,
    QuickClose = 8,
}

/// Vibratory feeder command set (only the vibrate action is named in the
/// register table; feeder pulses drive the I/O coil directly rather than
/// this command word).
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum FeederCommand {
    Stop = 0,
    Vibrate = 11,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vision_command_round_trips_through_u16() {
        for code in [0u16, 8, 16, 32] {
            let cmd = VisionCommand::try_from(code).unwrap();
            let back: u16 = cmd.into();
            assert_eq!(back, code);
        }
        assert!(VisionCommand::try_from(7u16).is_err());
    }

    #[test]
    fn gripper_command_round_trips_through_u16() {
        for code in [1u16, 2, 3, 5, 6, 7, 8] {
            let cmd = GripperCommand::try_from(code).unwrap();
            let back: u16 = cmd.into();
            assert_eq!(back, code);
        }
        assert!(GripperCommand::try_from(4u16).is_err());
    }
}
