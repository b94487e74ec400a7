//! Fixed base addresses and per-module offsets on the shared Modbus holding
//! register space. Bases can be relocated in config; the offsets below are
//! the module's internal layout and do not move.

/// Base address of each module's register block (relocatable via config).
pub mod base {
    pub const CAMERA_A: u16 = 200;
    pub const GRIPPER: u16 = 500;
    /// Angle-capable vision module. Called "camera-C" in prose elsewhere,
    /// "Camera-B" in the register table; the table's name is canonical here.
    pub const CAMERA_B: u16 = 800;
    pub const FEEDER: u16 = 300;
    pub const MOTION: u16 = 1200;
    pub const AUTO_PROGRAM: u16 = 1300;
    pub const IO_FLOW: u16 = 447;
    pub const ANGLE_SERVO: u16 = 700;
}

/// Camera-A (primary vision) register offsets, relative to [`base::CAMERA_A`].
pub mod camera_a {
    pub const COMMAND: u16 = 0;
    pub const STATUS_WORD: u16 = 1;
    pub const MODEL_ID: u16 = 2;
    pub const CAPTURE_DONE: u16 = 3;
    pub const DETECT_DONE: u16 = 4;
    pub const OP_SUCCESS: u16 = 5;
    pub const PARAMS_START: u16 = 10;
    pub const PARAMS_LEN: u16 = 6; // +10..+15
    pub const COUNT: u16 = 40;
    pub const MAX_OBJECTS: u16 = 5;
    pub const PIXEL_START: u16 = 41; // 5 * 3 registers (x, y, radius): +41..+55
    pub const PIXEL_STRIDE: u16 = 3;
    pub const WORLD_START: u16 = 57; // 5 * 4 registers (x_hi, x_lo, y_hi, y_lo): +57..+76
    pub const WORLD_STRIDE: u16 = 4;
    /// Overlaps the world-coordinate block (documented as-is: offset 60
    /// falls within 57..76); treated as a per-slot validity flag for the
    /// first queued item rather than a separate register.
    pub const WORLD_VALID_FIRST: u16 = 60;
}

/// Camera-B (angle-capable vision module) register offsets, relative to
/// [`base::CAMERA_B`].
pub mod camera_b {
    pub const COMMAND: u16 = 0;
    pub const STATUS_WORD: u16 = 1;
    pub const MODE: u16 = 10;
    pub const SUCCESS_FLAG: u16 = 40;
    pub const ANGLE_HI: u16 = 43;
    pub const ANGLE_LO: u16 = 44;
    pub const AXES_RECT_START: u16 = 45; // +45..+48
    pub const AREA: u16 = 49;
}

/// Gripper register offsets, relative to [`base::GRIPPER`].
pub mod gripper {
    pub const MODULE_STATUS: u16 = 0;
    pub const CONN_STATUS: u16 = 1;
    pub const DEVICE_STATUS: u16 = 2;
    pub const GRIP_STATUS: u16 = 4;
    pub const POSITION: u16 = 5;
    pub const CMD: u16 = 20;
    pub const PARAM1: u16 = 21;
    pub const PARAM2: u16 = 22;
    pub const CMD_ID: u16 = 23;
}

/// Vibratory feeder register offsets, relative to [`base::FEEDER`].
pub mod feeder {
    pub const MODULE_STATUS: u16 = 0;
    pub const CONN_STATUS: u16 = 1;
    pub const DEVICE_STATUS: u16 = 2;
    pub const CMD_CODE: u16 = 20;
    pub const PARAMS_START: u16 = 21; // +21..+23
    pub const CMD_ID: u16 = 24;
}

/// Motion controller register offsets, relative to [`base::MOTION`].
pub mod motion {
    pub const STATUS_WORD: u16 = 0;
    pub const CURRENT_FLOW: u16 = 1;
    pub const PROGRESS: u16 = 2;
    pub const ERROR_CODE: u16 = 3;
    pub const FLOW1_DONE: u16 = 4;
    pub const FLOW2_DONE: u16 = 5;
    pub const FLOW5_DONE: u16 = 6;
    pub const OP_COUNT: u16 = 7;
    pub const FLOW1: u16 = 40;
    pub const FLOW2: u16 = 41;
    pub const FLOW5: u16 = 42;
    pub const CLEAR_ALARM: u16 = 43;
    pub const E_STOP: u16 = 44;
}

/// Auto-program register offsets, relative to [`base::AUTO_PROGRAM`].
pub mod auto_program {
    pub const COUNTERS_START: u16 = 0; // +0..+9
    pub const ENABLE: u16 = 50;
}

/// Angle-correction servo register offsets, relative to [`base::ANGLE_SERVO`].
pub mod angle_servo {
    pub const STATUS_WORD: u16 = 0;
    pub const CONNECTIONS_START: u16 = 1; // +1..+2
    pub const SUCCESS: u16 = 20;
    pub const ANGLE_HI: u16 = 21;
    pub const ANGLE_LO: u16 = 22;
    pub const SERVO_POSITION_HI: u16 = 25;
    pub const SERVO_POSITION_LO: u16 = 26;
    pub const COMMAND: u16 = 40;
}

/// I/O flow control coil offsets, relative to [`base::IO_FLOW`]. The base
/// happens to coincide with the flip coil's own address (447), so `FLIP`'s
/// offset is 0.
pub mod io_flow {
    pub const FLIP: u16 = 0;
    pub const VIBRATION_FEED: u16 = 1;
}
