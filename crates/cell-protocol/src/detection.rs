//! The per-camera FIFO element produced by a capture+detect cycle.

/// A single detected part, decoded from a camera's result registers.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectionRecord {
    pub id: u32,
    pub pixel_xy: (i32, i32),
    pub radius: i32,
    /// World coordinates in millimeters (0.01 mm resolution from the wire).
    pub world_xy: (f64, f64),
    /// Monotonic milliseconds since the client was constructed; used only
    /// for ordering/inspection, never persisted.
    pub timestamp_ms: u64,
    pub r: Option<f64>,
}
