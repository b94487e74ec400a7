//! Persisted cell configuration (JSON) and local CLI preferences (TOML).
//!
//! No runtime state is persisted — on restart the cell is re-homed, so
//! this module only ever loads configuration, never a snapshot of state.

use cell_protocol::registers::base;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Register base relocation: every module's block can be moved without a
/// code change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegisterBases {
    pub camera_a: u16,
    pub camera_b: u16,
    pub gripper: u16,
    pub feeder: u16,
    pub motion: u16,
    pub auto_program: u16,
    pub io_flow: u16,
    pub angle_servo: u16,
}

impl Default for RegisterBases {
    fn default() -> Self {
        Self {
            camera_a: base::CAMERA_A,
            camera_b: base::CAMERA_B,
            gripper: base::GRIPPER,
            feeder: base::FEEDER,
            motion: base::MOTION,
            auto_program: base::AUTO_PROGRAM,
            io_flow: base::IO_FLOW,
            angle_servo: base::ANGLE_SERVO,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(with = "duration_secs")]
    pub ready_wait: Duration,
    #[serde(with = "duration_secs")]
    pub running_transition_wait: Duration,
    #[serde(with = "duration_secs")]
    pub motion_completion: Duration,
    #[serde(with = "duration_secs")]
    pub angle_detect: Duration,
    #[serde(with = "duration_secs")]
    pub cycle_interval: Duration,
    #[serde(with = "duration_secs")]
    pub completion_grace: Duration,
    #[serde(with = "duration_millis")]
    pub min_running_hold: Duration,
    #[serde(with = "duration_millis")]
    pub dispatcher_poll_interval: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            ready_wait: Duration::from_secs(10),
            running_transition_wait: Duration::from_secs(10),
            motion_completion: Duration::from_secs(30),
            angle_detect: Duration::from_secs(10),
            cycle_interval: Duration::from_secs(2),
            completion_grace: Duration::from_secs(2),
            min_running_hold: Duration::from_secs(1),
            dispatcher_poll_interval: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureEnables {
    pub auto_program: bool,
    pub angle_correction: bool,
}

impl Default for FeatureEnables {
    fn default() -> Self {
        Self {
            auto_program: true,
            angle_correction: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellConfig {
    pub robot_ip: String,
    pub robot_port: u16,
    pub modbus_host: String,
    pub modbus_port: u16,
    #[serde(default)]
    pub registers: RegisterBases,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub features: FeatureEnables,
    pub points_file: String,
}

impl CellConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(std::io::Error::other)
    }
}

/// Local, non-persisted-cell-state CLI preferences: preferred default
/// host/port for the interactive binary. Ambient nicety, not part of the
/// cell's own JSON configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliPreferences {
    pub default_config_path: Option<String>,
    pub verbose: Option<bool>,
}

impl CliPreferences {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(std::io::Error::other)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_config_round_trips_through_json() {
        let config = CellConfig {
            robot_ip: "192.168.1.10".to_string(),
            robot_port: 5000,
            modbus_host: "192.168.1.20".to_string(),
            modbus_port: 502,
            registers: RegisterBases::default(),
            timing: TimingConfig::default(),
            features: FeatureEnables::default(),
            points_file: "points.json".to_string(),
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: CellConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.robot_port, 5000);
        assert_eq!(parsed.timing.min_running_hold, Duration::from_secs(1));
    }
}
