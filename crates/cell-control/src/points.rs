//! Named robot targets loaded from a JSON points file. Each point carries
//! both its Cartesian and joint representation; a flow uses whichever form
//! its motion primitive expects.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::FlowError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cartesian {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub r: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub j1: f64,
    pub j2: f64,
    pub j3: f64,
    pub j4: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub cartesian: Cartesian,
    pub joint: Joint,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointsConfig {
    points: HashMap<String, Point>,
}

impl PointsConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(std::io::Error::other)
    }

    pub fn get(&self, name: &str) -> Result<Point, FlowError> {
        self.points
            .get(name)
            .copied()
            .ok_or_else(|| FlowError::UnknownPoint(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_point_is_a_named_error() {
        let config = PointsConfig::default();
        let err = config.get("standby").unwrap_err();
        assert!(matches!(err, FlowError::UnknownPoint(name) if name == "standby"));
    }

    #[test]
    fn round_trips_through_json() {
        let mut points = HashMap::new();
        points.insert(
            "standby".to_string(),
            Point {
                cartesian: Cartesian { x: 100.0, y: 0.0, z: 200.0, r: 0.0 },
                joint: Joint { j1: 0.0, j2: -10.0, j3: 20.0, j4: 0.0 },
            },
        );
        let config = PointsConfig { points };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: PointsConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.get("standby").unwrap(), config.get("standby").unwrap());
    }
}
