// src/shared_data.rs

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Derived motion state of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleState {
    Moving,
    Stopped,
}

impl VehicleState {
    /// `Moving` iff the vehicle has a strictly positive speed.
    pub fn from_speed(speed: f64) -> Self {
        if speed > 0.0 {
            VehicleState::Moving
        } else {
            VehicleState::Stopped
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrakeStatus {
    Applied,
    NotApplied,
}

/// Geographic coordinates, serialized as `[latitude, longitude]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position(pub f64, pub f64);

impl Position {
    pub fn latitude(&self) -> f64 {
        self.0
    }

    pub fn longitude(&self) -> f64 {
        self.1
    }
}

/// One vehicle as seen by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    pub id: String,
    /// km/h
    pub speed: f64,
    /// m/s²
    pub acceleration: f64,
    pub state: VehicleState,
    pub brake_status: BrakeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Degrees clockwise from north.
    #[serde(default)]
    pub heading: f64,
}

impl VehicleRecord {
    pub fn new(id: &str, speed: f64, acceleration: f64, brake_status: BrakeStatus) -> Self {
        Self {
            id: id.to_string(),
            speed,
            acceleration,
            state: VehicleState::from_speed(speed),
            brake_status,
            position: None,
            heading: 0.0,
        }
    }

    pub fn with_position(mut self, position: Position, heading: f64) -> Self {
        self.position = Some(position);
        self.heading = heading;
        self
    }
}

/// A road condition report. `type` is a free-text category, `condition` the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadConditionRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub condition: String,
}

impl RoadConditionRecord {
    pub fn new(kind: &str, condition: &str) -> Self {
        Self {
            kind: kind.to_string(),
            condition: condition.to_string(),
        }
    }
}

/// The full published state at one tick. Served by `GET /data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub tick: u64,
    pub timestamp: u64,
    pub vehicles: Vec<VehicleRecord>,
    pub road_conditions: Vec<RoadConditionRecord>,
}

pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_record_uses_dashboard_field_names() {
        let record = VehicleRecord::new("V001", 60.0, 2.5, BrakeStatus::NotApplied)
            .with_position(Position(51.4965, -0.0731), 90.0);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], "V001");
        assert_eq!(json["state"], "Moving");
        assert_eq!(json["brakeStatus"], "NotApplied");
        assert_eq!(json["position"], serde_json::json!([51.4965, -0.0731]));
        assert_eq!(json["heading"], 90.0);
    }

    #[test]
    fn position_and_heading_are_optional_on_the_wire() {
        let raw = r#"{"id":"V002","speed":0,"acceleration":0,"state":"Stopped","brakeStatus":"Applied"}"#;
        let record: VehicleRecord = serde_json::from_str(raw).unwrap();

        assert_eq!(record.position, None);
        assert_eq!(record.heading, 0.0);
        assert_eq!(record.state, VehicleState::Stopped);
        assert!(!serde_json::to_string(&record).unwrap().contains("position"));
    }

    #[test]
    fn road_condition_serializes_kind_as_type() {
        let record = RoadConditionRecord::new("Hazard", "Construction Zone");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"type":"Hazard","condition":"Construction Zone"}"#);
    }

    #[test]
    fn state_follows_speed_sign() {
        assert_eq!(VehicleState::from_speed(0.0), VehicleState::Stopped);
        assert_eq!(VehicleState::from_speed(0.01), VehicleState::Moving);
    }
}
