use crate::error::Result;
use crate::global_variables::{EVENT_ROAD_CONDITION_UPDATE, EVENT_VEHICLE_UPDATE};
use crate::shared_data::{RoadConditionRecord, TelemetrySnapshot, VehicleRecord};
use serde::{Deserialize, Serialize};

/// An event on the publish/subscribe channel.
///
/// Encoded as `{"event": "vehicleUpdate", "payload": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum TelemetryEvent {
    VehicleUpdate(Vec<VehicleRecord>),
    RoadConditionUpdate(Vec<RoadConditionRecord>),
}

impl TelemetryEvent {
    /// The pair published on every tick, vehicles first.
    pub fn from_snapshot(snapshot: &TelemetrySnapshot) -> [TelemetryEvent; 2] {
        [
            TelemetryEvent::VehicleUpdate(snapshot.vehicles.clone()),
            TelemetryEvent::RoadConditionUpdate(snapshot.road_conditions.clone()),
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            TelemetryEvent::VehicleUpdate(_) => EVENT_VEHICLE_UPDATE,
            TelemetryEvent::RoadConditionUpdate(_) => EVENT_ROAD_CONDITION_UPDATE,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashboardError;
    use crate::shared_data::{BrakeStatus, Position};
    use crate::simulation_engine::simulation::{simulate_step, SimulationBounds};
    use crate::simulation_engine::store::TelemetryStore;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::time::Duration;

    #[test]
    fn event_names_match_channel_names() {
        let snapshot = TelemetryStore::seeded().snapshot(1);
        let [vehicles, roads] = TelemetryEvent::from_snapshot(&snapshot);
        assert_eq!(vehicles.name(), "vehicleUpdate");
        assert_eq!(roads.name(), "roadConditionUpdate");
    }

    #[test]
    fn encoding_is_tagged_with_event_and_payload() {
        let event = TelemetryEvent::RoadConditionUpdate(vec![RoadConditionRecord::new(
            "Surface", "Wet",
        )]);
        let json = event.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"event":"roadConditionUpdate","payload":[{"type":"Surface","condition":"Wet"}]}"#
        );
    }

    #[test]
    fn simulated_vehicles_decode_to_identical_records() {
        let mut store = TelemetryStore::seeded();
        let bounds = SimulationBounds::new(Duration::from_millis(2000));
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..25 {
            simulate_step(store.vehicles_mut(), &bounds, &mut rng);
        }
        let published = TelemetryEvent::VehicleUpdate(store.vehicles().to_vec());

        let decoded = TelemetryEvent::from_json(&published.to_json().unwrap()).unwrap();
        assert_eq!(decoded, published);
        let decoded = TelemetryEvent::from_slice(published.to_json().unwrap().as_bytes()).unwrap();
        assert_eq!(decoded, published);
    }

    #[test]
    fn awkward_floats_survive_encoding() {
        let published = TelemetryEvent::VehicleUpdate(vec![VehicleRecord::new(
            "V001",
            1.0321764473808681,
            -2.220446049250313e-16,
            BrakeStatus::NotApplied,
        )
        .with_position(Position(51.49651234567891, -0.07310987654321012), 359.99999999999994)]);
        let decoded = TelemetryEvent::from_json(&published.to_json().unwrap()).unwrap();
        assert_eq!(decoded, published);
    }

    #[test]
    fn unknown_event_is_a_payload_error() {
        let err = TelemetryEvent::from_json(r#"{"event":"lidarUpdate","payload":[]}"#).unwrap_err();
        assert!(matches!(err, DashboardError::Payload(_)));
    }

    #[test]
    fn wrong_payload_shape_is_rejected() {
        let raw = br#"{"event":"vehicleUpdate","payload":{"id":"V001"}}"#;
        assert!(TelemetryEvent::from_slice(raw).is_err());
    }
}
