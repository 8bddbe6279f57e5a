use crate::shared_data::{
    current_timestamp, BrakeStatus, Position, RoadConditionRecord, TelemetrySnapshot,
    VehicleRecord,
};

/// In-memory telemetry held by the relay for the lifetime of the process.
///
/// The store has exactly one owner, the broadcast loop. Subscribers never see
/// it directly; they receive the clones produced by [`TelemetryStore::snapshot`].
#[derive(Debug, Clone)]
pub struct TelemetryStore {
    vehicles: Vec<VehicleRecord>,
    road_conditions: Vec<RoadConditionRecord>,
}

impl TelemetryStore {
    pub fn new(vehicles: Vec<VehicleRecord>, road_conditions: Vec<RoadConditionRecord>) -> Self {
        Self {
            vehicles,
            road_conditions,
        }
    }

    /// Store populated from the fixed seed list.
    pub fn seeded() -> Self {
        Self::new(create_seed_vehicles(), create_seed_road_conditions())
    }

    pub fn vehicles(&self) -> &[VehicleRecord] {
        &self.vehicles
    }

    /// Records may be mutated in place but never added or removed.
    pub fn vehicles_mut(&mut self) -> &mut [VehicleRecord] {
        &mut self.vehicles
    }

    pub fn road_conditions(&self) -> &[RoadConditionRecord] {
        &self.road_conditions
    }

    pub fn snapshot(&self, tick: u64) -> TelemetrySnapshot {
        TelemetrySnapshot {
            tick,
            timestamp: current_timestamp(),
            vehicles: self.vehicles.clone(),
            road_conditions: self.road_conditions.clone(),
        }
    }
}

pub fn create_seed_vehicles() -> Vec<VehicleRecord> {
    vec![
        VehicleRecord::new("V001", 60.0, 2.5, BrakeStatus::NotApplied)
            .with_position(Position(51.4965, -0.0731), 90.0),
        VehicleRecord::new("V002", 0.0, 0.0, BrakeStatus::Applied)
            .with_position(Position(51.4975, -0.0721), 180.0),
    ]
}

pub fn create_seed_road_conditions() -> Vec<RoadConditionRecord> {
    vec![
        RoadConditionRecord::new("Surface", "Wet"),
        RoadConditionRecord::new("Hazard", "Construction Zone"),
    ]
}
