// simulation.rs
use crate::global_variables::{
    ACCELERATION_SPAN, BRAKE_APPLIED_PROBABILITY, GEOFENCE_CENTER, GEOFENCE_HALF_SPAN_DEG,
    MAX_SPEED_KMH, SPEED_JITTER_SPAN,
};
use crate::shared_data::{BrakeStatus, VehicleRecord, VehicleState};
use crate::simulation_engine::position::{advance_position, GeoFence};
use rand::Rng;
use std::time::Duration;

/// Physical limits applied on every simulation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationBounds {
    pub max_speed: f64,
    /// Time that passes between two steps; drives position updates.
    pub step_interval: Duration,
    pub geofence: Option<GeoFence>,
}

impl SimulationBounds {
    pub fn new(step_interval: Duration) -> Self {
        Self {
            max_speed: MAX_SPEED_KMH,
            step_interval,
            geofence: Some(GeoFence::around(GEOFENCE_CENTER, GEOFENCE_HALF_SPAN_DEG)),
        }
    }
}

/// Perturbs one vehicle in place.
pub fn step_vehicle<R: Rng>(
    vehicle: &mut VehicleRecord,
    bounds: &SimulationBounds,
    rng: &mut R,
) {
    let speed_delta = (rng.random::<f64>() - 0.5) * SPEED_JITTER_SPAN;
    vehicle.speed = (vehicle.speed + speed_delta).clamp(0.0, bounds.max_speed);
    vehicle.acceleration = (rng.random::<f64>() - 0.5) * ACCELERATION_SPAN;
    vehicle.state = VehicleState::from_speed(vehicle.speed);
    vehicle.brake_status = if rng.random_bool(BRAKE_APPLIED_PROBABILITY) {
        BrakeStatus::Applied
    } else {
        BrakeStatus::NotApplied
    };

    if let Some(position) = vehicle.position {
        let (next, heading) = advance_position(
            position,
            vehicle.heading,
            vehicle.speed,
            bounds.step_interval,
            bounds.geofence.as_ref(),
        );
        vehicle.position = Some(next);
        vehicle.heading = heading;
    }

    debug_assert!((0.0..=bounds.max_speed).contains(&vehicle.speed));
    debug_assert_eq!(vehicle.state, VehicleState::from_speed(vehicle.speed));
}

/// Advances every vehicle by one tick. Vehicles do not interact.
pub fn simulate_step<R: Rng>(
    vehicles: &mut [VehicleRecord],
    bounds: &SimulationBounds,
    rng: &mut R,
) {
    for vehicle in vehicles.iter_mut() {
        step_vehicle(vehicle, bounds, rng);
    }
}
