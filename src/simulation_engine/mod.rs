// simulation_engine/mod.rs
pub mod position;
pub mod simulation;
pub mod store;

pub use simulation::{simulate_step, step_vehicle, SimulationBounds};
pub use store::TelemetryStore;
