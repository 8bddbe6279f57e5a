// lib.rs
pub mod communication;
pub mod config;
pub mod engine;
pub mod error;
pub mod global_variables;
pub mod monitoring;
pub mod server;
pub mod shared_data;
pub mod simulation_engine;
