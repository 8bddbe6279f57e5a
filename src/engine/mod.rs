// engine/mod.rs
pub mod broadcast_loop;

pub use broadcast_loop::{BroadcastLoop, LoopState, TickReport};
