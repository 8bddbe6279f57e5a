// communication/mod.rs
pub mod amqp;
pub mod hub;
pub mod messages;
pub mod source;
pub mod websocket;

pub use hub::{BroadcastHub, EventPublisher, HubSource};
pub use messages::TelemetryEvent;
pub use source::{EventSource, SourceSignal};
