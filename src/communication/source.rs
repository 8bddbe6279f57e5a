use crate::communication::messages::TelemetryEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What a transport reports to a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSignal {
    Connected,
    Event(TelemetryEvent),
    /// A frame arrived that could not be decoded.
    Malformed(String),
    Disconnected(String),
}

/// A client-side transport that feeds [`SourceSignal`]s to a subscriber.
///
/// Implementations must stop once `signals` is closed, which is how a
/// subscription tells its source to shut down.
pub trait EventSource: Send + 'static {
    fn start(self, signals: mpsc::Sender<SourceSignal>) -> JoinHandle<()>;
}
