// AMQP transport: the relay publishes each tick to a direct exchange keyed by
// event name, and every monitor binds its own exclusive queue to both keys.
use crate::communication::hub::EventPublisher;
use crate::communication::messages::TelemetryEvent;
use crate::communication::source::{EventSource, SourceSignal};
use crate::error::Result;
use crate::global_variables::{
    AMQP_TELEMETRY_EXCHANGE, EVENT_ROAD_CONDITION_UPDATE, EVENT_VEHICLE_UPDATE,
};
use amiquip::{
    Channel, Connection, ConsumerMessage, ConsumerOptions, ExchangeDeclareOptions, ExchangeType,
    FieldTable, Publish, QueueDeclareOptions,
};
use log::{info, warn};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// How often an idle consumer checks whether its subscription is still wanted.
const CONSUMER_POLL: Duration = Duration::from_millis(250);

pub struct AmqpPublisher {
    connection: Connection,
    channel: Channel,
}

impl AmqpPublisher {
    pub fn connect(url: &str) -> Result<Self> {
        let mut connection = Connection::insecure_open(url)?;
        let channel = connection.open_channel(None)?;
        channel.exchange_declare(
            ExchangeType::Direct,
            AMQP_TELEMETRY_EXCHANGE,
            ExchangeDeclareOptions::default(),
        )?;
        info!("[AMQP] Publishing to exchange '{}'", AMQP_TELEMETRY_EXCHANGE);
        Ok(Self {
            connection,
            channel,
        })
    }

    pub fn close(self) -> Result<()> {
        self.channel.close()?;
        self.connection.close()?;
        Ok(())
    }
}

impl EventPublisher for AmqpPublisher {
    fn name(&self) -> &str {
        "amqp"
    }

    /// The broker fans out to queues, so the only recipient seen here is the broker.
    fn publish(&mut self, _tick: u64, event: &TelemetryEvent) -> Result<usize> {
        let payload = event.to_json()?;
        self.channel.basic_publish(
            AMQP_TELEMETRY_EXCHANGE,
            Publish::new(payload.as_bytes(), event.name()),
        )?;
        Ok(1)
    }
}

/// Subscriber over AMQP. Runs the blocking consumer on tokio's blocking pool.
pub struct AmqpSource {
    url: String,
}

impl AmqpSource {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

impl EventSource for AmqpSource {
    fn start(self, signals: mpsc::Sender<SourceSignal>) -> JoinHandle<()> {
        tokio::task::spawn_blocking(move || {
            if let Err(e) = consume_telemetry(&self.url, &signals) {
                warn!("[AMQP] Consumer failed: {}", e);
                let _ = signals.blocking_send(SourceSignal::Disconnected(e.to_string()));
            }
        })
    }
}

fn consume_telemetry(url: &str, signals: &mpsc::Sender<SourceSignal>) -> Result<()> {
    let mut connection = Connection::insecure_open(url)?;
    let channel = connection.open_channel(None)?;
    let exchange = channel.exchange_declare(
        ExchangeType::Direct,
        AMQP_TELEMETRY_EXCHANGE,
        ExchangeDeclareOptions::default(),
    )?;
    let queue = channel.queue_declare(
        "",
        QueueDeclareOptions {
            exclusive: true,
            ..QueueDeclareOptions::default()
        },
    )?;
    for routing_key in [EVENT_VEHICLE_UPDATE, EVENT_ROAD_CONDITION_UPDATE] {
        queue.bind(&exchange, routing_key, FieldTable::default())?;
    }
    let consumer = queue.consume(ConsumerOptions {
        no_ack: true,
        ..ConsumerOptions::default()
    })?;
    info!("[AMQP] Subscribed to '{}'", AMQP_TELEMETRY_EXCHANGE);

    if signals.blocking_send(SourceSignal::Connected).is_ok() {
        loop {
            match consumer.receiver().recv_timeout(CONSUMER_POLL) {
                Ok(ConsumerMessage::Delivery(delivery)) => {
                    let signal = match TelemetryEvent::from_slice(&delivery.body) {
                        Ok(event) => SourceSignal::Event(event),
                        Err(e) => SourceSignal::Malformed(e.to_string()),
                    };
                    if signals.blocking_send(signal).is_err() {
                        break;
                    }
                }
                Ok(other) => {
                    let _ = signals.blocking_send(SourceSignal::Disconnected(format!(
                        "consumer ended: {:?}",
                        other
                    )));
                    break;
                }
                Err(e) if e.is_timeout() => {
                    if signals.is_closed() {
                        break;
                    }
                }
                Err(_) => {
                    let _ = signals.blocking_send(SourceSignal::Disconnected(
                        "consumer channel closed".to_string(),
                    ));
                    break;
                }
            }
        }
    }

    drop(consumer);
    connection.close()?;
    Ok(())
}
