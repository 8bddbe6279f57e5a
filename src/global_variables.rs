// Server defaults
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_BROADCAST_INTERVAL_MS: u64 = 2000;

// Client defaults
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

// Event names on the pub/sub channel
pub const EVENT_VEHICLE_UPDATE: &str = "vehicleUpdate";
pub const EVENT_ROAD_CONDITION_UPDATE: &str = "roadConditionUpdate";

// AMQP exchange the relay publishes to (routing key = event name)
pub const AMQP_TELEMETRY_EXCHANGE: &str = "vehicle_telemetry";

// Simulation bounds
pub const MAX_SPEED_KMH: f64 = 120.0;
pub const SPEED_JITTER_SPAN: f64 = 10.0;
pub const ACCELERATION_SPAN: f64 = 5.0;
pub const BRAKE_APPLIED_PROBABILITY: f64 = 0.3;

// Geofence around the seeded vehicles (degrees)
pub const GEOFENCE_CENTER: (f64, f64) = (51.4970, -0.0726);
pub const GEOFENCE_HALF_SPAN_DEG: f64 = 0.01;

// Capacity of the in-process broadcast hub
pub const HUB_CAPACITY: usize = 16;
