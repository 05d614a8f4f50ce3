/// Well-known topic names. Payloads are opaque bytes at the bus boundary;
/// the schema for each topic is owned by the producer/consumer pair, not
/// by the bus itself.
pub const CONTAINER_METRICS: &str = "container-metrics";
pub const HTTP_METRICS: &str = "http-metrics";
pub const INSTANCE_METRICS: &str = "instance-metrics";
pub const APPLICATION_METRICS: &str = "application-metrics";
pub const SCALING_LOGS: &str = "scaling-logs";
pub const BINDING_EVENTS: &str = "binding-events";
