use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identity of a bound application. Immutable after creation except
/// `resource_name`, which is set at most once, at bind time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Binding {
    pub id: String,
    pub resource_id: String,
    pub scaler_id: String,
    pub service_id: String,
    pub context: HashMap<String, String>,
    pub creation_time: i64,
    pub resource_name: Option<String>,
}

impl Binding {
    pub fn new(
        id: impl Into<String>,
        resource_id: impl Into<String>,
        scaler_id: impl Into<String>,
        service_id: impl Into<String>,
        creation_time: i64,
    ) -> Self {
        Self {
            id: id.into(),
            resource_id: resource_id.into(),
            scaler_id: scaler_id.into(),
            service_id: service_id.into(),
            context: HashMap::new(),
            creation_time,
            resource_name: None,
        }
    }

    pub fn with_context(mut self, context: HashMap<String, String>) -> Self {
        self.context = context;
        self
    }
}

/// The reduction applied across per-instance samples before comparison
/// against a component's limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ThresholdPolicy {
    Max,
    Min,
    Mean,
}

/// The scalable dimension a ScalingAction or ScalingLog attributes a
/// decision to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScalingReason {
    Cpu,
    Ram,
    Http,
    Latency,
    Quotient,
    None,
}

impl fmt::Display for ScalingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScalingReason::Cpu => "CPU",
            ScalingReason::Ram => "RAM",
            ScalingReason::Http => "HTTP",
            ScalingReason::Latency => "LATENCY",
            ScalingReason::Quotient => "QUOTIENT",
            ScalingReason::None => "NONE",
        };
        write!(f, "{}", s)
    }
}

/// A single container-level sample. `cpu`/`ram` of -1 mean "missing".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerMetric {
    pub timestamp: i64,
    pub app_id: String,
    pub instance_index: u32,
    pub cpu: f64,
    pub ram: f64,
    pub description: String,
}

/// A single HTTP-level sample. `latency` of -1 means "missing".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpMetric {
    pub timestamp: i64,
    pub app_id: String,
    pub requests: u64,
    pub latency: f64,
    pub description: String,
}

/// A platform-sourced instance-count notification for one app. `app_id`
/// carries the resourceId, matching ContainerMetric/HttpMetric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceMetric {
    pub timestamp: i64,
    pub app_id: String,
    pub instance_count: u32,
}

/// An application-level metric derived by the aggregator from a window of
/// ContainerMetric and HttpMetric samples.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplicationMetric {
    pub timestamp: i64,
    pub app_id: String,
    pub cpu: f64,
    pub ram: f64,
    pub requests: u64,
    pub latency: f64,
    pub quotient: f64,
    pub instance_count: u32,
    pub description: String,
}

/// The outcome of evaluating a ScalableApp against its scaling policies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalingAction {
    pub app_id: String,
    pub old_instances: u32,
    pub new_instances: u32,
    pub reason: ScalingReason,
    pub needs_scaling: bool,
    pub description: String,
}

impl ScalingAction {
    pub fn none(app_id: impl Into<String>, instances: u32) -> Self {
        Self {
            app_id: app_id.into(),
            old_instances: instances,
            new_instances: instances,
            reason: ScalingReason::None,
            needs_scaling: false,
            description: String::new(),
        }
    }
}

/// A ScalingAction plus the decision timestamp and the component readings
/// that drove it, published onto the bus for telemetry purposes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalingLog {
    pub action: ScalingAction,
    pub decision_time: i64,
    pub cpu_value: f64,
    pub ram_value: f64,
    pub request_value: f64,
    pub latency_value: f64,
}

/// The lifecycle action carried by a BindingEvent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BindingAction {
    Creating,
    Loading,
    Deleting,
}

/// A binding lifecycle notification published onto the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BindingEvent {
    pub binding_id: String,
    pub resource_id: String,
    pub action: BindingAction,
    pub timestamp: i64,
}
