use crate::wrapper::ComponentWrapper;
use scaler_core::{ApplicationMetric, Binding, ContainerMetric, HttpMetric, ScalerError};
use std::collections::HashMap;
use tokio::sync::{Mutex, MutexGuard};

/// Minimum allowed `cooldownTime`, in seconds.
pub const COOLDOWN_MIN: i64 = 30;
/// Minimum allowed `learningTimeMultiplier`.
pub const LEARNING_MULTIPLIER_MIN: u32 = 1;
/// Minimum allowed `scalingIntervalMultiplier`.
pub const SCALING_INTERVAL_MULTIPLIER_MIN: u32 = 1;

/// Everything guarded by a ScalableApp's mutex: its policy wrappers,
/// scheduling state and metric buffers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub binding: Binding,
    pub cpu: ComponentWrapper,
    pub ram: ComponentWrapper,
    pub request: ComponentWrapper,
    pub latency: ComponentWrapper,
    pub min_instances: u32,
    pub max_instances: u32,
    pub min_quotient: f64,
    pub cooldown_time: i64,
    pub learning_time_multiplier: u32,
    pub scaling_interval_multiplier: u32,
    pub current_interval_state: u32,
    pub last_scaling_time: i64,
    pub learning_start_time: i64,
    pub instance_count: u32,
    max_metric_list_size: usize,
    container_metrics: Vec<ContainerMetric>,
    http_metrics: Vec<HttpMetric>,
    application_metrics: Vec<ApplicationMetric>,
}

impl AppState {
    fn push_bounded<T>(list: &mut Vec<T>, item: T, bound: usize) {
        list.push(item);
        if list.len() > bound {
            list.remove(0);
        }
    }

    pub fn add_container_metric(&mut self, metric: ContainerMetric) {
        Self::push_bounded(&mut self.container_metrics, metric, self.max_metric_list_size);
    }

    pub fn add_http_metric(&mut self, metric: HttpMetric) {
        Self::push_bounded(&mut self.http_metrics, metric, self.max_metric_list_size);
    }

    pub fn add_application_metric(&mut self, metric: ApplicationMetric) {
        Self::push_bounded(&mut self.application_metrics, metric, self.max_metric_list_size);
    }

    pub fn reset_container_metrics_list(&mut self) {
        self.container_metrics.clear();
    }

    pub fn reset_http_metric_list(&mut self) {
        self.http_metrics.clear();
    }

    pub fn get_copy_of_container_metrics_list(&self) -> Vec<ContainerMetric> {
        self.container_metrics.clone()
    }

    pub fn get_copy_of_http_metrics_list(&self) -> Vec<HttpMetric> {
        self.http_metrics.clone()
    }

    pub fn get_copy_of_application_metrics_list(&self) -> Vec<ApplicationMetric> {
        self.application_metrics.clone()
    }

    /// The last container metric per instance, restricted to samples no
    /// older than `max_metric_age` seconds and not carrying the -1
    /// "missing" sentinel, reduced through the CPU wrapper's policy.
    pub fn value_of_cpu(&self, now: i64, max_metric_age: i64) -> Option<f64> {
        self.latest_per_instance(now, max_metric_age, |m| {
            (m.cpu >= 0.0).then_some(m.cpu)
        })
        .and_then(|samples| self.cpu.reduce(&samples))
    }

    /// As `value_of_cpu`, over the RAM field.
    pub fn value_of_ram(&self, now: i64, max_metric_age: i64) -> Option<f64> {
        self.latest_per_instance(now, max_metric_age, |m| {
            (m.ram >= 0.0).then_some(m.ram)
        })
        .and_then(|samples| self.ram.reduce(&samples))
    }

    /// HTTP/latency dimensions read from the aggregated application-metric
    /// window rather than raw container metrics.
    pub fn value_of_http(&self, now: i64, max_metric_age: i64) -> Option<f64> {
        let samples: Vec<f64> = self
            .application_metrics
            .iter()
            .filter(|m| now - m.timestamp <= max_metric_age)
            .map(|m| m.requests as f64)
            .collect();
        self.request.reduce(&samples)
    }

    pub fn value_of_latency(&self, now: i64, max_metric_age: i64) -> Option<f64> {
        let samples: Vec<f64> = self
            .application_metrics
            .iter()
            .filter(|m| now - m.timestamp <= max_metric_age && m.latency >= 0.0)
            .map(|m| m.latency)
            .collect();
        self.latency.reduce(&samples)
    }

    fn latest_per_instance(
        &self,
        now: i64,
        max_metric_age: i64,
        extract: impl Fn(&ContainerMetric) -> Option<f64>,
    ) -> Option<Vec<f64>> {
        let mut latest: HashMap<u32, (i64, f64)> = HashMap::new();
        for m in self
            .container_metrics
            .iter()
            .filter(|m| now - m.timestamp <= max_metric_age)
        {
            if let Some(value) = extract(m) {
                latest
                    .entry(m.instance_index)
                    .and_modify(|(ts, v)| {
                        if m.timestamp > *ts {
                            *ts = m.timestamp;
                            *v = value;
                        }
                    })
                    .or_insert((m.timestamp, value));
            }
        }
        if latest.is_empty() {
            None
        } else {
            Some(latest.into_values().map(|(_, v)| v).collect())
        }
    }
}

/// Per-binding aggregate state. Guarded by a single mutex so that every
/// read and mutation of wrappers, buffers and scheduling state is
/// serialized at the granularity that matches the scaling decision unit.
/// `id` and `resource_id` are cached outside the lock since they never
/// change after construction and registry lookups must not require an
/// `await`.
#[derive(Debug)]
pub struct ScalableApp {
    id: String,
    resource_id: String,
    state: Mutex<AppState>,
}

impl ScalableApp {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        binding: Binding,
        cpu: ComponentWrapper,
        ram: ComponentWrapper,
        request: ComponentWrapper,
        latency: ComponentWrapper,
        min_instances: u32,
        max_instances: u32,
        min_quotient: f64,
        cooldown_time: i64,
        learning_time_multiplier: u32,
        scaling_interval_multiplier: u32,
        max_metric_list_size: usize,
    ) -> Result<Self, ScalerError> {
        if max_instances < min_instances {
            return Err(ScalerError::Limit(format!(
                "maxInstances ({}) must be >= minInstances ({})",
                max_instances, min_instances
            )));
        }
        if cooldown_time < COOLDOWN_MIN {
            return Err(ScalerError::Limit(format!(
                "cooldownTime ({}) must be >= {}",
                cooldown_time, COOLDOWN_MIN
            )));
        }
        if learning_time_multiplier < LEARNING_MULTIPLIER_MIN {
            return Err(ScalerError::Limit(format!(
                "learningTimeMultiplier ({}) must be >= {}",
                learning_time_multiplier, LEARNING_MULTIPLIER_MIN
            )));
        }
        if scaling_interval_multiplier < SCALING_INTERVAL_MULTIPLIER_MIN {
            return Err(ScalerError::Limit(format!(
                "scalingIntervalMultiplier ({}) must be >= {}",
                scaling_interval_multiplier, SCALING_INTERVAL_MULTIPLIER_MIN
            )));
        }
        if binding.creation_time < 0 {
            return Err(ScalerError::Time(
                "binding.creationTime must be >= 0".to_string(),
            ));
        }
        cpu.validate()?;
        ram.validate()?;
        request.validate()?;
        latency.validate()?;

        let id = binding.id.clone();
        let resource_id = binding.resource_id.clone();
        let creation_time = binding.creation_time;

        Ok(Self {
            id,
            resource_id,
            state: Mutex::new(AppState {
                binding,
                cpu,
                ram,
                request,
                latency,
                min_instances,
                max_instances,
                min_quotient,
                cooldown_time,
                learning_time_multiplier,
                scaling_interval_multiplier,
                current_interval_state: 0,
                last_scaling_time: creation_time,
                learning_start_time: creation_time,
                instance_count: min_instances.max(1),
                max_metric_list_size,
                container_metrics: Vec::new(),
                http_metrics: Vec::new(),
                application_metrics: Vec::new(),
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Acquires the app's mutex. Interruptible via the returned future's
    /// cancellation; on cancellation the lock is never taken, matching
    /// the "skip this app's work" behavior required on interruption.
    pub async fn acquire(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().await
    }
}
