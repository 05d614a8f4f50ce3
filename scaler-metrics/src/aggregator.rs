use scaler_bus::{publish_json, topics, MessageBus};
use scaler_core::{now_unix, ApplicationMetric};
use scaler_registry::ScalableAppManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Periodic task that collapses buffered container/HTTP metrics into one
/// ApplicationMetric per app and publishes it, feeding the scaling
/// decision.
pub struct Aggregator {
    manager: Arc<ScalableAppManager>,
    bus: Arc<dyn MessageBus>,
    max_metric_age_secs: i64,
    period: Duration,
}

impl Aggregator {
    pub fn new(
        manager: Arc<ScalableAppManager>,
        bus: Arc<dyn MessageBus>,
        max_metric_age_secs: i64,
        period: Duration,
    ) -> Self {
        Self {
            manager,
            bus,
            max_metric_age_secs,
            period,
        }
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.period);
        loop {
            tokio::select! {
                _ = shutdown.changed() => return,
                _ = interval.tick() => self.tick().await,
            }
        }
    }

    /// Runs one aggregation pass over every registered app.
    pub async fn tick(&self) {
        let now = now_unix();
        for app in self.manager.get_flat_copy_of_apps().await {
            let published = {
                let mut guard = app.acquire().await;

                let container_metrics = guard.get_copy_of_container_metrics_list();
                let mut cpu_sum = 0.0;
                let mut cpu_count = 0u32;
                let mut ram_sum = 0.0;
                let mut ram_count = 0u32;
                for metric in container_metrics
                    .iter()
                    .filter(|m| now - m.timestamp <= self.max_metric_age_secs)
                {
                    if metric.cpu >= 0.0 {
                        cpu_sum += metric.cpu;
                        cpu_count += 1;
                    }
                    if metric.ram >= 0.0 {
                        ram_sum += metric.ram;
                        ram_count += 1;
                    }
                }
                guard.reset_container_metrics_list();

                let http_metrics = guard.get_copy_of_http_metrics_list();
                let mut request_sum = 0u64;
                let mut latency_sum = 0.0;
                let mut latency_count = 0u32;
                for metric in http_metrics.iter().filter(|m| {
                    now - m.timestamp <= self.max_metric_age_secs && m.requests > 0
                }) {
                    request_sum += metric.requests;
                    if metric.latency >= 0.0 {
                        latency_sum += metric.latency;
                        latency_count += 1;
                    }
                }
                guard.reset_http_metric_list();

                // A decision requires joint CPU+RAM presence; partial
                // windows produce no ApplicationMetric even though both
                // buffers were drained above.
                if cpu_count == 0 || ram_count == 0 {
                    None
                } else {
                    let metric = ApplicationMetric {
                        timestamp: now,
                        app_id: guard.binding.resource_id.clone(),
                        cpu: cpu_sum / cpu_count as f64,
                        ram: ram_sum / ram_count as f64,
                        requests: request_sum,
                        latency: if latency_count > 0 {
                            latency_sum / latency_count as f64
                        } else {
                            -1.0
                        },
                        quotient: guard.request.quotient,
                        instance_count: guard.instance_count,
                        description: String::new(),
                    };
                    guard.add_application_metric(metric.clone());
                    Some(metric)
                }
            };

            if let Some(metric) = published {
                if let Err(e) = publish_json(self.bus.as_ref(), topics::APPLICATION_METRICS, &metric).await {
                    scaler_core::log_error(&e.to_string(), Some("publish application metric"));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scaler_app::{ComponentWrapper, Dimension, ScalableApp, COOLDOWN_MIN, LEARNING_MULTIPLIER_MIN, SCALING_INTERVAL_MULTIPLIER_MIN};
    use scaler_bus::InProcessBus;
    use scaler_core::{Binding, ContainerMetric, HttpMetric, ThresholdPolicy};
    use scaler_store::JsonFileStore;
    use std::sync::Arc;

    fn test_app(resource_id: &str) -> Arc<ScalableApp> {
        let binding = Binding::new("b1", resource_id, "s1", "svc1", 0);
        Arc::new(
            ScalableApp::new(
                binding,
                ComponentWrapper::new(Dimension::Cpu, 70.0, 20.0, ThresholdPolicy::Max),
                ComponentWrapper::new(Dimension::Ram, 1_000_000.0, 0.0, ThresholdPolicy::Max),
                ComponentWrapper::new(Dimension::Http, 1000.0, 0.0, ThresholdPolicy::Mean),
                ComponentWrapper::new(Dimension::Latency, 500.0, 0.0, ThresholdPolicy::Mean),
                1,
                5,
                0.0,
                COOLDOWN_MIN,
                LEARNING_MULTIPLIER_MIN,
                SCALING_INTERVAL_MULTIPLIER_MIN,
                256,
            )
            .unwrap(),
        )
    }

    async fn test_manager_with_app(
        dir: &std::path::Path,
        resource_id: &str,
    ) -> (Arc<ScalableAppManager>, Arc<dyn MessageBus>) {
        let store = Arc::new(JsonFileStore::new(dir));
        let bus = InProcessBus::new(16);
        let manager = Arc::new(ScalableAppManager::new(store, bus.clone(), 256));
        manager.add(test_app(resource_id), false).await.unwrap();
        (manager, bus)
    }

    #[tokio::test]
    async fn produces_application_metric_when_cpu_and_ram_both_present() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, bus) = test_manager_with_app(dir.path(), "r1").await;
        let app = manager.get_by_resource_id("r1").await.unwrap();
        {
            let mut guard = app.acquire().await;
            guard.add_container_metric(ContainerMetric {
                timestamp: 0,
                app_id: "r1".to_string(),
                instance_index: 0,
                cpu: 40.0,
                ram: 1000.0,
                description: String::new(),
            });
        }

        let aggregator = Aggregator::new(manager.clone(), bus, 60, Duration::from_secs(30));
        aggregator.tick().await;

        let guard = app.acquire().await;
        assert_eq!(guard.get_copy_of_application_metrics_list().len(), 1);
        assert!(guard.get_copy_of_container_metrics_list().is_empty());
    }

    #[tokio::test]
    async fn produces_nothing_when_only_cpu_present() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, bus) = test_manager_with_app(dir.path(), "r1").await;
        let app = manager.get_by_resource_id("r1").await.unwrap();
        {
            let mut guard = app.acquire().await;
            guard.add_container_metric(ContainerMetric {
                timestamp: 0,
                app_id: "r1".to_string(),
                instance_index: 0,
                cpu: 40.0,
                ram: -1.0,
                description: "ram probe failed".to_string(),
            });
        }

        let aggregator = Aggregator::new(manager.clone(), bus, 60, Duration::from_secs(30));
        aggregator.tick().await;

        let guard = app.acquire().await;
        assert!(guard.get_copy_of_application_metrics_list().is_empty());
        assert!(guard.get_copy_of_container_metrics_list().is_empty());
    }

    #[tokio::test]
    async fn http_window_sums_requests_and_averages_latency() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, bus) = test_manager_with_app(dir.path(), "r1").await;
        let app = manager.get_by_resource_id("r1").await.unwrap();
        {
            let mut guard = app.acquire().await;
            guard.add_container_metric(ContainerMetric {
                timestamp: 0,
                app_id: "r1".to_string(),
                instance_index: 0,
                cpu: 40.0,
                ram: 1000.0,
                description: String::new(),
            });
            guard.add_http_metric(HttpMetric {
                timestamp: 0,
                app_id: "r1".to_string(),
                requests: 10,
                latency: 100.0,
                description: String::new(),
            });
            guard.add_http_metric(HttpMetric {
                timestamp: 0,
                app_id: "r1".to_string(),
                requests: 20,
                latency: 200.0,
                description: String::new(),
            });
        }

        let aggregator = Aggregator::new(manager.clone(), bus, 60, Duration::from_secs(30));
        aggregator.tick().await;

        let guard = app.acquire().await;
        let metrics = guard.get_copy_of_application_metrics_list();
        assert_eq!(metrics[0].requests, 30);
        assert_eq!(metrics[0].latency, 150.0);
    }
}
