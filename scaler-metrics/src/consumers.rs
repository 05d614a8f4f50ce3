use scaler_bus::{topics, MessageBus};
use scaler_core::{ContainerMetric, HttpMetric, InstanceMetric};
use scaler_registry::ScalableAppManager;
use std::sync::Arc;
use tokio::sync::watch;

/// Long-lived subscriber routing one bus topic onto the correct
/// ScalableApp's buffers. Runs on its own task; never blocks the
/// aggregator or scaler loop.
pub struct MetricConsumer {
    bus: Arc<dyn MessageBus>,
    manager: Arc<ScalableAppManager>,
}

impl MetricConsumer {
    pub fn new(bus: Arc<dyn MessageBus>, manager: Arc<ScalableAppManager>) -> Self {
        Self { bus, manager }
    }

    /// Routes container-level samples onto the matching app's buffer.
    /// Exits when `shutdown` reports a change.
    pub async fn run_container_metrics(&self, mut shutdown: watch::Receiver<bool>) {
        let mut subscription = match self.bus.subscribe(topics::CONTAINER_METRICS).await {
            Ok(s) => s,
            Err(e) => {
                scaler_core::log_error(&e.to_string(), Some("container-metrics subscribe"));
                return;
            }
        };

        loop {
            tokio::select! {
                _ = shutdown.changed() => return,
                message = subscription.recv() => {
                    match message {
                        Ok(payload) => self.handle_container_metric(&payload).await,
                        Err(e) => {
                            scaler_core::log_error(&e.to_string(), Some("container-metrics recv"));
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Routes HTTP-level samples onto the matching app's buffer.
    pub async fn run_http_metrics(&self, mut shutdown: watch::Receiver<bool>) {
        let mut subscription = match self.bus.subscribe(topics::HTTP_METRICS).await {
            Ok(s) => s,
            Err(e) => {
                scaler_core::log_error(&e.to_string(), Some("http-metrics subscribe"));
                return;
            }
        };

        loop {
            tokio::select! {
                _ = shutdown.changed() => return,
                message = subscription.recv() => {
                    match message {
                        Ok(payload) => self.handle_http_metric(&payload).await,
                        Err(e) => {
                            scaler_core::log_error(&e.to_string(), Some("http-metrics recv"));
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Routes platform instance-count notifications onto the matching
    /// app's scheduling state.
    pub async fn run_instance_metrics(&self, mut shutdown: watch::Receiver<bool>) {
        let mut subscription = match self.bus.subscribe(topics::INSTANCE_METRICS).await {
            Ok(s) => s,
            Err(e) => {
                scaler_core::log_error(&e.to_string(), Some("instance-metrics subscribe"));
                return;
            }
        };

        loop {
            tokio::select! {
                _ = shutdown.changed() => return,
                message = subscription.recv() => {
                    match message {
                        Ok(payload) => self.handle_instance_metric(&payload).await,
                        Err(e) => {
                            scaler_core::log_error(&e.to_string(), Some("instance-metrics recv"));
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn handle_container_metric(&self, payload: &[u8]) {
        let metric: ContainerMetric = match serde_json::from_slice(payload) {
            Ok(m) => m,
            Err(e) => {
                scaler_core::log_error(&e.to_string(), Some("decode container metric"));
                return;
            }
        };
        if let Some(app) = self.manager.get_by_resource_id(&metric.app_id).await {
            app.acquire().await.add_container_metric(metric);
        }
    }

    async fn handle_http_metric(&self, payload: &[u8]) {
        let metric: HttpMetric = match serde_json::from_slice(payload) {
            Ok(m) => m,
            Err(e) => {
                scaler_core::log_error(&e.to_string(), Some("decode http metric"));
                return;
            }
        };
        if let Some(app) = self.manager.get_by_resource_id(&metric.app_id).await {
            app.acquire().await.add_http_metric(metric);
        }
    }

    async fn handle_instance_metric(&self, payload: &[u8]) {
        let metric: InstanceMetric = match serde_json::from_slice(payload) {
            Ok(m) => m,
            Err(e) => {
                scaler_core::log_error(&e.to_string(), Some("decode instance metric"));
                return;
            }
        };
        if let Some(app) = self.manager.get_by_resource_id(&metric.app_id).await {
            app.acquire().await.instance_count = metric.instance_count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scaler_app::{ComponentWrapper, Dimension, ScalableApp, COOLDOWN_MIN, LEARNING_MULTIPLIER_MIN, SCALING_INTERVAL_MULTIPLIER_MIN};
    use scaler_bus::{publish_json, InProcessBus};
    use scaler_core::{Binding, ThresholdPolicy};
    use scaler_store::JsonFileStore;
    use std::time::Duration;

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

    #[tokio::test]
    async fn container_metric_routes_to_matching_app_by_resource_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path()));
        let bus = InProcessBus::new(16);
        let manager = Arc::new(ScalableAppManager::new(store, bus.clone(), 256));
        manager.add(test_app("r1"), false).await.unwrap();

        let consumer = MetricConsumer::new(bus.clone(), manager.clone());
        let (_tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { consumer.run_container_metrics(rx).await });

        publish_json(
            bus.as_ref(),
            topics::CONTAINER_METRICS,
            &ContainerMetric {
                timestamp: 1,
                app_id: "r1".to_string(),
                instance_index: 0,
                cpu: 55.0,
                ram: 10.0,
                description: String::new(),
            },
        )
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let app = manager.get_by_resource_id("r1").await.unwrap();
        assert_eq!(
            app.acquire().await.get_copy_of_container_metrics_list().len(),
            1
        );
        handle.abort();
    }

    #[tokio::test]
    async fn metric_for_unknown_resource_id_is_dropped_silently() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path()));
        let bus = InProcessBus::new(16);
        let manager = Arc::new(ScalableAppManager::new(store, bus.clone(), 256));

        let consumer = MetricConsumer::new(bus.clone(), manager.clone());
        let (_tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { consumer.run_container_metrics(rx).await });

        publish_json(
            bus.as_ref(),
            topics::CONTAINER_METRICS,
            &ContainerMetric {
                timestamp: 1,
                app_id: "unknown".to_string(),
                instance_index: 0,
                cpu: 55.0,
                ram: 10.0,
                description: String::new(),
            },
        )
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
    }
}
