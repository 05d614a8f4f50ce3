use crate::checker::choose_scaling_action;
use crate::client::ScalingEngineClient;
use scaler_bus::{publish_json, topics, MessageBus};
use scaler_core::{now_unix, ScalerError, ScalingLog};
use scaler_registry::ScalableAppManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Periodic task that evaluates every app past its scaling interval,
/// issues scaling orders through the engine client on a non-NONE action,
/// and commits `lastScalingTime` only once the engine confirms the order.
pub struct Scaler {
    manager: Arc<ScalableAppManager>,
    bus: Arc<dyn MessageBus>,
    engine: Arc<ScalingEngineClient>,
    max_metric_age_secs: i64,
    static_scaling_size: u32,
    period: Duration,
}

impl Scaler {
    pub fn new(
        manager: Arc<ScalableAppManager>,
        bus: Arc<dyn MessageBus>,
        engine: Arc<ScalingEngineClient>,
        max_metric_age_secs: i64,
        static_scaling_size: u32,
        period: Duration,
    ) -> Self {
        Self {
            manager,
            bus,
            engine,
            max_metric_age_secs,
            static_scaling_size,
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

    /// Runs one evaluation pass over every registered app. Each app is
    /// only actually checked once every `scalingIntervalMultiplier`
    /// ticks; the rest of the ticks just advance its counter.
    pub async fn tick(&self) {
        let period_secs = self.period.as_secs() as i64;
        for app in self.manager.get_flat_copy_of_apps().await {
            let action = {
                let mut guard = app.acquire().await;
                guard.current_interval_state += 1;
                if guard.current_interval_state < guard.scaling_interval_multiplier {
                    continue;
                }
                guard.current_interval_state = 0;

                let now = now_unix();
                let action = choose_scaling_action(
                    &guard,
                    now,
                    self.max_metric_age_secs,
                    self.static_scaling_size,
                    period_secs,
                );
                if !action.needs_scaling {
                    continue;
                }
                action
            };

            self.apply(&app, action).await;
        }
    }

    /// Sends the scaling order and, only on a confirmed 2xx, commits
    /// `lastScalingTime`, publishes a ScalingLog, and persists the app's
    /// blueprint. On failure the order is left for the next interval to
    /// retry; `lastScalingTime` is left untouched.
    async fn apply(&self, app: &Arc<scaler_app::ScalableApp>, action: scaler_core::ScalingAction) {
        let (resource_id, context) = {
            let guard = app.acquire().await;
            (guard.binding.resource_id.clone(), guard.binding.context.clone())
        };

        match self
            .engine
            .send_scaling_request(&resource_id, &context, action.new_instances)
            .await
        {
            Ok(()) => {
                let now = now_unix();
                let log = {
                    let mut guard = app.acquire().await;
                    guard.last_scaling_time = now;
                    guard.instance_count = action.new_instances;
                    ScalingLog {
                        action: action.clone(),
                        decision_time: now,
                        cpu_value: guard.value_of_cpu(now, self.max_metric_age_secs).unwrap_or(-1.0),
                        ram_value: guard.value_of_ram(now, self.max_metric_age_secs).unwrap_or(-1.0),
                        request_value: guard.value_of_http(now, self.max_metric_age_secs).unwrap_or(-1.0),
                        latency_value: guard.value_of_latency(now, self.max_metric_age_secs).unwrap_or(-1.0),
                    }
                };

                scaler_core::log_scaling_action(
                    &resource_id,
                    &action.reason.to_string(),
                    action.old_instances,
                    action.new_instances,
                );

                if let Err(e) = publish_json(self.bus.as_ref(), topics::SCALING_LOGS, &log).await {
                    scaler_core::log_error(&e.to_string(), Some("publish scaling log"));
                }
                if let Err(e) = self.manager.update_in_store(app).await {
                    scaler_core::log_error(&e.to_string(), Some("persist scaled app"));
                }
            }
            Err(ScalerError::Upstream(msg)) => {
                scaler_core::log_upstream_failure(&resource_id, &msg);
            }
            Err(ScalerError::Rejected(msg)) => {
                scaler_core::log_scaling_request_rejected(&resource_id, &msg);
            }
            Err(e) => {
                scaler_core::log_error(&e.to_string(), Some("scaling request"));
            }
        }
    }
}
