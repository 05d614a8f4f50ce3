use scaler_app::AppBlueprint;
use scaler_core::{Binding, ThresholdPolicy};

/// A blueprint with generous limits, useful as a baseline for tests that
/// only care about one or two dimensions.
pub fn blueprint(id: &str, resource_id: &str) -> AppBlueprint {
    AppBlueprint {
        binding: Binding::new(id, resource_id, "scaler", "service-a", 0),
        cpu_upper: 80.0,
        cpu_lower: 20.0,
        cpu_policy: ThresholdPolicy::Mean,
        ram_upper: 1_000_000.0,
        ram_lower: 100.0,
        ram_policy: ThresholdPolicy::Mean,
        request_upper: 1000.0,
        request_lower: 10.0,
        request_policy: ThresholdPolicy::Mean,
        quotient_scaling_enabled: false,
        latency_upper: 500.0,
        latency_lower: 1.0,
        latency_policy: ThresholdPolicy::Mean,
        min_instances: 1,
        max_instances: 10,
        min_quotient: 0.0,
        cooldown_time: 30,
        learning_time_multiplier: 1,
        scaling_interval_multiplier: 1,
        current_interval_state: 0,
        last_scaling_time: 0,
        learning_start_time: 0,
    }
}
