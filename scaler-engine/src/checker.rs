use scaler_app::AppState;
use scaler_core::{ScalingAction, ScalingReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Upscale,
    Downscale,
    NoChange,
}

/// Pure evaluation of one dimension: scalar derived via the wrapper's
/// policy, compared against its limits. `None` means no data in the
/// window, which never drives a decision.
fn evaluate(value: Option<f64>, exceeds_upper: impl Fn(f64) -> bool, below_lower: impl Fn(f64) -> bool) -> Option<Verdict> {
    value.map(|v| {
        if exceeds_upper(v) {
            Verdict::Upscale
        } else if below_lower(v) {
            Verdict::Downscale
        } else {
            Verdict::NoChange
        }
    })
}

/// Evaluates a ScalableApp and returns a ScalingAction. Invoked with the
/// app's mutex held; performs no I/O and has no side effects on `state`.
pub fn choose_scaling_action(
    state: &AppState,
    now: i64,
    max_metric_age_secs: i64,
    static_scaling_size: u32,
    scaler_period_secs: i64,
) -> ScalingAction {
    let old_instances = state.instance_count;

    if now - state.last_scaling_time < state.cooldown_time {
        return ScalingAction::none(state.binding.resource_id.clone(), old_instances);
    }
    let learning_window = state.learning_time_multiplier as i64 * scaler_period_secs;
    if now - state.learning_start_time < learning_window {
        return ScalingAction::none(state.binding.resource_id.clone(), old_instances);
    }

    let cpu_verdict = evaluate(
        state.value_of_cpu(now, max_metric_age_secs),
        |v| state.cpu.exceeds_upper(v),
        |v| state.cpu.below_lower(v),
    );
    let ram_verdict = evaluate(
        state.value_of_ram(now, max_metric_age_secs),
        |v| state.ram.exceeds_upper(v),
        |v| state.ram.below_lower(v),
    );
    let http_verdict = evaluate(
        state.value_of_http(now, max_metric_age_secs),
        |v| state.request.exceeds_upper(v),
        |v| state.request.below_lower(v),
    );
    let latency_verdict = evaluate(
        state.value_of_latency(now, max_metric_age_secs),
        |v| state.latency.exceeds_upper(v),
        |v| state.latency.below_lower(v),
    );

    // CPU > RAM > HTTP > LATENCY when more than one dimension fires.
    let dims = [
        (ScalingReason::Cpu, cpu_verdict),
        (ScalingReason::Ram, ram_verdict),
        (ScalingReason::Http, http_verdict),
        (ScalingReason::Latency, latency_verdict),
    ];

    let upscale = dims.iter().find(|(_, v)| *v == Some(Verdict::Upscale));
    let (reason, raw_new_instances) = if let Some((reason, _)) = upscale {
        (*reason, old_instances.saturating_add(static_scaling_size))
    } else {
        let observed: Vec<_> = dims.iter().filter(|(_, v)| v.is_some()).collect();
        let all_downscale = !observed.is_empty()
            && observed.iter().all(|(_, v)| *v == Some(Verdict::Downscale));
        if all_downscale {
            let reason = dims
                .iter()
                .find(|(_, v)| *v == Some(Verdict::Downscale))
                .map(|(r, _)| *r)
                .unwrap();
            (reason, old_instances.saturating_sub(static_scaling_size))
        } else {
            (ScalingReason::None, old_instances)
        }
    };

    // Quotient gate: too little traffic to trust the other signals, so
    // force a downscale to the floor regardless of what the dimensions
    // above decided.
    let (reason, raw_new_instances) = if state.request.quotient_scaling_enabled
        && state.request.quotient < state.min_quotient
    {
        (ScalingReason::Quotient, state.min_instances)
    } else {
        (reason, raw_new_instances)
    };

    let new_instances = raw_new_instances.clamp(state.min_instances, state.max_instances);
    let needs_scaling = new_instances != old_instances;

    ScalingAction {
        app_id: state.binding.resource_id.clone(),
        old_instances,
        new_instances,
        reason: if needs_scaling { reason } else { ScalingReason::None },
        needs_scaling,
        description: if needs_scaling {
            format!("{:?} -> {} instances ({})", reason, new_instances, state.binding.resource_id)
        } else {
            String::new()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scaler_app::{ComponentWrapper, Dimension, ScalableApp, COOLDOWN_MIN, LEARNING_MULTIPLIER_MIN};
    use scaler_core::{Binding, ContainerMetric, ThresholdPolicy};

    async fn app_with_cpu_samples(samples: &[f64], old_instances: u32, upper: f64, lower: f64) -> ScalableApp {
        let binding = Binding::new("b1", "r1", "s1", "svc1", 0);
        let app = ScalableApp::new(
            binding,
            ComponentWrapper::new(Dimension::Cpu, upper, lower, ThresholdPolicy::Max),
            ComponentWrapper::new(Dimension::Ram, 1_000_000.0, 0.0, ThresholdPolicy::Max),
            ComponentWrapper::new(Dimension::Http, 1_000_000.0, 0.0, ThresholdPolicy::Mean),
            ComponentWrapper::new(Dimension::Latency, 1_000_000.0, 0.0, ThresholdPolicy::Mean),
            1,
            5,
            0.0,
            COOLDOWN_MIN,
            LEARNING_MULTIPLIER_MIN,
            1,
            256,
        )
        .unwrap();
        {
            let mut guard = app.acquire().await;
            guard.instance_count = old_instances;
            guard.last_scaling_time = -1_000_000;
            guard.learning_start_time = -1_000_000;
            for (i, sample) in samples.iter().enumerate() {
                guard.add_container_metric(ContainerMetric {
                    timestamp: 0,
                    app_id: "r1".to_string(),
                    instance_index: i as u32,
                    cpu: *sample,
                    // -1 is the "missing" sentinel: these scenarios exercise
                    // CPU in isolation, so RAM must not be an observed
                    // dimension in the composition below.
                    ram: -1.0,
                    description: String::new(),
                });
            }
        }
        app
    }

    #[tokio::test]
    async fn scenario_1_within_band_is_none() {
        let app = app_with_cpu_samples(&[40.0, 50.0, 60.0], 3, 70.0, 20.0).await;
        let guard = app.acquire().await;
        let action = choose_scaling_action(&guard, 0, 60, 1, 30);
        assert_eq!(action.reason, ScalingReason::None);
        assert_eq!(action.new_instances, 3);
    }

    #[tokio::test]
    async fn scenario_2_upscale() {
        let app = app_with_cpu_samples(&[80.0, 82.0, 90.0], 3, 70.0, 20.0).await;
        let guard = app.acquire().await;
        let action = choose_scaling_action(&guard, 0, 60, 1, 30);
        assert_eq!(action.reason, ScalingReason::Cpu);
        assert_eq!(action.new_instances, 4);
        assert!(action.needs_scaling);
    }

    #[tokio::test]
    async fn scenario_3_downscale() {
        let app = app_with_cpu_samples(&[5.0, 6.0, 7.0], 3, 70.0, 10.0).await;
        let guard = app.acquire().await;
        let action = choose_scaling_action(&guard, 0, 60, 1, 30);
        assert_eq!(action.reason, ScalingReason::Cpu);
        assert_eq!(action.new_instances, 2);
    }

    #[tokio::test]
    async fn scenario_4_upscale_clamped_to_max_degrades_to_none() {
        let app = app_with_cpu_samples(&[80.0, 82.0, 90.0], 5, 70.0, 20.0).await;
        let guard = app.acquire().await;
        let action = choose_scaling_action(&guard, 0, 60, 1, 30);
        assert_eq!(action.reason, ScalingReason::None);
        assert_eq!(action.new_instances, 5);
        assert!(!action.needs_scaling);
    }

    #[tokio::test]
    async fn scenario_5_downscale_clamped_to_min_degrades_to_none() {
        let app = app_with_cpu_samples(&[5.0, 6.0, 7.0], 1, 70.0, 10.0).await;
        let guard = app.acquire().await;
        let action = choose_scaling_action(&guard, 0, 60, 1, 30);
        assert_eq!(action.reason, ScalingReason::None);
        assert_eq!(action.new_instances, 1);
    }

    #[tokio::test]
    async fn scenario_6_within_cooldown_is_none() {
        let app = app_with_cpu_samples(&[80.0, 82.0, 90.0], 3, 70.0, 20.0).await;
        {
            let mut guard = app.acquire().await;
            guard.last_scaling_time = 59;
        }
        let guard = app.acquire().await;
        let action = choose_scaling_action(&guard, 60, 60, 1, 30);
        assert_eq!(action.reason, ScalingReason::None);
    }

    #[tokio::test]
    async fn quotient_gate_forces_downscale_to_floor() {
        let binding = Binding::new("b1", "r1", "s1", "svc1", 0);
        let app = ScalableApp::new(
            binding,
            ComponentWrapper::new(Dimension::Cpu, 100.0, 0.0, ThresholdPolicy::Max),
            ComponentWrapper::new(Dimension::Ram, 1_000_000.0, 0.0, ThresholdPolicy::Max),
            ComponentWrapper::new(Dimension::Http, 1_000_000.0, 0.0, ThresholdPolicy::Mean)
                .with_quotient_scaling(true),
            ComponentWrapper::new(Dimension::Latency, 1_000_000.0, 0.0, ThresholdPolicy::Mean),
            1,
            5,
            0.5,
            COOLDOWN_MIN,
            LEARNING_MULTIPLIER_MIN,
            1,
            256,
        )
        .unwrap();
        {
            let mut guard = app.acquire().await;
            guard.instance_count = 4;
            guard.last_scaling_time = -1_000_000;
            guard.learning_start_time = -1_000_000;
            guard.request.quotient = 0.1;
        }
        let guard = app.acquire().await;
        let action = choose_scaling_action(&guard, 0, 60, 1, 30);
        assert_eq!(action.reason, ScalingReason::Quotient);
        assert_eq!(action.new_instances, 1);
    }
}
