use crate::app::{COOLDOWN_MIN, LEARNING_MULTIPLIER_MIN, SCALING_INTERVAL_MULTIPLIER_MIN};
use crate::wrapper::{ComponentWrapper, Dimension};
use crate::ScalableApp;
use scaler_core::{Binding, Result, ScalerError, ThresholdPolicy};
use serde::{Deserialize, Serialize};

/// Persisted configuration of a ScalableApp, sufficient to reconstruct it.
/// This is the value half of the persistent store's key/value contract
/// (key = `binding.id`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppBlueprint {
    pub binding: Binding,
    pub cpu_upper: f64,
    pub cpu_lower: f64,
    pub cpu_policy: ThresholdPolicy,
    pub ram_upper: f64,
    pub ram_lower: f64,
    pub ram_policy: ThresholdPolicy,
    pub request_upper: f64,
    pub request_lower: f64,
    pub request_policy: ThresholdPolicy,
    pub quotient_scaling_enabled: bool,
    pub latency_upper: f64,
    pub latency_lower: f64,
    pub latency_policy: ThresholdPolicy,
    pub min_instances: u32,
    pub max_instances: u32,
    pub min_quotient: f64,
    pub cooldown_time: i64,
    pub learning_time_multiplier: u32,
    pub scaling_interval_multiplier: u32,
    pub current_interval_state: u32,
    pub last_scaling_time: i64,
    pub learning_start_time: i64,
}

impl AppBlueprint {
    pub fn from_app_state(state: &crate::app::AppState) -> Self {
        Self {
            binding: state.binding.clone(),
            cpu_upper: state.cpu.upper_limit,
            cpu_lower: state.cpu.lower_limit,
            cpu_policy: state.cpu.threshold_policy,
            ram_upper: state.ram.upper_limit,
            ram_lower: state.ram.lower_limit,
            ram_policy: state.ram.threshold_policy,
            request_upper: state.request.upper_limit,
            request_lower: state.request.lower_limit,
            request_policy: state.request.threshold_policy,
            quotient_scaling_enabled: state.request.quotient_scaling_enabled,
            latency_upper: state.latency.upper_limit,
            latency_lower: state.latency.lower_limit,
            latency_policy: state.latency.threshold_policy,
            min_instances: state.min_instances,
            max_instances: state.max_instances,
            min_quotient: state.min_quotient,
            cooldown_time: state.cooldown_time,
            learning_time_multiplier: state.learning_time_multiplier,
            scaling_interval_multiplier: state.scaling_interval_multiplier,
            current_interval_state: state.current_interval_state,
            last_scaling_time: state.last_scaling_time,
            learning_start_time: state.learning_start_time,
        }
    }

    /// Validation invoked on load-from-store and on incoming bind
    /// requests. Note this rejects an invalid blueprint (the intuitive
    /// reading), not the inverted "accept everything non-null" logic an
    /// earlier draft of this check carried.
    pub fn validate(&self) -> Result<()> {
        if !self
            .binding
            .resource_id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ScalerError::SpecialCharacter(format!(
                "resourceId '{}' contains disallowed characters",
                self.binding.resource_id
            )));
        }

        if self.binding.creation_time < 0 {
            return Err(ScalerError::Time(
                "binding.creationTime must be >= 0".to_string(),
            ));
        }
        if self.last_scaling_time < self.binding.creation_time {
            return Err(ScalerError::Time(
                "lastScalingTime must be >= creationTime".to_string(),
            ));
        }
        if self.learning_start_time < self.binding.creation_time {
            return Err(ScalerError::Time(
                "learningStartTime must be >= creationTime".to_string(),
            ));
        }

        if self.max_instances < self.min_instances {
            return Err(ScalerError::Limit(
                "maxInstances must be >= minInstances".to_string(),
            ));
        }
        if self.cooldown_time < COOLDOWN_MIN {
            return Err(ScalerError::Limit(format!(
                "cooldownTime must be >= {}",
                COOLDOWN_MIN
            )));
        }
        if self.learning_time_multiplier < LEARNING_MULTIPLIER_MIN {
            return Err(ScalerError::Limit(format!(
                "learningTimeMultiplier must be >= {}",
                LEARNING_MULTIPLIER_MIN
            )));
        }
        if self.scaling_interval_multiplier < SCALING_INTERVAL_MULTIPLIER_MIN {
            return Err(ScalerError::Limit(format!(
                "scalingIntervalMultiplier must be >= {}",
                SCALING_INTERVAL_MULTIPLIER_MIN
            )));
        }
        if self.current_interval_state > self.scaling_interval_multiplier {
            return Err(ScalerError::WorkingSet(
                "currentIntervalState must be <= scalingIntervalMultiplier".to_string(),
            ));
        }

        ComponentWrapper::new(Dimension::Cpu, self.cpu_upper, self.cpu_lower, self.cpu_policy).validate()?;
        ComponentWrapper::new(Dimension::Ram, self.ram_upper, self.ram_lower, self.ram_policy).validate()?;
        ComponentWrapper::new(Dimension::Http, self.request_upper, self.request_lower, self.request_policy)
            .validate()?;
        ComponentWrapper::new(Dimension::Latency, self.latency_upper, self.latency_lower, self.latency_policy)
            .validate()?;

        Ok(())
    }

    /// Constructs a ScalableApp from this blueprint. Callers must call
    /// `validate()` first; this does not re-validate.
    pub fn build(&self, max_metric_list_size: usize) -> Result<ScalableApp> {
        let mut request = ComponentWrapper::new(
            Dimension::Http,
            self.request_upper,
            self.request_lower,
            self.request_policy,
        )
        .with_quotient_scaling(self.quotient_scaling_enabled);
        request.quotient = 0.0;

        let app = ScalableApp::new(
            self.binding.clone(),
            ComponentWrapper::new(Dimension::Cpu, self.cpu_upper, self.cpu_lower, self.cpu_policy),
            ComponentWrapper::new(Dimension::Ram, self.ram_upper, self.ram_lower, self.ram_policy),
            request,
            ComponentWrapper::new(Dimension::Latency, self.latency_upper, self.latency_lower, self.latency_policy),
            self.min_instances,
            self.max_instances,
            self.min_quotient,
            self.cooldown_time,
            self.learning_time_multiplier,
            self.scaling_interval_multiplier,
            max_metric_list_size,
        )?;
        Ok(app)
    }
}
