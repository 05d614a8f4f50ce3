use scaler_core::{ScalerError, ThresholdPolicy};
use serde::{Deserialize, Serialize};

/// The scalable dimension a ComponentWrapper governs. Kept as a tagged
/// variant rather than four separate types so ScalableApp can hold the
/// wrappers in a uniform `[ComponentWrapper; 4]`-shaped set of fields
/// while still sharing the same capability surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Dimension {
    Cpu,
    Ram,
    Http,
    Latency,
}

/// Limits and reduction policy for one scalable dimension of one
/// application. CPU is a percentage (0-100), RAM is bytes (<= i32::MAX),
/// latency is millis, requests is a count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentWrapper {
    pub dimension: Dimension,
    pub upper_limit: f64,
    pub lower_limit: f64,
    pub threshold_policy: ThresholdPolicy,
    /// Request wrapper only: external traffic-shape signal, ignored by
    /// CPU/RAM/Latency wrappers.
    pub quotient: f64,
    pub quotient_scaling_enabled: bool,
}

impl ComponentWrapper {
    pub fn new(dimension: Dimension, upper_limit: f64, lower_limit: f64, threshold_policy: ThresholdPolicy) -> Self {
        Self {
            dimension,
            upper_limit,
            lower_limit,
            threshold_policy,
            quotient: 0.0,
            quotient_scaling_enabled: false,
        }
    }

    pub fn with_quotient_scaling(mut self, enabled: bool) -> Self {
        self.quotient_scaling_enabled = enabled;
        self
    }

    /// Reduces `samples` to a single scalar per `threshold_policy`. Empty
    /// input has no sensible scalar; callers must not invoke this on an
    /// empty window.
    pub fn reduce(&self, samples: &[f64]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        Some(match self.threshold_policy {
            ThresholdPolicy::Max => samples.iter().cloned().fold(f64::MIN, f64::max),
            ThresholdPolicy::Min => samples.iter().cloned().fold(f64::MAX, f64::min),
            ThresholdPolicy::Mean => samples.iter().sum::<f64>() / samples.len() as f64,
        })
    }

    pub fn exceeds_upper(&self, value: f64) -> bool {
        value > self.upper_limit
    }

    pub fn below_lower(&self, value: f64) -> bool {
        value < self.lower_limit
    }

    pub fn reset_quotient(&mut self) {
        self.quotient = 0.0;
    }

    /// `upperLimit > lowerLimit`, `lowerLimit >= 0`, dimension-specific
    /// ceilings (RAM fits in an i32 byte count).
    pub fn validate(&self) -> Result<(), ScalerError> {
        if self.lower_limit < 0.0 {
            return Err(ScalerError::Limit(format!(
                "{:?} lowerLimit must be >= 0, got {}",
                self.dimension, self.lower_limit
            )));
        }
        if self.upper_limit <= self.lower_limit {
            return Err(ScalerError::Limit(format!(
                "{:?} upperLimit ({}) must exceed lowerLimit ({})",
                self.dimension, self.upper_limit, self.lower_limit
            )));
        }
        if self.dimension == Dimension::Ram && self.upper_limit > i32::MAX as f64 {
            return Err(ScalerError::Limit(
                "ram upperLimit exceeds i32::MAX bytes".to_string(),
            ));
        }
        if self.dimension == Dimension::Cpu && self.upper_limit > 100.0 {
            return Err(ScalerError::Limit(
                "cpu upperLimit exceeds 100 percent".to_string(),
            ));
        }
        Ok(())
    }
}
