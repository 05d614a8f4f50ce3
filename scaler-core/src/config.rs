use crate::error::{Result, ScalerError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScalerConfig {
    pub runtime: RuntimeConfig,
    pub store: StoreConfig,
    pub bus: BusConfig,
    pub engine: EngineConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub log_level: LogLevel,
    pub max_metric_list_size: usize,
    pub max_metric_age_secs: i64,
    pub static_scaling_size: u32,
    pub aggregator_period_secs: u64,
    pub scaler_period_secs: u64,
    pub update_app_name_at_binding: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub root_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub host: String,
    pub scaling_endpoint: String,
    pub name_endpoint: String,
    pub secret: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            max_metric_list_size: 256,
            max_metric_age_secs: 60,
            static_scaling_size: 1,
            aggregator_period_secs: 30,
            scaler_period_secs: 30,
            update_app_name_at_binding: false,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("/var/lib/scaler/bindings"),
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:9000".to_string(),
            scaling_endpoint: "scale".to_string(),
            name_endpoint: "name".to_string(),
            secret: String::new(),
            request_timeout_secs: 10,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
            secret: String::new(),
        }
    }
}

impl ScalerConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ScalerError::Io)?;

        let mut config: Self = if path.ends_with(".yaml") || path.ends_with(".yml") {
            serde_yaml::from_str(&content)
                .map_err(|e| ScalerError::Config(format!("failed to parse YAML: {}", e)))?
        } else if path.ends_with(".toml") {
            toml::from_str(&content)
                .map_err(|e| ScalerError::Config(format!("failed to parse TOML: {}", e)))?
        } else if path.ends_with(".json") {
            serde_json::from_str(&content).map_err(ScalerError::Serialization)?
        } else {
            return Err(ScalerError::Config(format!(
                "unsupported config file format: {}",
                path
            )));
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let content = if path.ends_with(".yaml") || path.ends_with(".yml") {
            serde_yaml::to_string(self)
                .map_err(|e| ScalerError::Config(format!("failed to serialize YAML: {}", e)))?
        } else if path.ends_with(".toml") {
            toml::to_string(self)
                .map_err(|e| ScalerError::Config(format!("failed to serialize TOML: {}", e)))?
        } else if path.ends_with(".json") {
            serde_json::to_string_pretty(self).map_err(ScalerError::Serialization)?
        } else {
            return Err(ScalerError::Config(format!(
                "unsupported config file format: {}",
                path
            )));
        };

        std::fs::write(path, content).map_err(ScalerError::Io)?;
        Ok(())
    }

    /// Overlays a handful of flat environment variables on top of the
    /// structured config, for container-native deployment.
    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("SCALER_BROKER_SECRET") {
            self.engine.secret = secret.clone();
            self.api.secret = secret;
        }
        if let Ok(size) = std::env::var("SCALER_MAX_METRIC_LIST_SIZE") {
            if let Ok(size) = size.parse() {
                self.runtime.max_metric_list_size = size;
            }
        }
        if let Ok(age) = std::env::var("SCALER_MAX_METRIC_AGE") {
            if let Ok(age) = age.parse() {
                self.runtime.max_metric_age_secs = age;
            }
        }
        if let Ok(step) = std::env::var("SCALER_STATIC_SCALING_SIZE") {
            if let Ok(step) = step.parse() {
                self.runtime.static_scaling_size = step;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.runtime.max_metric_list_size == 0 {
            return Err(ScalerError::Config(
                "runtime.max_metric_list_size must be greater than 0".to_string(),
            ));
        }

        if self.runtime.static_scaling_size == 0 {
            return Err(ScalerError::Config(
                "runtime.static_scaling_size must be greater than 0".to_string(),
            ));
        }

        if self.api.port == 0 {
            return Err(ScalerError::Config(
                "api.port must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = ScalerConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_metric_list_size_is_invalid() {
        let mut config = ScalerConfig::default();
        config.runtime.max_metric_list_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn roundtrip_through_json() {
        let config = ScalerConfig::default();
        let dir =
            std::env::temp_dir().join(format!("scaler-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json").to_string_lossy().to_string();
        config.save_to_file(&path).unwrap();
        let loaded = ScalerConfig::load_from_file(&path).unwrap();
        assert_eq!(
            loaded.runtime.max_metric_list_size,
            config.runtime.max_metric_list_size
        );
        std::fs::remove_dir_all(&dir).ok();
    }
}
