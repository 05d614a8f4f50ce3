use scaler_core::{ApiConfig, BusConfig, EngineConfig, LogLevel, RuntimeConfig, ScalerConfig, StoreConfig};

#[test]
fn test_default_config() {
    let config = ScalerConfig::default();

    assert_eq!(config.runtime.max_metric_list_size, 256);
    assert_eq!(config.runtime.static_scaling_size, 1);
    assert_eq!(config.runtime.log_level, LogLevel::Info);

    assert!(config
        .store
        .root_dir
        .to_string_lossy()
        .contains("scaler"));

    assert_eq!(config.bus.capacity, 1024);

    assert_eq!(config.api.port, 8090);
    assert_eq!(config.api.host, "0.0.0.0");
}

#[test]
fn test_config_validation() {
    let mut config = ScalerConfig::default();

    assert!(config.validate().is_ok());

    config.runtime.max_metric_list_size = 0;
    assert!(config.validate().is_err());

    config.runtime.max_metric_list_size = 256;
    config.runtime.static_scaling_size = 0;
    assert!(config.validate().is_err());

    config.runtime.static_scaling_size = 1;
    config.api.port = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_serialization() {
    let config = ScalerConfig::default();

    let json = serde_json::to_string(&config).unwrap();
    let parsed_config: ScalerConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(
        config.runtime.max_metric_list_size,
        parsed_config.runtime.max_metric_list_size
    );

    let yaml = serde_yaml::to_string(&config).unwrap();
    let parsed_config: ScalerConfig = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(
        config.runtime.max_metric_list_size,
        parsed_config.runtime.max_metric_list_size
    );

    let toml = toml::to_string(&config).unwrap();
    let parsed_config: ScalerConfig = toml::from_str(&toml).unwrap();
    assert_eq!(
        config.runtime.max_metric_list_size,
        parsed_config.runtime.max_metric_list_size
    );
}

#[test]
fn test_runtime_config() {
    let runtime_config = RuntimeConfig::default();

    assert_eq!(runtime_config.max_metric_list_size, 256);
    assert_eq!(runtime_config.max_metric_age_secs, 60);
    assert_eq!(runtime_config.log_level, LogLevel::Info);
    assert!(!runtime_config.update_app_name_at_binding);
}

#[test]
fn test_store_config() {
    let store_config = StoreConfig::default();

    assert!(store_config.root_dir.to_string_lossy().contains("scaler"));
}

#[test]
fn test_bus_config() {
    let bus_config = BusConfig::default();

    assert_eq!(bus_config.capacity, 1024);
}

#[test]
fn test_engine_config() {
    let engine_config = EngineConfig::default();

    assert_eq!(engine_config.host, "http://localhost:9000");
    assert_eq!(engine_config.scaling_endpoint, "scale");
    assert_eq!(engine_config.request_timeout_secs, 10);
}

#[test]
fn test_api_config() {
    let api_config = ApiConfig::default();

    assert_eq!(api_config.port, 8090);
    assert_eq!(api_config.host, "0.0.0.0");
    assert!(api_config.secret.is_empty());
}

#[test]
fn test_env_override_applies_secret_to_both_api_and_engine() {
    std::env::set_var("SCALER_BROKER_SECRET", "test-secret-xyz");
    let dir = std::env::temp_dir().join(format!("scaler-config-env-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.json").to_string_lossy().to_string();
    ScalerConfig::default().save_to_file(&path).unwrap();

    let loaded = ScalerConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded.api.secret, "test-secret-xyz");
    assert_eq!(loaded.engine.secret, "test-secret-xyz");

    std::env::remove_var("SCALER_BROKER_SECRET");
    std::fs::remove_dir_all(&dir).ok();
}
