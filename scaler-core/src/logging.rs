use crate::config::LogLevel;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

pub struct Logger {
    level: LogLevel,
    log_file: Option<PathBuf>,
}

impl Logger {
    pub fn new(level: LogLevel, log_file: Option<PathBuf>) -> Self {
        Self { level, log_file }
    }

    pub fn init(&self) -> Result<(), Box<dyn std::error::Error>> {
        let filter = match self.level {
            LogLevel::Error => EnvFilter::new("error"),
            LogLevel::Warn => EnvFilter::new("warn"),
            LogLevel::Info => EnvFilter::new("info"),
            LogLevel::Debug => EnvFilter::new("debug"),
            LogLevel::Trace => EnvFilter::new("trace"),
        };

        let registry = Registry::default().with(filter);

        if let Some(log_file) = &self.log_file {
            let file_appender =
                tracing_appender::rolling::daily(log_file.parent().unwrap(), "scaler.log");
            let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

            let file_layer = fmt::layer()
                .with_writer(non_blocking)
                .with_span_events(FmtSpan::CLOSE)
                .with_target(false)
                .with_thread_ids(true);

            let _ = registry.with(file_layer).try_init();
        } else {
            let stdout_layer = fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_target(false)
                .with_thread_ids(true);

            let _ = registry.with(stdout_layer).try_init();
        }

        Ok(())
    }
}

pub fn log_binding_created(binding_id: &str, resource_id: &str) {
    info!(
        binding_id = %binding_id,
        resource_id = %resource_id,
        "binding created"
    );
}

pub fn log_binding_loaded(binding_id: &str, resource_id: &str) {
    info!(
        binding_id = %binding_id,
        resource_id = %resource_id,
        "binding loaded from store"
    );
}

pub fn log_binding_removed(binding_id: &str, resource_id: &str) {
    info!(
        binding_id = %binding_id,
        resource_id = %resource_id,
        "binding removed"
    );
}

pub fn log_scaling_action(app_id: &str, reason: &str, old_instances: u32, new_instances: u32) {
    info!(
        app_id = %app_id,
        reason = %reason,
        old_instances,
        new_instances,
        "scaling action applied"
    );
}

pub fn log_blueprint_rejected(binding_id: &str, reason: &str) {
    warn!(
        binding_id = %binding_id,
        reason = %reason,
        "blueprint failed validation on load, skipping"
    );
}

pub fn log_upstream_failure(app_id: &str, error: &str) {
    warn!(
        app_id = %app_id,
        error = %error,
        "scaling engine request failed, will retry next interval"
    );
}

pub fn log_scaling_request_rejected(app_id: &str, error: &str) {
    warn!(
        app_id = %app_id,
        error = %error,
        "scaling engine rejected request, not retrying"
    );
}

pub fn log_error(error: &str, context: Option<&str>) {
    error!(error = %error, context = ?context, "error occurred");
}

pub fn log_debug(message: &str, context: Option<&str>) {
    debug!(message = %message, context = ?context, "debug");
}
