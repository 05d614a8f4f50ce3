use clap::{Parser, Subcommand};
use scaler_bus::InProcessBus;
use scaler_core::{Logger, ScalerConfig};
use scaler_engine::{Scaler, ScalingEngineClient};
use scaler_metrics::{Aggregator, MetricConsumer};
use scaler_registry::ScalableAppManager;
use scaler_store::JsonFileStore;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "scaler")]
#[command(about = "Autoscaling controller for containerized applications")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the controller: metric consumers, aggregator, scaler loop and management API.
    Serve {
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Configuration file management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Validate a configuration file
    Validate { path: String },
    /// Write the default configuration to a file
    Init { path: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => serve(config).await,
        Commands::Config { action } => match action {
            ConfigCommands::Validate { path } => {
                let config = ScalerConfig::load_from_file(&path)?;
                config.validate()?;
                println!("'{}' is valid", path);
                Ok(())
            }
            ConfigCommands::Init { path } => {
                ScalerConfig::default().save_to_file(&path)?;
                println!("wrote default configuration to '{}'", path);
                Ok(())
            }
        },
    }
}

async fn serve(config_path: Option<String>) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => ScalerConfig::load_from_file(&path)?,
        None => ScalerConfig::default(),
    };
    config.validate()?;

    Logger::new(config.runtime.log_level.clone(), None)
        .init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let store = Arc::new(JsonFileStore::new(&config.store.root_dir));
    let bus = InProcessBus::new(config.bus.capacity);
    let manager = Arc::new(ScalableAppManager::new(
        store,
        bus.clone(),
        config.runtime.max_metric_list_size,
    ));

    manager.load_from_store().await?;
    tracing::info!(
        apps = manager.get_flat_copy_of_apps().await.len(),
        "loaded bindings from store"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let consumer = Arc::new(MetricConsumer::new(bus.clone(), manager.clone()));
    let container_consumer = {
        let consumer = consumer.clone();
        let rx = shutdown_rx.clone();
        tokio::spawn(async move { consumer.run_container_metrics(rx).await })
    };
    let http_consumer = {
        let consumer = consumer.clone();
        let rx = shutdown_rx.clone();
        tokio::spawn(async move { consumer.run_http_metrics(rx).await })
    };
    let instance_consumer = {
        let consumer = consumer.clone();
        let rx = shutdown_rx.clone();
        tokio::spawn(async move { consumer.run_instance_metrics(rx).await })
    };

    let aggregator = Aggregator::new(
        manager.clone(),
        bus.clone(),
        config.runtime.max_metric_age_secs,
        Duration::from_secs(config.runtime.aggregator_period_secs),
    );
    let aggregator_rx = shutdown_rx.clone();
    let aggregator_handle = tokio::spawn(async move { aggregator.run(aggregator_rx).await });

    let engine = Arc::new(ScalingEngineClient::new(config.engine.clone())?);
    let scaler = Scaler::new(
        manager.clone(),
        bus.clone(),
        engine.clone(),
        config.runtime.max_metric_age_secs,
        config.runtime.static_scaling_size,
        Duration::from_secs(config.runtime.scaler_period_secs),
    );
    let scaler_rx = shutdown_rx.clone();
    let scaler_handle = tokio::spawn(async move { scaler.run(scaler_rx).await });

    let rest_server = Arc::new(scaler_api::RestServer::new(
        manager.clone(),
        Some(engine),
        config.api.secret.clone(),
        config.runtime.update_app_name_at_binding,
        config.runtime.max_metric_list_size,
    ));
    let api_host = config.api.host.clone();
    let api_port = config.api.port;
    let api_handle = tokio::spawn(async move {
        if let Err(e) = rest_server.start(&api_host, api_port).await {
            tracing::error!(error = %e, "management API exited with an error");
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, draining tasks");
    shutdown_tx.send(true).ok();

    let _ = tokio::join!(
        container_consumer,
        http_consumer,
        instance_consumer,
        aggregator_handle,
        scaler_handle,
    );
    api_handle.abort();

    Ok(())
}
