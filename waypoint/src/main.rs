mod config;

use clap::{Args, Parser, Subcommand};
use config::{Config, ConfigError, MetricsConfig};
use dispatcher::errors::DispatcherError;
use dispatcher::metrics_defs::ALL_METRICS;
use metrics_exporter_statsd::StatsdBuilder;
use shared::metrics_defs::MetricType;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "waypoint", about = "Rule based request dispatcher")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve requests with the rules from the config file
    Dispatcher(ConfigArgs),
    /// Validate the config file and build its routing rules
    Check(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long, short = 'c')]
    config_file_path: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dispatcher(#[from] DispatcherError),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("could not set up metrics: {0}")]
    Metrics(String),
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "waypoint=info,dispatcher=info,routing=info,shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        CliCommand::Dispatcher(args) => run_dispatcher(&args.config_file_path),
        CliCommand::Check(args) => check(&args.config_file_path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Exiting");
            ExitCode::FAILURE
        }
    }
}

fn run_dispatcher(path: &Path) -> Result<(), CliError> {
    let config = Config::from_file(path)?;
    if let Some(metrics) = &config.common.metrics {
        init_metrics(metrics)?;
    }
    let dispatcher_config = config.dispatcher()?;

    tracing::info!(
        config = %path.display(),
        listener = %format!("{}:{}", dispatcher_config.listener.host, dispatcher_config.listener.port),
        "Starting dispatcher"
    );

    let reload_path = path.to_path_buf();
    let reload = move || {
        Config::from_file(&reload_path)
            .and_then(Config::dispatcher)
            .map_err(|e| DispatcherError::ConfigLoad(e.to_string()))
    };

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(dispatcher::run(dispatcher_config, reload))?;
    Ok(())
}

fn check(path: &Path) -> Result<(), CliError> {
    let dispatcher_config = Config::from_file(path)?.dispatcher()?;
    dispatcher::build_router(&dispatcher_config).map_err(DispatcherError::from)?;
    tracing::info!(
        config = %path.display(),
        rules = dispatcher_config.rules.len(),
        domains = dispatcher_config.domains.len(),
        "Config is valid"
    );
    Ok(())
}

fn init_metrics(config: &MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some(config.prefix.as_str()))
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder)
        .map_err(|_| CliError::Metrics("a metrics recorder is already installed".to_string()))?;

    for def in ALL_METRICS {
        match def.metric_type {
            MetricType::Counter => metrics::describe_counter!(def.name, def.description),
            MetricType::Gauge => metrics::describe_gauge!(def.name, def.description),
            MetricType::Histogram => metrics::describe_histogram!(def.name, def.description),
        }
    }

    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "Statsd metrics enabled"
    );
    Ok(())
}
