//! Scenario Runner: executes a scenario on the remote compute service.
//!
//! Uploads the scenario's input layers, submits and monitors the remote
//! job, downloads its outputs, and prints the assembled result as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use scenario_cache::file::JsonFileStore;
use scenario_cache::pointer::RunningScenarioStore;
use scenario_client::{HttpBlobTransport, HttpRemoteApi, HttpTransport, StaticCredentials};
use scenario_core::config::AppConfig;
use scenario_core::error::AppError;
use scenario_entity::scenario::Scenario;
use scenario_job::{Job, JobServices, TracingTaskHost};

#[derive(Debug, Parser)]
#[command(name = "scenario-runner", version, about = "Run a scenario on the remote compute service")]
struct Args {
    /// Scenario description (JSON).
    scenario: PathBuf,

    /// Directory the outputs are downloaded into.
    output_dir: PathBuf,

    /// Attach to the job recorded as running for this scenario instead of
    /// submitting a new one.
    #[arg(long)]
    resume: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(args, config).await {
        tracing::error!("Scenario run failed: {}", e);
        std::process::exit(if e.is_cancelled() { 130 } else { 1 });
    }
}

/// Load configuration from `config/` and the environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("SCENARIO_ENV").unwrap_or_else(|_| "default".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

async fn run(args: Args, config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting scenario-runner v{}", env!("CARGO_PKG_VERSION"));

    let raw = tokio::fs::read_to_string(&args.scenario).await?;
    let scenario: Scenario = serde_json::from_str(&raw)
        .map_err(|e| AppError::validation(format!("Invalid scenario file: {e}")))?;

    if let Some(parent) = PathBuf::from(&config.store.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let store = Arc::new(JsonFileStore::open(&config.store.path).await?);

    let credentials = Arc::new(StaticCredentials::from_config(&config.api));
    let transport = HttpTransport::new(&config.api, credentials)?;
    let api = Arc::new(HttpRemoteApi::new(transport, config.api.base_url.clone()));
    let blob = Arc::new(HttpBlobTransport::new(config.api.request_timeout_seconds)?);
    let host = Arc::new(TracingTaskHost::new());

    let resume = if args.resume {
        let running = RunningScenarioStore::new(store.clone())
            .get()
            .await?
            .filter(|r| r.scenario_id == scenario.uuid)
            .ok_or_else(|| {
                AppError::not_found(format!("No running job recorded for scenario {}", scenario.uuid))
            })?;
        Some(running.job_id)
    } else {
        None
    };

    let job = Job::new(
        scenario,
        &args.output_dir,
        JobServices {
            api,
            blob,
            store,
            host: host.clone(),
        },
        &config,
    );

    let job_token = job.cancellation_token();
    let host_token = host.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling");
            host_token.cancel();
            job_token.cancel();
        }
    });

    let result = match resume {
        Some(job_id) => job.resume(job_id).await?,
        None => job.run().await?,
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    tracing::info!(progress = host.progress(), "Scenario run complete");
    Ok(())
}
