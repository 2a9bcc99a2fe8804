mod cli;

use std::process::ExitCode;

use clap::Parser;
use serde_json::json;
use tracing::{info, warn};

use tunelink::config::AppConfig;
use tunelink::dispatch::DispatchOutcome;
use tunelink::host::{self, HostOutbox};
use tunelink::logging::init_logging;
use tunelink::outcome::{OUTCOME_KEYS, OutcomeRecord};
use tunelink::services::ServiceContainer;
use tunelink::store::KeyValueStore;

use crate::cli::{Args, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(store) = args.store.clone() {
        config.store_path = Some(store);
    }

    let _guard = init_logging(args.verbose, args.quiet, config.log_dir.as_deref())?;
    config.log_sources();

    match args.command() {
        Commands::Host => run_host(config).await,
        Commands::Dispatch { url } => run_dispatch(config, &url).await,
        Commands::Auth {
            access_token,
            refresh_token,
        } => run_auth(config, access_token, refresh_token).await,
        Commands::Status => run_status(config).await,
    }
}

async fn run_host(config: AppConfig) -> anyhow::Result<ExitCode> {
    let (outbox, messages) = HostOutbox::channel();
    let services = ServiceContainer::new(config, Some(outbox)).await?;

    host::serve(
        tokio::io::stdin(),
        tokio::io::stdout(),
        services.dispatcher.clone(),
        messages,
    )
    .await?;

    Ok(ExitCode::SUCCESS)
}

async fn run_dispatch(config: AppConfig, url: &str) -> anyhow::Result<ExitCode> {
    let services = ServiceContainer::new(config, None).await?;
    let outcome = services.dispatcher.dispatch(url).await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(match outcome {
        DispatchOutcome::Failed { .. } | DispatchOutcome::Busy => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

async fn run_auth(
    config: AppConfig,
    access_token: String,
    refresh_token: String,
) -> anyhow::Result<ExitCode> {
    if config.store_path.is_none() {
        warn!("No store path configured; the credentials will not outlive this process");
    }

    let services = ServiceContainer::new(config, None).await?;
    let record = services
        .credentials
        .store_grant(access_token, refresh_token)
        .await?;

    info!(issued_at = %record.issued_at, "Credentials stored");
    Ok(ExitCode::SUCCESS)
}

async fn run_status(config: AppConfig) -> anyhow::Result<ExitCode> {
    let services = ServiceContainer::new(config, None).await?;
    let (_, freshness) = services.credentials.check().await?;
    let outcome = services.store.get(OUTCOME_KEYS).await?;

    let status = json!({
        "authorized": freshness.elapsed_secs().is_some(),
        "credentialAgeSecs": freshness.elapsed_secs(),
        "expired": freshness.is_expired(),
        "refreshAfterSecs": services.config.refresh_after_secs,
        "lastOutcome": OutcomeRecord::from_store_map(&outcome),
    });
    println!("{}", serde_json::to_string_pretty(&status)?);

    Ok(ExitCode::SUCCESS)
}
