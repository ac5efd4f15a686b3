// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use hotspot_onboarding_server::{
    api::router,
    blockchain::{ChainReader, HttpChainClient, LedgerContext, LedgerError, ProgramIds, RpcError},
    config::{AppConfig, ConfigError, LedgerConfig, LogFormat},
    custody::KeyCustodian,
    error::set_verbose_errors,
    onboarding::{Ledger, OnboardingService},
    signing::{DomainResolver, EccVerifierClient, VerifyError},
    state::AppState,
    storage::{DbError, OnboardingDb},
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("database: {0}")]
    Db(#[from] DbError),
    #[error("ledger context: {0}")]
    Ledger(#[from] LedgerError),
    #[error("chain client: {0}")]
    Rpc(#[from] RpcError),
    #[error("ECC verifier client: {0}")]
    Verifier(#[from] VerifyError),
    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),
    #[error("bind address: {0}")]
    Addr(#[from] std::net::AddrParseError),
    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("tracing already initialized: {e}");
    }
}

fn build_ledger(config: &AppConfig, ledger: &LedgerConfig) -> Result<Ledger, StartupError> {
    let client = HttpChainClient::new(&config.solana_url, &config.asset_api_url, config.rpc_timeout)?;
    let ctx = LedgerContext::derive(
        ProgramIds::mainnet()?,
        ledger.hnt_mint,
        ledger.iot_mint,
        ledger.mobile_mint,
        ledger.dc_mint,
        ledger.ecc_verifier,
    )?;
    let ecc_verifier = ledger
        .ecc_verify_endpoint
        .as_deref()
        .map(|endpoint| EccVerifierClient::new(endpoint, config.rpc_timeout))
        .transpose()?;

    Ok(Ledger {
        reader: ChainReader::new(Arc::new(client)),
        ctx,
        base_priority_fee: ledger.base_priority_fee,
        ecc_verifier,
        initial_lamports: ledger.initial_lamports,
    })
}

async fn run(config: AppConfig, shutdown: CancellationToken) -> Result<(), StartupError> {
    set_verbose_errors(config.app_env.is_development());

    let db = OnboardingDb::open(&config.database_path())?;
    tracing::info!(path = %config.database_path().display(), "Database opened");

    let ledger = config
        .ledger
        .as_ref()
        .map(|ledger| build_ledger(&config, ledger))
        .transpose()?;
    if ledger.is_none() {
        tracing::warn!("New-ledger signing is not configured; only legacy co-signing is available");
    }

    let http = reqwest::Client::builder().timeout(config.rpc_timeout).build()?;
    let domain = DomainResolver::new(config.enable_solana, config.solana_status_url.clone(), http);

    let custodian = KeyCustodian::new(config.key_ring);
    tracing::info!(key_version = custodian.current_version(), "Key ring loaded");

    let service = OnboardingService::new(Arc::new(db), Arc::new(custodian), domain, ledger, config.policy);
    let app = router(AppState::new(Arc::new(service)));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Onboarding server listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = AppConfig::from_env();
    init_tracing(config.as_ref().map_or(LogFormat::Pretty, |c| c.log_format));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutdown requested");
        signal.cancel();
    });

    match run(config, shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}
