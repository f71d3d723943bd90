//! Unsealer Daemon - Main entry point
//!
//! Reads the unseal threshold from Vault, serves the key submission
//! endpoints, and polls Vault until the process is stopped.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use unsealer_core::{UnsealContext, UnsealFailurePolicy};
use unsealer_daemon::{serve, DaemonConfig, VaultClient};

#[derive(Parser, Debug)]
#[command(name = "unsealer-daemon")]
#[command(about = "Collects unseal keys over HTTP and unseals Vault whenever it is sealed")]
struct Args {
    /// JSON configuration file
    #[arg(long, env = "UNSEALER_CONFIG")]
    config: Option<PathBuf>,

    /// Address to serve /add-key and /status on
    #[arg(long, env = "LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// Vault base URL
    #[arg(long, env = "VAULT_ADDR")]
    vault_addr: Option<String>,

    /// Seconds between seal status polls
    #[arg(long, env = "POLLING_INTERVAL")]
    polling_interval: Option<u64>,

    /// Verify keys with a throwaway root token once unsealed
    #[arg(long, env = "VERIFY_ROOT_GENERATION")]
    verify_root_generation: bool,

    /// Timeout for each Vault request (seconds)
    #[arg(long)]
    request_timeout: Option<u64>,

    /// Exit on the first rejected unseal key
    #[arg(long, conflicts_with = "max_unseal_failures")]
    fail_fast: bool,

    /// Consecutive failed unseal cycles tolerated before exiting
    #[arg(long)]
    max_unseal_failures: Option<u32>,

    /// Send a client-generated root generation pad (Vault before 1.10)
    #[arg(long, env = "LEGACY_ROOT_OTP")]
    legacy_root_otp: bool,

    /// Write the default configuration to this path and exit
    #[arg(long, value_name = "PATH")]
    write_default_config: Option<PathBuf>,

    /// Disable Vault certificate checks (FOR TESTING ONLY)
    #[arg(long)]
    insecure_skip_verify: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<DaemonConfig> {
        let mut config = match &self.config {
            Some(path) => DaemonConfig::load(path)
                .with_context(|| format!("failed to load config {:?}", path))?,
            None => DaemonConfig::default(),
        };

        if let Some(addr) = self.listen_addr {
            config.listen_addr = addr;
        }
        if let Some(addr) = self.vault_addr {
            config.vault_addr = addr;
        }
        if let Some(secs) = self.polling_interval {
            config.polling_interval_secs = secs;
        }
        if let Some(secs) = self.request_timeout {
            config.request_timeout_secs = secs;
        }
        if self.verify_root_generation {
            config.verify_root_generation = true;
        }
        if self.fail_fast {
            config.unseal_failure_policy = UnsealFailurePolicy::FailFast;
        }
        if let Some(max) = self.max_unseal_failures {
            config.unseal_failure_policy = UnsealFailurePolicy::Retry {
                max_consecutive_failures: max,
            };
        }
        if self.legacy_root_otp {
            config.legacy_root_otp = true;
        }
        if self.insecure_skip_verify {
            config.accept_invalid_certs = true;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.verbose {
        "unsealer_daemon=debug,unsealer_core=debug,tower_http=debug"
    } else {
        "unsealer_daemon=info,unsealer_core=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(path) = &args.write_default_config {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        DaemonConfig::default().save(path)?;
        info!("Created default config at {:?}", path);
        return Ok(());
    }

    info!("Starting unsealer daemon v{}", env!("CARGO_PKG_VERSION"));

    let config = args.into_config()?;
    if config.accept_invalid_certs {
        warn!("Vault certificate verification is disabled");
    }

    let client = Arc::new(VaultClient::new(
        &config.vault_addr,
        config.request_timeout(),
        config.accept_invalid_certs,
    )?);

    // The threshold is read once; without it there is nothing to enforce
    let context = UnsealContext::from_remote(client.as_ref())
        .await
        .with_context(|| format!("failed to read seal status from {}", config.vault_addr))?;

    let server_handle = {
        let listen_addr = config.listen_addr.clone();
        let api = context.api();
        tokio::spawn(async move { serve(&listen_addr, api).await })
    };

    let orchestrator = context.orchestrator(client, config.orchestrator_settings());
    let poller_handle = tokio::spawn(orchestrator.run());

    info!("Daemon started successfully");

    // Wait for shutdown signal or a task ending
    let exit = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            Ok(())
        }
        result = server_handle => {
            error!("HTTP server exited unexpectedly");
            match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(anyhow::Error::new(e)),
                Err(e) => Err(anyhow::Error::new(e)),
            }
        }
        result = poller_handle => {
            error!("Seal status poller stopped");
            match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(anyhow::Error::new(e).context("unseal orchestration failed")),
                Err(e) => Err(anyhow::Error::new(e)),
            }
        }
    };

    info!("Daemon shutting down");

    exit
}
