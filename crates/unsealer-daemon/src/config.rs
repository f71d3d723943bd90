//! Daemon configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use unsealer_core::{OrchestratorSettings, UnsealFailurePolicy};

use crate::error::{DaemonError, Result};

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Address the submission endpoints listen on
    pub listen_addr: String,

    /// Base URL of the Vault server
    pub vault_addr: String,

    /// Seconds between seal status polls
    pub polling_interval_secs: u64,

    /// Whether to prove collected keys with a throwaway root token
    pub verify_root_generation: bool,

    /// Timeout for each request to Vault (seconds)
    pub request_timeout_secs: u64,

    /// Reaction to Vault rejecting an unseal key
    pub unseal_failure_policy: UnsealFailurePolicy,

    /// Skip Vault certificate verification (testing only)
    pub accept_invalid_certs: bool,

    /// Send a client-generated pad for root generation (pre-1.10 Vault)
    pub legacy_root_otp: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8443".to_string(),
            vault_addr: "https://127.0.0.1:8200".to_string(),
            polling_interval_secs: 1,
            verify_root_generation: false,
            request_timeout_secs: 10,
            unseal_failure_policy: UnsealFailurePolicy::default(),
            accept_invalid_certs: false,
            legacy_root_otp: false,
        }
    }
}

impl DaemonConfig {
    /// Load configuration from file
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file, refusing to replace an existing one
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        if path.exists() {
            return Err(DaemonError::Config(format!(
                "{} already exists",
                path.display()
            )));
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the daemon cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.polling_interval_secs == 0 {
            return Err(DaemonError::Config(
                "polling interval must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(DaemonError::Config(
                "request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.vault_addr.trim().is_empty() {
            return Err(DaemonError::Config("vault address is empty".to_string()));
        }
        Ok(())
    }

    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Settings for the seal status poller
    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            polling_interval: Duration::from_secs(self.polling_interval_secs),
            verify_root_generation: self.verify_root_generation,
            failure_policy: self.unseal_failure_policy,
            legacy_root_otp: self.legacy_root_otp,
        }
    }
}
