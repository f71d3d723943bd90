//! Seal status polling loop
//!
//! Every cycle reads the remote seal state and the share store, then does one
//! of: nothing, replay all shares against the unseal endpoint, or run the
//! one-off root token verification.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::{RemoteError, Result, UnsealError};
use crate::policy::{FailureAction, UnsealFailurePolicy};
use crate::remote::SealStatusClient;
use crate::share_store::{KeyShareStore, Progress};
use crate::verifier::RootTokenVerifier;

/// Default seconds between poll cycles
pub const DEFAULT_POLLING_INTERVAL_SECS: u64 = 1;

/// Orchestrator tuning, fixed at startup
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Sleep between poll cycles
    pub polling_interval: Duration,

    /// Whether to prove shares with a root token ceremony once unsealed
    pub verify_root_generation: bool,

    /// Reaction to rejected unseal shares
    pub failure_policy: UnsealFailurePolicy,

    /// Send a client-generated 16-byte pad when verifying, for remotes that
    /// cannot generate the pad themselves
    pub legacy_root_otp: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            polling_interval: Duration::from_secs(DEFAULT_POLLING_INTERVAL_SECS),
            verify_root_generation: false,
            failure_policy: UnsealFailurePolicy::default(),
            legacy_root_otp: false,
        }
    }
}

/// What a single poll cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Seal status could not be read
    StatusUnavailable,
    /// Sealed, but the threshold is not met yet
    AwaitingShares(Progress),
    /// Every share was submitted to the unseal endpoint
    UnsealAttempted { submitted: usize, sealed: bool },
    /// A share was rejected; the policy chose to retry later
    UnsealFailed { consecutive_failures: u32 },
    /// Sealed, but waiting out a backoff period
    BackingOff { remaining_cycles: u32 },
    /// Root token ceremony succeeded
    Verified,
    /// Nothing to do
    Idle,
}

/// Drives the remote to the unsealed state
pub struct UnsealOrchestrator<C: ?Sized> {
    client: Arc<C>,
    store: Arc<KeyShareStore>,
    verifier: RootTokenVerifier,
    settings: OrchestratorSettings,

    /// Set once the current episode's shares were verified
    root_generation_tested: bool,

    consecutive_failures: u32,
    skip_cycles: u32,
}

impl<C> UnsealOrchestrator<C>
where
    C: SealStatusClient + ?Sized,
{
    /// Create an orchestrator over a shared store
    pub fn new(client: Arc<C>, store: Arc<KeyShareStore>, settings: OrchestratorSettings) -> Self {
        let verifier = if settings.legacy_root_otp {
            RootTokenVerifier::legacy()
        } else {
            RootTokenVerifier::new()
        };

        Self {
            client,
            store,
            verifier,
            settings,
            root_generation_tested: false,
            consecutive_failures: 0,
            skip_cycles: 0,
        }
    }

    /// Replace the verifier (e.g. one with a fixed pad)
    pub fn with_verifier(mut self, verifier: RootTokenVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    /// Whether this episode's shares have been verified
    pub fn root_generation_tested(&self) -> bool {
        self.root_generation_tested
    }

    /// Poll forever, returning only on a fatal error
    pub async fn run(mut self) -> Result<()> {
        info!(
            "Polling seal status every {:?} (root generation check {})",
            self.settings.polling_interval,
            if self.settings.verify_root_generation {
                "enabled"
            } else {
                "disabled"
            }
        );

        loop {
            self.poll_once().await?;
            tokio::time::sleep(self.settings.polling_interval).await;
        }
    }

    /// Run one poll cycle
    pub async fn poll_once(&mut self) -> Result<CycleOutcome> {
        let status = match self.client.seal_status().await {
            Ok(status) => status,
            Err(e) => {
                warn!("Failed to read seal status: {}", e);
                return Ok(CycleOutcome::StatusUnavailable);
            }
        };

        let progress = self.store.progress().await;
        if !progress.is_ready() && self.root_generation_tested {
            debug!("Threshold no longer met, starting a new episode");
            self.root_generation_tested = false;
        }

        if status.sealed {
            if !progress.is_ready() {
                debug!("Sealed, holding {} required unseal keys", progress);
                return Ok(CycleOutcome::AwaitingShares(progress));
            }
            if self.skip_cycles > 0 {
                self.skip_cycles -= 1;
                return Ok(CycleOutcome::BackingOff {
                    remaining_cycles: self.skip_cycles,
                });
            }
            return self.unseal().await;
        }

        // Unsealed, possibly by someone else; old failures no longer apply
        if self.consecutive_failures > 0 || self.skip_cycles > 0 {
            debug!(
                "Remote unsealed, clearing {} failed cycle(s)",
                self.consecutive_failures
            );
            self.consecutive_failures = 0;
            self.skip_cycles = 0;
        }

        if progress.is_ready() && self.settings.verify_root_generation && !self.root_generation_tested
        {
            let shares = self.store.snapshot().await;
            self.verifier.verify(self.client.as_ref(), &shares).await?;
            self.root_generation_tested = true;
            return Ok(CycleOutcome::Verified);
        }

        Ok(CycleOutcome::Idle)
    }

    async fn unseal(&mut self) -> Result<CycleOutcome> {
        let shares = self.store.snapshot().await;
        let mut sealed = true;

        for (num, share) in shares.iter().enumerate() {
            info!("Unsealing w/ unseal key #{}", num + 1);
            let result = self.client.submit_unseal_share(share).await;
            match result {
                Ok(status) => sealed = status.sealed,
                Err(e) => return self.record_failure(num + 1, e),
            }
        }

        if self.consecutive_failures > 0 {
            info!(
                "Unseal attempt succeeded after {} failed cycle(s)",
                self.consecutive_failures
            );
            self.consecutive_failures = 0;
        }
        if !sealed {
            info!("Remote reports unsealed");
        }

        Ok(CycleOutcome::UnsealAttempted {
            submitted: shares.len(),
            sealed,
        })
    }

    fn record_failure(&mut self, key_num: usize, source: RemoteError) -> Result<CycleOutcome> {
        self.consecutive_failures += 1;
        error!(
            "Remote rejected unseal key #{} ({} consecutive failed cycle(s)): {}",
            key_num, self.consecutive_failures, source
        );

        match self.settings.failure_policy.on_failure(self.consecutive_failures) {
            FailureAction::Abort => Err(UnsealError::UnsealAttempt {
                attempts: self.consecutive_failures,
                source,
            }),
            FailureAction::Backoff { skip_cycles } => {
                warn!("Backing off for {} poll cycle(s)", skip_cycles);
                self.skip_cycles = skip_cycles;
                Ok(CycleOutcome::UnsealFailed {
                    consecutive_failures: self.consecutive_failures,
                })
            }
        }
    }
}
