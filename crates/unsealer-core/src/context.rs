//! Shared state for one unsealer process
//!
//! Built once at startup and handed to both the poller and the submission
//! façade, so they operate on the same share store.

use std::sync::Arc;

use tracing::info;

use crate::api::ShareSubmissionApi;
use crate::error::Result;
use crate::orchestrator::{OrchestratorSettings, UnsealOrchestrator};
use crate::remote::SealStatusClient;
use crate::share_store::KeyShareStore;

/// Owns the share store and hands out views over it
#[derive(Clone)]
pub struct UnsealContext {
    store: Arc<KeyShareStore>,
}

impl UnsealContext {
    /// Context for a known threshold
    pub fn new(threshold: usize) -> Result<Self> {
        Ok(Self {
            store: Arc::new(KeyShareStore::new(threshold)?),
        })
    }

    /// Context using the threshold the remote reports right now
    ///
    /// The threshold is read once; later changes on the remote are not seen.
    pub async fn from_remote<C>(client: &C) -> Result<Self>
    where
        C: SealStatusClient + ?Sized,
    {
        let status = client.seal_status().await?;
        info!(
            "Remote requires {} unseal keys (currently {})",
            status.threshold,
            if status.sealed { "sealed" } else { "unsealed" }
        );
        Self::new(status.threshold)
    }

    /// The shared store
    pub fn store(&self) -> Arc<KeyShareStore> {
        Arc::clone(&self.store)
    }

    /// Submission façade bound to this context
    pub fn api(&self) -> ShareSubmissionApi {
        ShareSubmissionApi::new(self.store())
    }

    /// Poller bound to this context
    pub fn orchestrator<C>(
        &self,
        client: Arc<C>,
        settings: OrchestratorSettings,
    ) -> UnsealOrchestrator<C>
    where
        C: SealStatusClient + ?Sized,
    {
        UnsealOrchestrator::new(client, self.store(), settings)
    }
}
