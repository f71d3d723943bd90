//! Share submission operations exposed to the transport layer

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::UnsealError;
use crate::share_store::KeyShareStore;

/// Outcome class of a submission operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// Operation succeeded
    Success,
    /// Caller supplied a share that cannot be accepted
    ClientError,
    /// Threshold is not met yet
    NotReady,
}

/// Textual reply handed back to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: ResponseStatus,
    pub message: String,
}

impl ApiResponse {
    fn success(message: String) -> Self {
        Self {
            status: ResponseStatus::Success,
            message,
        }
    }

    /// Whether the transport should answer with a success status
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

/// Façade over the share store for submitting keys and reading readiness
#[derive(Clone)]
pub struct ShareSubmissionApi {
    store: Arc<KeyShareStore>,
}

impl ShareSubmissionApi {
    pub fn new(store: Arc<KeyShareStore>) -> Self {
        Self { store }
    }

    /// Submit a raw share as received from the transport
    pub async fn add_share(&self, raw: &[u8]) -> ApiResponse {
        let result = match std::str::from_utf8(raw) {
            Ok(share) => self.store.submit(share).await,
            Err(_) => Err(UnsealError::InvalidEncoding),
        };

        match result {
            Ok(progress) => {
                info!("Received unseal key, {} collected", progress);
                ApiResponse::success(format!("{} required unseal keys", progress))
            }
            Err(e) => {
                warn!("Rejected unseal key: {}", e);
                let status = if e.is_client_error() {
                    ResponseStatus::ClientError
                } else {
                    ResponseStatus::NotReady
                };
                ApiResponse {
                    status,
                    message: e.to_string(),
                }
            }
        }
    }

    /// Report progress toward the threshold
    pub async fn status(&self) -> ApiResponse {
        let progress = self.store.progress().await;

        if progress.is_ready() {
            ApiResponse::success(format!(
                "{} required unseal keys. Ready to unseal!",
                progress
            ))
        } else {
            ApiResponse {
                status: ResponseStatus::NotReady,
                message: format!("{} required unseal keys. Requirement not met", progress),
            }
        }
    }
}
