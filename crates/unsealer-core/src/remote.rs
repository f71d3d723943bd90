//! Contract the engine requires from the remote secret store
//!
//! Wire formats belong to the implementor; the engine only sees these shapes.

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::error::RemoteError;

/// Result of a remote call
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Seal state reported by the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SealStatus {
    /// Whether the remote is sealed
    pub sealed: bool,
    /// Number of shares the remote needs to unseal
    pub threshold: usize,
    /// Shares the remote has accepted toward the current unseal
    pub progress: usize,
}

/// State of a root token generation ceremony
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootGenerationStatus {
    /// Ceremony nonce, required on every update
    pub nonce: String,
    /// Shares accepted so far
    pub progress: usize,
    /// Shares required to complete
    pub required: usize,
    /// Whether the ceremony has finished
    pub complete: bool,
    /// Pad-protected token, present once complete
    pub encoded_token: Option<String>,
    /// Pad chosen by the remote, when it generates one itself
    pub otp: Option<String>,
}

/// Remote operations used by the orchestrator and the verifier
#[async_trait]
pub trait SealStatusClient: Send + Sync {
    /// Fetch the current seal state
    async fn seal_status(&self) -> RemoteResult<SealStatus>;

    /// Submit one unseal share
    async fn submit_unseal_share(&self, share: &str) -> RemoteResult<SealStatus>;

    /// Start a root token ceremony
    ///
    /// With `otp` unset the remote generates the pad and returns it in
    /// [`RootGenerationStatus::otp`].
    async fn init_root_generation(&self, otp: Option<&str>)
        -> RemoteResult<RootGenerationStatus>;

    /// Provide one share to the running ceremony
    async fn update_root_generation(
        &self,
        share: &str,
        nonce: &str,
    ) -> RemoteResult<RootGenerationStatus>;

    /// Abort any running ceremony
    async fn cancel_root_generation(&self) -> RemoteResult<()>;

    /// Revoke the token used to authenticate the call
    async fn revoke_self(&self, token: &Zeroizing<String>) -> RemoteResult<()>;
}
