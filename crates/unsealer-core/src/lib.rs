//! Unsealer Core - key share collection and unseal orchestration
//!
//! This crate provides:
//! - A concurrency-safe, capped store of unseal key shares
//! - The seal status polling loop that replays shares while sealed
//! - Root token verification proving the shares are genuine
//! - Pure one-time-pad decoding of generated root tokens
//! - The submission façade consumed by a transport layer

pub mod api;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod otp;
pub mod policy;
pub mod remote;
pub mod share_store;
pub mod verifier;

pub use api::{ApiResponse, ResponseStatus, ShareSubmissionApi};
pub use context::UnsealContext;
pub use error::{RemoteError, Result, TokenDecodeError, UnsealError};
pub use orchestrator::{CycleOutcome, OrchestratorSettings, UnsealOrchestrator};
pub use otp::{decode_token, OneTimePad};
pub use policy::{FailureAction, UnsealFailurePolicy};
pub use remote::{RemoteResult, RootGenerationStatus, SealStatus, SealStatusClient};
pub use share_store::{KeyShareStore, Progress, Share};
pub use verifier::RootTokenVerifier;
