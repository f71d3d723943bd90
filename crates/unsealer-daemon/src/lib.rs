//! Unsealer Daemon - collects unseal keys and keeps a Vault unsealed
//!
//! This crate provides:
//! - Daemon configuration loading and validation
//! - A Vault REST implementation of the seal status client
//! - HTTP endpoints for submitting keys and reading readiness

pub mod config;
pub mod error;
pub mod server;
pub mod vault;

pub use config::DaemonConfig;
pub use error::{DaemonError, Result};
pub use server::{router, serve};
pub use vault::VaultClient;
