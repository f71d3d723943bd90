//! In-memory collection of unseal key shares
//!
//! Shares arrive from concurrent submission requests while the poller reads
//! snapshots of the collection. All access goes through a single lock, so the
//! threshold cap and the uniqueness check are evaluated atomically with the
//! append.

use std::fmt;

use tokio::sync::RwLock;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{Result, UnsealError};

/// A single unseal key, wiped from memory on drop
pub type Share = Zeroizing<String>;

/// Number of shares held against the number required
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Shares collected so far
    pub collected: usize,
    /// Shares needed to unseal
    pub required: usize,
}

impl Progress {
    /// Whether the threshold is met
    pub fn is_ready(&self) -> bool {
        self.collected >= self.required
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {}", self.collected, self.required)
    }
}

/// Thread-safe, capped, duplicate-free share collection
pub struct KeyShareStore {
    /// Shares in submission order
    shares: RwLock<Vec<Share>>,

    /// Required number of distinct shares, fixed at construction
    threshold: usize,
}

impl KeyShareStore {
    /// Create an empty store for the given threshold
    pub fn new(threshold: usize) -> Result<Self> {
        if threshold == 0 {
            return Err(UnsealError::InvalidThreshold(threshold));
        }

        Ok(Self {
            shares: RwLock::new(Vec::with_capacity(threshold)),
            threshold,
        })
    }

    /// Required number of shares
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Add a share, trimming surrounding whitespace first
    pub async fn submit(&self, share: &str) -> Result<Progress> {
        let trimmed = share.trim();
        if trimmed.is_empty() {
            return Err(UnsealError::EmptyShare);
        }

        let mut shares = self.shares.write().await;

        if shares.len() >= self.threshold {
            return Err(UnsealError::ThresholdAlreadyMet {
                threshold: self.threshold,
            });
        }

        if shares.iter().any(|s| s.as_str() == trimmed) {
            return Err(UnsealError::DuplicateShare);
        }

        shares.push(Zeroizing::new(trimmed.to_string()));
        let progress = Progress {
            collected: shares.len(),
            required: self.threshold,
        };
        debug!("Accepted unseal key #{}", progress.collected);

        Ok(progress)
    }

    /// Current progress toward the threshold
    pub async fn progress(&self) -> Progress {
        Progress {
            collected: self.shares.read().await.len(),
            required: self.threshold,
        }
    }

    /// Owned copy of the shares in submission order
    pub async fn snapshot(&self) -> Vec<Share> {
        self.shares.read().await.clone()
    }
}
