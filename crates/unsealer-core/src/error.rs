//! Error types for the unseal engine

use thiserror::Error;

/// Result type alias for unseal operations
pub type Result<T> = std::result::Result<T, UnsealError>;

/// Errors that can occur while collecting shares or driving an unseal
#[derive(Debug, Error)]
pub enum UnsealError {
    /// The share was already submitted
    #[error("unseal key already submitted")]
    DuplicateShare,

    /// No more shares are accepted
    #[error("unseal key threshold of {threshold} already met")]
    ThresholdAlreadyMet { threshold: usize },

    /// Submitted share was blank after trimming
    #[error("unseal key is empty")]
    EmptyShare,

    /// Submitted share was not valid UTF-8
    #[error("unseal key is not valid UTF-8")]
    InvalidEncoding,

    /// Remote reported a threshold we cannot work with
    #[error("invalid unseal threshold: {0}")]
    InvalidThreshold(usize),

    /// Call to the remote service failed
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Remote rejected shares during an unseal cycle, and the failure policy gave up
    #[error("unseal failed after {attempts} attempt(s): {source}")]
    UnsealAttempt {
        attempts: u32,
        #[source]
        source: RemoteError,
    },

    /// Root token ceremony did not complete
    #[error("root generation verification failed: {0}")]
    Verification(String),

    /// Encoded root token could not be decoded
    #[error("root token decode failed: {0}")]
    TokenDecode(#[from] TokenDecodeError),
}

impl UnsealError {
    /// True for errors the submitting operator can correct themselves
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            UnsealError::DuplicateShare
                | UnsealError::ThresholdAlreadyMet { .. }
                | UnsealError::EmptyShare
                | UnsealError::InvalidEncoding
        )
    }
}

/// Failure reaching or talking to the remote secret store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// Connection could not be established
    #[error("remote unreachable: {0}")]
    Unreachable(String),

    /// Request exceeded its deadline
    #[error("remote request timed out")]
    Timeout,

    /// Remote answered with an error
    #[error("remote rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Remote answered with something we could not parse
    #[error("invalid response from remote: {0}")]
    InvalidResponse(String),
}

/// Errors from the one-time-pad token transform
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenDecodeError {
    /// Encoded token or pad was not base64
    #[error("invalid base64: {0}")]
    Base64(String),

    /// Pad and ciphertext lengths differ
    #[error("pad length {pad} does not match token length {token}")]
    LengthMismatch { pad: usize, token: usize },

    /// Combined bytes are not a valid token
    #[error("decoded token is malformed: {0}")]
    Malformed(String),
}

impl From<base64::DecodeError> for TokenDecodeError {
    fn from(e: base64::DecodeError) -> Self {
        TokenDecodeError::Base64(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(UnsealError::DuplicateShare.is_client_error());
        assert!(UnsealError::ThresholdAlreadyMet { threshold: 3 }.is_client_error());
        assert!(!UnsealError::Remote(RemoteError::Timeout).is_client_error());
        assert!(!UnsealError::Verification("boom".into()).is_client_error());
    }

    #[test]
    fn test_threshold_message() {
        let err = UnsealError::ThresholdAlreadyMet { threshold: 3 };
        assert_eq!(err.to_string(), "unseal key threshold of 3 already met");
    }
}
