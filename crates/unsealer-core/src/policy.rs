//! What to do when the remote rejects a share during an unseal cycle

use serde::{Deserialize, Serialize};

/// Backoff ceiling, in skipped poll cycles
pub const MAX_BACKOFF_CYCLES: u32 = 32;

/// Reaction to a rejected unseal attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum UnsealFailurePolicy {
    /// Stop at the first rejected share
    FailFast,
    /// Keep retrying with backoff until too many consecutive cycles fail
    Retry { max_consecutive_failures: u32 },
}

impl Default for UnsealFailurePolicy {
    fn default() -> Self {
        UnsealFailurePolicy::Retry {
            max_consecutive_failures: 3,
        }
    }
}

/// Decision after a failed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Skip this many sealed cycles, then try again
    Backoff { skip_cycles: u32 },
    /// Stop the orchestrator
    Abort,
}

impl UnsealFailurePolicy {
    /// Decide what follows the `failures`-th consecutive failed cycle
    pub fn on_failure(&self, failures: u32) -> FailureAction {
        match *self {
            UnsealFailurePolicy::FailFast => FailureAction::Abort,
            UnsealFailurePolicy::Retry {
                max_consecutive_failures,
            } => {
                if failures > max_consecutive_failures {
                    FailureAction::Abort
                } else {
                    let exp = failures.saturating_sub(1).min(5);
                    FailureAction::Backoff {
                        skip_cycles: (1u32 << exp).min(MAX_BACKOFF_CYCLES),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_fast_aborts_immediately() {
        assert_eq!(
            UnsealFailurePolicy::FailFast.on_failure(1),
            FailureAction::Abort
        );
    }

    #[test]
    fn test_retry_backs_off_then_aborts() {
        let policy = UnsealFailurePolicy::Retry {
            max_consecutive_failures: 3,
        };

        assert_eq!(policy.on_failure(1), FailureAction::Backoff { skip_cycles: 1 });
        assert_eq!(policy.on_failure(2), FailureAction::Backoff { skip_cycles: 2 });
        assert_eq!(policy.on_failure(3), FailureAction::Backoff { skip_cycles: 4 });
        assert_eq!(policy.on_failure(4), FailureAction::Abort);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = UnsealFailurePolicy::Retry {
            max_consecutive_failures: 100,
        };
        assert_eq!(
            policy.on_failure(50),
            FailureAction::Backoff {
                skip_cycles: MAX_BACKOFF_CYCLES
            }
        );
    }

    #[test]
    fn test_policy_serde_shape() {
        let json = serde_json::to_string(&UnsealFailurePolicy::default()).unwrap();
        assert_eq!(json, r#"{"mode":"retry","max_consecutive_failures":3}"#);

        let parsed: UnsealFailurePolicy = serde_json::from_str(r#"{"mode":"fail_fast"}"#).unwrap();
        assert_eq!(parsed, UnsealFailurePolicy::FailFast);
    }
}
