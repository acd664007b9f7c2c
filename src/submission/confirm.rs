//! Overwrite-conflict deciders.
//!
//! The server's "an entry already exists for today" reply is a synchronous
//! gate: the workflow blocks on one of these until the user (or a configured
//! policy) answers.

use async_trait::async_trait;
use dialoguer::Confirm;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Answers the overwrite question for a same-day conflict.
#[async_trait]
pub trait ConflictDecider: Send + Sync {
    /// `message` is the server-supplied prompt. Returns true to overwrite.
    async fn confirm_overwrite(&self, message: &str) -> bool;
}

/// Interactive terminal prompt.
pub struct TerminalDecider;

#[async_trait]
impl ConflictDecider for TerminalDecider {
    async fn confirm_overwrite(&self, message: &str) -> bool {
        let prompt = message.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()
        })
        .await;

        match answer {
            Ok(Ok(confirmed)) => confirmed,
            Ok(Err(e)) => {
                warn!("Conflict prompt failed, declining overwrite: {}", e);
                false
            }
            Err(e) => {
                warn!("Conflict prompt task failed, declining overwrite: {}", e);
                false
            }
        }
    }
}

/// What to do about a same-day conflict when nobody is at the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Prompt interactively (terminal sessions only).
    #[default]
    Ask,
    /// Replace today's entry without asking.
    Overwrite,
    /// Keep the existing entry and abandon the submission.
    Discard,
}

/// Fixed-policy decider for unattended service operation.
pub struct PolicyDecider {
    overwrite: bool,
}

impl PolicyDecider {
    pub fn new(overwrite: bool) -> Self {
        Self { overwrite }
    }
}

#[async_trait]
impl ConflictDecider for PolicyDecider {
    async fn confirm_overwrite(&self, _message: &str) -> bool {
        self.overwrite
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_policy_decider_is_fixed() {
        assert!(PolicyDecider::new(true).confirm_overwrite("msg").await);
        assert!(!PolicyDecider::new(false).confirm_overwrite("msg").await);
    }

    #[test]
    fn test_policy_deserializes_from_config_values() {
        let policy: ConflictPolicy = serde_json::from_str("\"overwrite\"").unwrap();
        assert_eq!(policy, ConflictPolicy::Overwrite);
        let policy: ConflictPolicy = serde_json::from_str("\"ask\"").unwrap();
        assert_eq!(policy, ConflictPolicy::Ask);
    }
}
