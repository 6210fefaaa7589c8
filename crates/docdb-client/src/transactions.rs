//! # Transactions Engine Contract
//!
//! A [`Transactions`] engine hands out [`AttemptContext`]s. An attempt is the
//! unit of work a session drives to completion with `commit` or `rollback`.
//! Retry policy, cleanup and staging belong to the engine, never to the caller.

use crate::error::ClientResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::time::Duration;

/// How many replicas must acknowledge a transactional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurabilityLevel {
    None,
    #[default]
    Majority,
    MajorityAndPersistToActive,
    PersistToMajority,
}

/// Engine-wide transaction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionConfig {
    pub durability_level: DurabilityLevel,
    pub expiration_time: Duration,
    pub key_value_timeout: Option<Duration>,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            durability_level: DurabilityLevel::default(),
            expiration_time: Duration::from_secs(15),
            key_value_timeout: None,
        }
    }
}

impl TransactionConfig {
    pub fn durability_level(mut self, level: DurabilityLevel) -> Self {
        self.durability_level = level;
        self
    }

    pub fn expiration_time(mut self, expiration: Duration) -> Self {
        self.expiration_time = expiration;
        self
    }

    pub fn key_value_timeout(mut self, timeout: Duration) -> Self {
        self.key_value_timeout = Some(timeout);
        self
    }
}

/// Lifecycle of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Pending,
    Committed,
    RolledBack,
    Expired,
}

impl AttemptState {
    pub fn is_finished(&self) -> bool {
        !matches!(self, AttemptState::Pending)
    }
}

impl Display for AttemptState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AttemptState::Pending => "pending",
            AttemptState::Committed => "committed",
            AttemptState::RolledBack => "rolled_back",
            AttemptState::Expired => "expired",
        };
        f.write_str(label)
    }
}

/// Per-attempt state object.
#[async_trait]
pub trait AttemptContext: Send + Sync + Debug + 'static {
    fn transaction_id(&self) -> &str;

    fn attempt_id(&self) -> &str;

    fn state(&self) -> AttemptState;

    async fn commit(&self) -> ClientResult<()>;

    async fn rollback(&self) -> ClientResult<()>;
}

/// The engine that creates attempts.
pub trait Transactions: Send + Sync + 'static {
    type AttemptContext: AttemptContext;

    fn config(&self) -> &TransactionConfig;

    fn new_attempt_context(&self) -> ClientResult<Self::AttemptContext>;
}
