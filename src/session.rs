//! # Client Sessions
//!
//! A [`ClientSession`] binds one transaction attempt to a factory view. It is
//! created by [`ClientFactory::session`](crate::ClientFactory::session); the
//! factory view it holds never owns the connection, so dropping or finishing a
//! session leaves the cluster connected.

use crate::error::FactoryResult;
use crate::factory::ClientFactory;
use docdb_client::{AttemptContext, AttemptState, Cluster, TransactionConfig, Transactions};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Options recorded on a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientSessionOptions {
    pub causally_consistent: bool,
    pub default_transaction_config: Option<TransactionConfig>,
}

impl ClientSessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn causally_consistent(mut self, enabled: bool) -> Self {
        self.causally_consistent = enabled;
        self
    }

    pub fn default_transaction_config(mut self, config: TransactionConfig) -> Self {
        self.default_transaction_config = Some(config);
        self
    }
}

pub struct ClientSession<C: Cluster, T: Transactions> {
    id: Uuid,
    factory: ClientFactory<C>,
    transactions: Arc<T>,
    config: TransactionConfig,
    options: ClientSessionOptions,
    attempt: T::AttemptContext,
}

impl<C: Cluster, T: Transactions> ClientSession<C, T> {
    pub(crate) fn new(
        factory: ClientFactory<C>,
        transactions: Arc<T>,
        config: TransactionConfig,
        options: ClientSessionOptions,
        attempt: T::AttemptContext,
    ) -> Self {
        let id = Uuid::new_v4();
        info!(
            session_id = %id,
            transaction_id = attempt.transaction_id(),
            attempt_id = attempt.attempt_id(),
            "Session opened"
        );
        Self {
            id,
            factory,
            transactions,
            config,
            options,
            attempt,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Non-owning view of the factory that opened this session.
    pub fn factory(&self) -> &ClientFactory<C> {
        &self.factory
    }

    pub fn transactions(&self) -> &Arc<T> {
        &self.transactions
    }

    pub fn transaction_config(&self) -> &TransactionConfig {
        &self.config
    }

    pub fn options(&self) -> &ClientSessionOptions {
        &self.options
    }

    pub fn attempt_context(&self) -> &T::AttemptContext {
        &self.attempt
    }

    pub fn has_active_transaction(&self) -> bool {
        self.attempt.state() == AttemptState::Pending
    }

    #[instrument(skip(self), fields(session_id = %self.id, attempt_id = self.attempt.attempt_id()))]
    pub async fn commit_transaction(&self) -> FactoryResult<()> {
        self.attempt.commit().await?;
        info!("Transaction committed");
        Ok(())
    }

    #[instrument(skip(self), fields(session_id = %self.id, attempt_id = self.attempt.attempt_id()))]
    pub async fn abort_transaction(&self) -> FactoryResult<()> {
        self.attempt.rollback().await?;
        info!("Transaction rolled back");
        Ok(())
    }

    /// Ends the session and hands the attempt back to the caller.
    pub fn into_attempt_context(self) -> T::AttemptContext {
        self.attempt
    }
}

impl<C: Cluster, T: Transactions> Debug for ClientSession<C, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("id", &self.id)
            .field("factory", &self.factory)
            .field("options", &self.options)
            .field("attempt", &self.attempt)
            .finish()
    }
}
