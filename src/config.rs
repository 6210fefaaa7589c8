//! # Factory Configuration
//!
//! [`FactoryConfig`] is the serializable form of "connect to this cluster, open
//! this bucket and scope". It can be deserialized from any serde format or
//! assembled from CLI/env arguments, then handed to
//! [`ClientFactory::from_config`](crate::ClientFactory::from_config).

use crate::error::{FactoryError, FactoryResult};
use docdb_client::{Authenticator, ClusterEnvironment, ConnectionString};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;

/// Timeout overrides applied on top of [`ClusterEnvironment::default`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub connect_timeout_ms: Option<u64>,
    pub kv_timeout_ms: Option<u64>,
    pub management_timeout_ms: Option<u64>,
}

impl EnvironmentConfig {
    pub fn is_empty(&self) -> bool {
        self.connect_timeout_ms.is_none()
            && self.kv_timeout_ms.is_none()
            && self.management_timeout_ms.is_none()
    }

    pub fn to_environment(&self) -> ClusterEnvironment {
        let mut env = ClusterEnvironment::default();
        if let Some(ms) = self.connect_timeout_ms {
            env = env.connect_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.kv_timeout_ms {
            env = env.kv_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.management_timeout_ms {
            env = env.management_timeout(Duration::from_millis(ms));
        }
        env
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoryConfig {
    pub connection_string: String,
    pub username: String,
    /// Never serialized. A config loaded back from its own serialized form has
    /// an empty password and fails [`validate`](Self::validate).
    #[serde(skip_serializing, default)]
    pub password: String,
    pub bucket: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub environment: EnvironmentConfig,
}

impl Debug for FactoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryConfig")
            .field("connection_string", &self.connection_string)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("scope", &self.scope)
            .field("environment", &self.environment)
            .finish()
    }
}

impl FactoryConfig {
    pub fn new(
        connection_string: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            connection_string: connection_string.into(),
            username: username.into(),
            password: password.into(),
            bucket: bucket.into(),
            scope: None,
            environment: EnvironmentConfig::default(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_environment(mut self, environment: EnvironmentConfig) -> Self {
        self.environment = environment;
        self
    }

    pub fn validate(&self) -> FactoryResult<()> {
        if self.connection_string.trim().is_empty() {
            return Err(FactoryError::InvalidConfig(
                "connection_string must not be empty".into(),
            ));
        }
        ConnectionString::parse(&self.connection_string)
            .map_err(|e| FactoryError::InvalidConfig(e.to_string()))?;
        if self.username.trim().is_empty() {
            return Err(FactoryError::InvalidConfig("username must not be empty".into()));
        }
        if self.password.is_empty() {
            return Err(FactoryError::InvalidConfig("password must not be empty".into()));
        }
        if self.bucket.trim().is_empty() {
            return Err(FactoryError::InvalidConfig("bucket must not be empty".into()));
        }
        if self.scope.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(FactoryError::InvalidConfig(
                "scope must be omitted or non-empty".into(),
            ));
        }
        Ok(())
    }

    pub fn authenticator(&self) -> Authenticator {
        Authenticator::password(self.username.clone(), self.password.clone())
    }

    /// `None` when no timeout is overridden.
    pub fn cluster_environment(&self) -> Option<ClusterEnvironment> {
        if self.environment.is_empty() {
            None
        } else {
            Some(self.environment.to_environment())
        }
    }
}
