//! Command-line and environment configuration for the sample.

use bucket_factory::{EnvironmentConfig, FactoryConfig};
use clap::Parser;

/// Walks a client factory through connect, scope derivation, document access,
/// a transaction and close, against an in-memory cluster.
#[derive(Parser, Debug, Clone)]
#[command(name = "factory-sample")]
#[command(about = "Client factory walkthrough against an in-memory document cluster")]
pub struct Args {
    /// Cluster connection string
    #[arg(long, env = "DOCDB_CONNECTION_STRING", default_value = "couchbase://localhost")]
    pub connection_string: String,

    #[arg(long, env = "DOCDB_USERNAME", default_value = "admin")]
    pub username: String,

    #[arg(long, env = "DOCDB_PASSWORD", default_value = "password", hide_env_values = true)]
    pub password: String,

    #[arg(long, env = "DOCDB_BUCKET", default_value = "travel")]
    pub bucket: String,

    /// Named scope the walkthrough derives after connecting on the default one
    #[arg(long, env = "DOCDB_SCOPE", default_value = "inventory")]
    pub scope: String,

    #[arg(long, env = "DOCDB_COLLECTION", default_value = "airline")]
    pub collection: String,

    /// Key-value timeout override in milliseconds
    #[arg(long, env = "DOCDB_KV_TIMEOUT_MS")]
    pub kv_timeout_ms: Option<u64>,
}

impl Args {
    /// Config for the root factory. It always starts on the default scope.
    pub fn factory_config(&self) -> FactoryConfig {
        FactoryConfig::new(
            self.connection_string.clone(),
            self.username.clone(),
            self.password.clone(),
            self.bucket.clone(),
        )
        .with_environment(EnvironmentConfig {
            kv_timeout_ms: self.kv_timeout_ms,
            ..EnvironmentConfig::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_to_config() {
        let args = Args::try_parse_from([
            "factory-sample",
            "--bucket",
            "orders",
            "--kv-timeout-ms",
            "500",
        ])
        .unwrap();
        let config = args.factory_config();
        assert_eq!(config.bucket, "orders");
        assert_eq!(config.scope, None);
        assert_eq!(config.environment.kv_timeout_ms, Some(500));
        assert!(config.validate().is_ok());
    }
}
