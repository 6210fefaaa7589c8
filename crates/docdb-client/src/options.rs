//! # Connection Options
//!
//! Everything a [`Connector`](crate::Connector) needs to open a cluster
//! connection: the parsed [`ConnectionString`], the [`Authenticator`] and an
//! optional [`ClusterEnvironment`] carrying timeouts.

use crate::error::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::time::Duration;

/// Credentials presented when connecting.
#[derive(Clone, PartialEq)]
pub enum Authenticator {
    Password { username: String, password: String },
}

impl Authenticator {
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Authenticator::Password {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Authenticator::Password { username, .. } => username,
        }
    }
}

impl Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Authenticator::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Tunables shared by every connection opened with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterEnvironment {
    pub connect_timeout: Duration,
    pub kv_timeout: Duration,
    pub management_timeout: Duration,
}

impl Default for ClusterEnvironment {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            kv_timeout: Duration::from_millis(2500),
            management_timeout: Duration::from_secs(75),
        }
    }
}

impl ClusterEnvironment {
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn kv_timeout(mut self, timeout: Duration) -> Self {
        self.kv_timeout = timeout;
        self
    }

    pub fn management_timeout(mut self, timeout: Duration) -> Self {
        self.management_timeout = timeout;
        self
    }
}

/// Authenticator plus an optional environment.
#[derive(Debug, Clone)]
pub struct ClusterOptions {
    pub authenticator: Authenticator,
    pub environment: Option<ClusterEnvironment>,
}

impl ClusterOptions {
    pub fn new(authenticator: Authenticator) -> Self {
        Self {
            authenticator,
            environment: None,
        }
    }

    pub fn environment(mut self, environment: ClusterEnvironment) -> Self {
        self.environment = Some(environment);
        self
    }
}

/// A parsed `couchbase://host1,host2?key=value` connection string.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionString {
    pub tls: bool,
    pub hosts: Vec<String>,
    pub params: HashMap<String, String>,
}

impl ConnectionString {
    pub fn parse(input: &str) -> ClientResult<Self> {
        let (scheme, rest) = input.split_once("://").ok_or_else(|| {
            ClientError::InvalidArgument(format!("missing scheme in connection string: {input}"))
        })?;
        let tls = match scheme {
            "couchbase" => false,
            "couchbases" => true,
            other => {
                return Err(ClientError::InvalidArgument(format!(
                    "unsupported scheme: {other}"
                )))
            }
        };

        let (host_part, query) = match rest.split_once('?') {
            Some((hosts, query)) => (hosts, Some(query)),
            None => (rest, None),
        };

        let hosts: Vec<String> = host_part
            .trim_end_matches('/')
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(String::from)
            .collect();
        if hosts.is_empty() {
            return Err(ClientError::InvalidArgument(format!(
                "no hosts in connection string: {input}"
            )));
        }

        let mut params = HashMap::new();
        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                ClientError::InvalidArgument(format!("malformed parameter: {pair}"))
            })?;
            params.insert(key.to_string(), value.to_string());
        }

        Ok(Self { tls, hosts, params })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multi_host_with_params() {
        let parsed =
            ConnectionString::parse("couchbases://node1, node2/?kv_timeout=5s&network=external")
                .unwrap();
        assert!(parsed.tls);
        assert_eq!(parsed.hosts, vec!["node1", "node2"]);
        assert_eq!(parsed.params.get("kv_timeout").map(String::as_str), Some("5s"));
        assert_eq!(parsed.params.len(), 2);
    }

    #[test]
    fn test_parse_rejects_unknown_scheme() {
        let err = ConnectionString::parse("http://localhost").unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[test]
    fn test_parse_rejects_missing_hosts() {
        assert!(ConnectionString::parse("couchbase://").is_err());
        assert!(ConnectionString::parse("localhost").is_err());
    }

    #[test]
    fn test_authenticator_debug_redacts_password() {
        let auth = Authenticator::password("admin", "hunter2");
        let rendered = format!("{auth:?}");
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }
}
