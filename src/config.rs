//! Session configuration mutated by the foreground thread and snapshotted at
//! connect time so the worker never races in-flight setter calls.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Quality-of-service level for publishes and subscriptions.
///
/// The public API accepts any integer level and clamps it here, matching
/// brokers that treat everything above 2 as 2.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QoS {
    #[default]
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl QoS {
    /// Clamp an arbitrary requested level into the supported range.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => QoS::AtMostOnce,
            1 => QoS::AtLeastOnce,
            _ => QoS::ExactlyOnce,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        }
    }
}

/// Where the next connection attempt should go.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
}

/// Session-level settings the codec needs for its handshake.
///
/// Lives behind a mutex on the foreground side; the worker only ever sees an
/// owned clone taken when a connect command is issued.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub client_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
}

impl SessionConfig {
    /// Client id to hand the codec: the configured one, or a generated
    /// fallback when the embedder never set one.
    pub fn effective_client_id(&self) -> String {
        match &self.client_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => generated_client_id(),
        }
    }

    pub fn set_credentials(&mut self, username: &str, password: &str) {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
    }
}

fn generated_client_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("brokerlink-{millis:x}")
}
