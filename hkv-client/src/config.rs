use std::time::Duration;

use hkv_pooling::DEFAULT_RECHECK_INTERVAL;
use serde::{Deserialize, Serialize};

use crate::error::ClientResult;
use crate::pool::PoolConfig;

/// Configuration for the pooled client.
///
/// Durations are expressed in milliseconds when serialized; every field has a
/// default, so a partial document is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server address, e.g. "127.0.0.1:6379".
    pub addr: String,
    /// Maximum idle connections kept in the pool.
    pub max_idle: usize,
    /// Maximum total connections (idle + in-use).
    pub max_total: usize,
    /// Optional TCP read timeout.
    #[serde(rename = "read_timeout_ms", with = "millis::option")]
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    #[serde(rename = "write_timeout_ms", with = "millis::option")]
    pub write_timeout: Option<Duration>,
    /// Optional TCP connect timeout.
    #[serde(rename = "connect_timeout_ms", with = "millis::option")]
    pub connect_timeout: Option<Duration>,
    /// How long a borrowed connection is trusted before it is re-checked.
    /// Zero re-checks before every command.
    #[serde(rename = "recheck_interval_ms", with = "millis")]
    pub recheck_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            addr: "127.0.0.1:6379".to_string(),
            max_idle: 8,
            max_total: 16,
            read_timeout: None,
            write_timeout: None,
            connect_timeout: None,
            recheck_interval: DEFAULT_RECHECK_INTERVAL,
        }
    }
}

impl ClientConfig {
    /// Parses a JSON configuration document.
    pub fn from_json(raw: &str) -> ClientResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub(crate) fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            addr: self.addr.clone(),
            max_idle: self.max_idle,
            max_total: self.max_total,
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
            connect_timeout: self.connect_timeout,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    fn to_millis(value: &Duration) -> u64 {
        u64::try_from(value.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(to_millis(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }

    pub mod option {
        use std::time::Duration;

        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(duration) => serializer.serialize_some(&super::to_millis(duration)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            Option::<u64>::deserialize(deserializer).map(|value| value.map(Duration::from_millis))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ClientConfig::from_json("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.recheck_interval, Duration::from_secs(5));
    }

    #[test]
    fn reads_millisecond_fields() {
        let config = ClientConfig::from_json(
            r#"{
                "addr": "10.0.0.5:7000",
                "max_total": 4,
                "read_timeout_ms": 250,
                "connect_timeout_ms": null,
                "recheck_interval_ms": 0
            }"#,
        )
        .unwrap();

        assert_eq!(config.addr, "10.0.0.5:7000");
        assert_eq!(config.max_total, 4);
        assert_eq!(config.max_idle, 8);
        assert_eq!(config.read_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.connect_timeout, None);
        assert_eq!(config.recheck_interval, Duration::ZERO);
    }

    #[test]
    fn serializes_to_milliseconds() {
        let mut config = ClientConfig::default();
        config.write_timeout = Some(Duration::from_secs(2));
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["write_timeout_ms"], 2000_u64);
        assert_eq!(value["recheck_interval_ms"], 5000_u64);
        assert!(value["read_timeout_ms"].is_null());
    }

    #[test]
    fn rejects_malformed_document() {
        assert!(matches!(
            ClientConfig::from_json(r#"{"recheck_interval_ms": "soon"}"#),
            Err(ClientError::Config(_))
        ));
    }
}
