//! Connection entity: one directed, weighted, namespace-scoped edge between two peers.

use crate::ConnectionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Settings used to build a [`Connection`]. Also the decoded shape of a stored record.
///
/// A record without `weight` fails to decode: an absent weight would otherwise read as the
/// legal value zero.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "peerAID")]
    pub peer_a_id: String,
    #[serde(default, rename = "peerBID")]
    pub peer_b_id: String,
    pub weight: f64,
}

impl Default for ConnectionConfig {
    /// Best-effort defaults: created now, everything else empty.
    fn default() -> Self {
        Self {
            created: Some(Utc::now()),
            id: String::new(),
            peer_a_id: String::new(),
            peer_b_id: String::new(),
            weight: 0.0,
        }
    }
}

/// Immutable edge record. Fields are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConnectionConfig")]
pub struct Connection {
    created: DateTime<Utc>,
    id: String,
    #[serde(rename = "peerAID")]
    peer_a_id: String,
    #[serde(rename = "peerBID")]
    peer_b_id: String,
    weight: f64,
}

impl Connection {
    /// Build a connection. `created`, `id` and both peer ids are required; weight may be zero.
    pub fn new(config: ConnectionConfig) -> Result<Self, ConnectionError> {
        let created = config.created.ok_or_else(|| {
            ConnectionError::InvalidConfig("created must not be empty".to_string())
        })?;
        if config.id.is_empty() {
            return Err(ConnectionError::InvalidConfig(
                "id must not be empty".to_string(),
            ));
        }
        if config.peer_a_id.is_empty() {
            return Err(ConnectionError::InvalidConfig(
                "peerA id must not be empty".to_string(),
            ));
        }
        if config.peer_b_id.is_empty() {
            return Err(ConnectionError::InvalidConfig(
                "peerB id must not be empty".to_string(),
            ));
        }

        Ok(Self {
            created,
            id: config.id,
            peer_a_id: config.peer_a_id,
            peer_b_id: config.peer_b_id,
            weight: config.weight,
        })
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn peer_a_id(&self) -> &str {
        &self.peer_a_id
    }

    pub fn peer_b_id(&self) -> &str {
        &self.peer_b_id
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Serialize to the stored record format (JSON document).
    pub fn encode(&self) -> Result<String, ConnectionError> {
        serde_json::to_string(self).map_err(|e| ConnectionError::Codec(e.to_string()))
    }

    /// Decode a stored record. Missing required fields surface as `InvalidConfig`.
    pub fn decode(raw: &str) -> Result<Self, ConnectionError> {
        let config: ConnectionConfig =
            serde_json::from_str(raw).map_err(|e| ConnectionError::Codec(e.to_string()))?;
        Self::new(config)
    }
}

impl TryFrom<ConnectionConfig> for Connection {
    type Error = ConnectionError;

    fn try_from(config: ConnectionConfig) -> Result<Self, Self::Error> {
        Self::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config() -> ConnectionConfig {
        ConnectionConfig {
            id: "ns1:ns2:peerA:peerB".to_string(),
            peer_a_id: "peerA".to_string(),
            peer_b_id: "peerB".to_string(),
            weight: 0.5,
            ..ConnectionConfig::default()
        }
    }

    #[test]
    fn new_rejects_missing_fields() {
        let mut c = config();
        c.created = None;
        let err = Connection::new(c).unwrap_err();
        assert!(matches!(err, ConnectionError::InvalidConfig(ref m) if m.contains("created")));

        let mut c = config();
        c.id.clear();
        let err = Connection::new(c).unwrap_err();
        assert!(matches!(err, ConnectionError::InvalidConfig(ref m) if m.starts_with("id")));

        let mut c = config();
        c.peer_a_id.clear();
        let err = Connection::new(c).unwrap_err();
        assert!(matches!(err, ConnectionError::InvalidConfig(ref m) if m.contains("peerA")));

        let mut c = config();
        c.peer_b_id.clear();
        let err = Connection::new(c).unwrap_err();
        assert!(matches!(err, ConnectionError::InvalidConfig(ref m) if m.contains("peerB")));
    }

    #[test]
    fn zero_weight_is_allowed() {
        let mut c = config();
        c.weight = 0.0;
        let conn = Connection::new(c).unwrap();
        assert_eq!(conn.weight(), 0.0);
    }

    #[test]
    fn record_uses_wire_field_names() {
        let conn = Connection::new(config()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&conn.encode().unwrap()).unwrap();
        let obj = v.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["created", "id", "peerAID", "peerBID", "weight"]);
        assert_eq!(obj["peerAID"], "peerA");
        assert_eq!(obj["weight"], 0.5);
    }

    #[test]
    fn decode_preserves_sub_second_precision() {
        let created = Utc
            .timestamp_opt(1_700_000_000, 123_456_789)
            .single()
            .unwrap();
        let conn = Connection::new(ConnectionConfig {
            created: Some(created),
            weight: 0.1 + 0.2,
            ..config()
        })
        .unwrap();

        let decoded = Connection::decode(&conn.encode().unwrap()).unwrap();
        assert_eq!(decoded, conn);
        assert_eq!(decoded.created().timestamp_subsec_nanos(), 123_456_789);
        assert_eq!(decoded.weight().to_bits(), (0.1f64 + 0.2).to_bits());
    }

    #[test]
    fn decode_reports_missing_field_as_invalid_config() {
        let raw = r#"{"created":"2024-05-01T10:00:00.5Z","id":"a:b:c:d","peerAID":"c","weight":1.0}"#;
        let err = Connection::decode(raw).unwrap_err();
        assert!(matches!(err, ConnectionError::InvalidConfig(ref m) if m.contains("peerB")));

        let err = Connection::decode("not json").unwrap_err();
        assert!(matches!(err, ConnectionError::Codec(_)));
    }

    #[test]
    fn decode_rejects_record_without_weight() {
        let raw = r#"{"created":"2024-05-01T10:00:00Z","id":"a:b:c:d","peerAID":"c","peerBID":"d"}"#;
        let err = Connection::decode(raw).unwrap_err();
        assert!(matches!(err, ConnectionError::Codec(ref m) if m.contains("weight")));
    }

    #[test]
    fn serde_deserialize_runs_construction_checks() {
        let raw = r#"{"created":"2024-05-01T10:00:00Z","id":"","peerAID":"c","peerBID":"d","weight":1.0}"#;
        assert!(serde_json::from_str::<Connection>(raw).is_err());
    }
}
