//! Storage addressing for connections.
//!
//! Record key: `namespaceA:namespaceB:peerA:peerB`. Adjacency key: `namespaceA:namespaceB:peerA`.
//! Components may not be empty or contain the separator, so every key parses back unambiguously.

use conn_types::ConnectionError;

pub const SEPARATOR: char = ':';

fn check(name: &str, value: &str) -> Result<(), ConnectionError> {
    if value.is_empty() {
        return Err(ConnectionError::InvalidKey(format!(
            "{} must not be empty",
            name
        )));
    }
    if value.contains(SEPARATOR) {
        return Err(ConnectionError::InvalidKey(format!(
            "{} must not contain '{}': {}",
            name, SEPARATOR, value
        )));
    }
    Ok(())
}

/// Key of the set holding every peerB connected from `peer_a` in the namespace pair.
pub fn adjacency_key(
    namespace_a: &str,
    namespace_b: &str,
    peer_a: &str,
) -> Result<String, ConnectionError> {
    check("namespace A", namespace_a)?;
    check("namespace B", namespace_b)?;
    check("peer A id", peer_a)?;
    Ok(format!(
        "{}{sep}{}{sep}{}",
        namespace_a,
        namespace_b,
        peer_a,
        sep = SEPARATOR
    ))
}

/// Key of the record for the directed edge `peer_a -> peer_b`; doubles as the connection id.
pub fn record_key(
    namespace_a: &str,
    namespace_b: &str,
    peer_a: &str,
    peer_b: &str,
) -> Result<String, ConnectionError> {
    let prefix = adjacency_key(namespace_a, namespace_b, peer_a)?;
    check("peer B id", peer_b)?;
    Ok(format!("{}{}{}", prefix, SEPARATOR, peer_b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_join_components() {
        assert_eq!(
            record_key("ns1", "ns2", "peerA", "peerB").unwrap(),
            "ns1:ns2:peerA:peerB"
        );
        assert_eq!(adjacency_key("ns1", "ns2", "peerA").unwrap(), "ns1:ns2:peerA");
    }

    #[test]
    fn separator_in_component_is_rejected() {
        // Without the check, ("a:b","c","d","e") and ("a","b:c","d","e") would share a key.
        let err = record_key("a:b", "c", "d", "e").unwrap_err();
        assert!(matches!(err, ConnectionError::InvalidKey(ref m) if m.contains("namespace A")));
        let err = record_key("a", "b", "c", "d:e").unwrap_err();
        assert!(matches!(err, ConnectionError::InvalidKey(ref m) if m.contains("peer B")));
    }

    #[test]
    fn empty_component_is_rejected() {
        assert!(matches!(
            adjacency_key("ns1", "", "peerA"),
            Err(ConnectionError::InvalidKey(_))
        ));
        assert!(matches!(
            record_key("ns1", "ns2", "peerA", ""),
            Err(ConnectionError::InvalidKey(_))
        ));
    }
}
