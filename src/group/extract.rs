//! Group discovery
//!
//! Scans the engine document's `outbounds` and `inbounds` collections for
//! declarations following the relay's tagging convention. Discovery is
//! best-effort: anything that does not match exactly is skipped.

use super::Group;
use crate::config::TagConvention;
use crate::error::{RelayError, Result};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, trace};

/// Minimum number of backends for rotation to make sense
const MIN_BACKENDS: usize = 2;

/// Read and parse the engine document
pub fn load_document<P: AsRef<Path>>(path: P) -> Result<Value> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| RelayError::DocumentRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| RelayError::DocumentParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Read the engine document and extract its groups
pub fn load_groups<P: AsRef<Path>>(path: P, tags: &TagConvention) -> Result<Vec<Group>> {
    let document = load_document(path)?;
    Ok(extract_groups(&document, tags))
}

/// Extract load-balancing groups from a parsed document
///
/// Groups are returned ordered by id; each group's backends are ordered by
/// their declared index.
pub fn extract_groups(document: &Value, tags: &TagConvention) -> Vec<Group> {
    let listen_ports = listen_declarations(document, tags);
    let mut members = backend_declarations(document, tags);

    let mut groups = Vec::new();
    for (id, listen_port) in listen_ports {
        let Some(mut backends) = members.remove(id) else {
            debug!("Group '{}' has no backend declarations, skipping", id);
            continue;
        };
        if backends.len() < MIN_BACKENDS {
            debug!(
                "Group '{}' has {} backend declaration(s), skipping",
                id,
                backends.len()
            );
            continue;
        }
        backends.sort_by_key(|(index, _)| *index);
        groups.push(Group {
            id: id.to_string(),
            listen_port,
            backend_ports: backends.into_iter().map(|(_, port)| port).collect(),
        });
    }

    groups
}

/// Entries of a top-level array, empty when absent or not an array
fn collection<'a>(document: &'a Value, key: &str) -> &'a [Value] {
    document
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn str_field<'a>(entry: &'a Value, key: &str) -> Option<&'a str> {
    entry.get(key).and_then(Value::as_str)
}

/// Integer port field; non-integers and out-of-range values are rejected
fn port_field(entry: &Value, key: &str) -> Option<u16> {
    entry
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|port| u16::try_from(port).ok())
}

/// Group id -> listen port, from outbound declarations
fn listen_declarations<'a>(document: &'a Value, tags: &TagConvention) -> BTreeMap<&'a str, u16> {
    let mut ports = BTreeMap::new();

    for entry in collection(document, "outbounds") {
        let Some(tag) = str_field(entry, "tag") else {
            continue;
        };
        let Some(group) = tags.listen_group(tag) else {
            continue;
        };
        if str_field(entry, "type") != Some(tags.kind.as_str())
            || str_field(entry, "server") != Some(tags.loopback.as_str())
        {
            trace!("Outbound '{}' is not a loopback {} declaration", tag, tags.kind);
            continue;
        }
        let Some(port) = port_field(entry, "server_port") else {
            trace!("Outbound '{}' has no integer server_port", tag);
            continue;
        };
        ports.insert(group, port);
    }

    ports
}

/// Group id -> (index, backend port), from inbound declarations
fn backend_declarations<'a>(
    document: &'a Value,
    tags: &TagConvention,
) -> HashMap<&'a str, Vec<(i64, u16)>> {
    let mut members: HashMap<&str, Vec<(i64, u16)>> = HashMap::new();

    for entry in collection(document, "inbounds") {
        let Some(tag) = str_field(entry, "tag") else {
            continue;
        };
        if str_field(entry, "type") != Some(tags.kind.as_str()) {
            continue;
        }
        let Some((group, index)) = tags.backend_member(tag) else {
            continue;
        };
        let Some(port) = port_field(entry, "listen_port") else {
            trace!("Inbound '{}' has no integer listen_port", tag);
            continue;
        };
        members.entry(group).or_default().push((index, port));
    }

    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outbound(group: &str, port: u16) -> Value {
        json!({
            "type": "socks",
            "tag": format!("sys-rr-{}-lb", group),
            "server": "127.0.0.1",
            "server_port": port,
        })
    }

    fn inbound(group: &str, index: i64, port: u16) -> Value {
        json!({
            "type": "socks",
            "tag": format!("sys-rr-{}-in-{}", group, index),
            "listen": "127.0.0.1",
            "listen_port": port,
        })
    }

    #[test]
    fn test_extract_single_group_sorted_by_index() {
        let document = json!({
            "inbounds": [
                inbound("hk", 2, 30002),
                inbound("hk", 0, 30000),
                inbound("hk", 1, 30001),
            ],
            "outbounds": [outbound("hk", 20000)],
        });

        let groups = extract_groups(&document, &TagConvention::default());
        assert_eq!(
            groups,
            vec![Group {
                id: "hk".to_string(),
                listen_port: 20000,
                backend_ports: vec![30000, 30001, 30002],
            }]
        );
    }

    #[test]
    fn test_index_order_is_numeric_not_lexical() {
        let document = json!({
            "inbounds": [inbound("a", 10, 4010), inbound("a", 9, 4009), inbound("a", -1, 3999)],
            "outbounds": [outbound("a", 4000)],
        });

        let groups = extract_groups(&document, &TagConvention::default());
        assert_eq!(groups[0].backend_ports, vec![3999, 4009, 4010]);
    }

    #[test]
    fn test_groups_with_fewer_than_two_backends_are_dropped() {
        let document = json!({
            "inbounds": [inbound("one", 0, 5001), inbound("two", 0, 6001), inbound("two", 1, 6002)],
            "outbounds": [outbound("zero", 4000), outbound("one", 5000), outbound("two", 6000)],
        });

        let groups = extract_groups(&document, &TagConvention::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, "two");
    }

    #[test]
    fn test_backends_without_listen_declaration_are_ignored() {
        let document = json!({
            "inbounds": [inbound("orphan", 0, 5001), inbound("orphan", 1, 5002)],
            "outbounds": [],
        });

        assert!(extract_groups(&document, &TagConvention::default()).is_empty());
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let document = json!({
            "inbounds": [
                inbound("g", 0, 7001),
                inbound("g", 1, 7002),
                {"type": "mixed", "tag": "sys-rr-g-in-2", "listen_port": 7003},
                {"type": "socks", "tag": "sys-rr-g-in-x", "listen_port": 7004},
                {"type": "socks", "tag": "sys-rr-g-in-3", "listen_port": "7005"},
                {"type": "socks", "tag": "sys-rr-g-in-4", "listen_port": 70000},
                {"type": "socks", "listen_port": 7006},
                "not an object",
                {"type": "mixed", "tag": "mixed-in", "listen_port": 10808},
            ],
            "outbounds": [
                outbound("g", 7000),
                {"type": "socks", "tag": "sys-rr-h-lb", "server": "10.0.0.1", "server_port": 8000},
                {"type": "http", "tag": "sys-rr-i-lb", "server": "127.0.0.1", "server_port": 8001},
                {"type": "socks", "tag": "sys-rr-j-lb", "server": "127.0.0.1", "server_port": 1.5},
                {"type": "direct", "tag": "direct"},
            ],
        });

        let groups = extract_groups(&document, &TagConvention::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].backend_ports, vec![7001, 7002]);
    }

    #[test]
    fn test_multiple_groups_ordered_by_id() {
        let document = json!({
            "inbounds": [
                inbound("us", 0, 9001), inbound("us", 1, 9002),
                inbound("hk", 0, 8001), inbound("hk", 1, 8002),
            ],
            "outbounds": [outbound("us", 9000), outbound("hk", 8000)],
        });

        let groups = extract_groups(&document, &TagConvention::default());
        let ids: Vec<_> = groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["hk", "us"]);
    }

    #[test]
    fn test_missing_collections() {
        assert!(extract_groups(&json!({}), &TagConvention::default()).is_empty());
        assert!(extract_groups(&json!({"inbounds": 3}), &TagConvention::default()).is_empty());
        assert!(extract_groups(&json!([]), &TagConvention::default()).is_empty());
    }

    #[test]
    fn test_custom_convention() {
        let tags = TagConvention {
            prefix: "lb-".to_string(),
            out_suffix: "-out".to_string(),
            in_mark: "-m-".to_string(),
            ..Default::default()
        };
        let document = json!({
            "inbounds": [
                {"type": "socks", "tag": "lb-x-m-0", "listen_port": 1001},
                {"type": "socks", "tag": "lb-x-m-1", "listen_port": 1002},
            ],
            "outbounds": [
                {"type": "socks", "tag": "lb-x-out", "server": "127.0.0.1", "server_port": 1000},
            ],
        });

        let groups = extract_groups(&document, &tags);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].listen_port, 1000);
    }

    #[test]
    fn test_load_document_errors() {
        let err = load_document("/nonexistent/config.json").unwrap_err();
        assert!(matches!(err, RelayError::DocumentRead { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"{ not json").unwrap();
        let err = load_document(file.path()).unwrap_err();
        assert!(matches!(err, RelayError::DocumentParse { .. }));
    }
}
