use serde::{Deserialize, Serialize};

use crate::caller::Caller;

/// A single agent memory record as exchanged with the agent runtime.
///
/// Unknown fields are preserved in `extra` so a stored conversation restores
/// losslessly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub room_id: String,
    pub content: serde_json::Map<String, serde_json::Value>,
    /// Runtime table the record belongs to (e.g. `"messages"`).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MemoryRecord {
    /// Overwrite the identity fields with the caller's own identifiers.
    ///
    /// Records coming out of a decrypted payload carry the uploader's ids;
    /// keeping them would let one tenant inject memories attributed to
    /// another.
    #[must_use]
    pub fn restamped(mut self, caller: &Caller) -> Self {
        self.agent_id = Some(caller.agent_id.clone());
        self.entity_id.clone_from(&caller.entity_id);
        self
    }
}

/// Returns `true` if the JSON value has the shape of a memory record:
/// string `entityId`, object `content`, string `roomId`.
#[must_use]
pub fn is_valid_memory(value: &serde_json::Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    obj.get("entityId").is_some_and(serde_json::Value::is_string)
        && obj.get("content").is_some_and(serde_json::Value::is_object)
        && obj.get("roomId").is_some_and(serde_json::Value::is_string)
}

/// Result of splitting a decrypted payload into usable records.
#[derive(Debug, Default)]
pub struct ParsedMemories {
    pub records: Vec<MemoryRecord>,
    /// Number of array entries that did not look like memory records.
    pub skipped: usize,
}

/// Parse a JSON array of memory records, dropping entries that fail
/// [`is_valid_memory`].
pub fn parse_memory_array(bytes: &[u8]) -> Result<ParsedMemories, serde_json::Error> {
    let values: Vec<serde_json::Value> = serde_json::from_slice(bytes)?;
    let mut parsed = ParsedMemories::default();
    for value in values {
        if !is_valid_memory(&value) {
            parsed.skipped += 1;
            continue;
        }
        match serde_json::from_value::<MemoryRecord>(value) {
            Ok(record) => parsed.records.push(record),
            Err(_) => parsed.skipped += 1,
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validity_checks_required_fields() {
        assert!(is_valid_memory(&json!({
            "entityId": "e1", "roomId": "r1", "content": {"text": "hi"}
        })));
        assert!(!is_valid_memory(&json!({"entityId": "e1", "roomId": "r1"})));
        assert!(!is_valid_memory(&json!({
            "entityId": 5, "roomId": "r1", "content": {}
        })));
        assert!(!is_valid_memory(&json!("string")));
    }

    #[test]
    fn parse_skips_invalid_entries() {
        let payload = json!([
            {"entityId": "e1", "roomId": "r1", "content": {"text": "a"}},
            {"roomId": "r1"},
            {"entityId": "e2", "roomId": "r1", "content": {"text": "b"}, "type": "messages"}
        ]);
        let parsed = parse_memory_array(payload.to_string().as_bytes()).unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.skipped, 1);
        assert_eq!(parsed.records[1].kind.as_deref(), Some("messages"));
    }

    #[test]
    fn parse_rejects_non_array() {
        assert!(parse_memory_array(b"{\"a\":1}").is_err());
    }

    #[test]
    fn restamp_overwrites_foreign_identity() {
        let record: MemoryRecord = serde_json::from_value(json!({
            "entityId": "attacker-entity",
            "agentId": "attacker-agent",
            "roomId": "r1",
            "content": {"text": "hello"},
            "embedding": [0.1, 0.2]
        }))
        .unwrap();

        let caller = Caller::new("agent-me", "entity-me");
        let stamped = record.restamped(&caller);
        assert_eq!(stamped.entity_id, "entity-me");
        assert_eq!(stamped.agent_id.as_deref(), Some("agent-me"));
        assert_eq!(stamped.room_id, "r1");
        assert!(stamped.extra.contains_key("embedding"));
    }
}
