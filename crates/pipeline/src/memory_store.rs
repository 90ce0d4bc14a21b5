use async_trait::async_trait;
use harbor_core::{HarborError, MemoryRecord};
use parking_lot::Mutex;

/// Selects the memories to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryQuery {
    pub table: String,
    /// Restrict to one conversation; all of the agent's memories otherwise.
    pub room_id: Option<String>,
    pub agent_id: String,
}

/// The agent runtime's memory table.
#[async_trait]
pub trait MemoryStore: Send + Sync + std::fmt::Debug {
    async fn load(&self, query: &MemoryQuery) -> Result<Vec<MemoryRecord>, HarborError>;

    async fn insert(&self, table: &str, record: MemoryRecord) -> Result<(), HarborError>;
}

/// [`MemoryStore`] held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryMemoryStore {
    rows: Mutex<Vec<(String, MemoryRecord)>>,
}

impl InMemoryMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records currently in `table`, in insertion order.
    pub fn records(&self, table: &str) -> Vec<MemoryRecord> {
        self.rows
            .lock()
            .iter()
            .filter(|(t, _)| t == table)
            .map(|(_, r)| r.clone())
            .collect()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn load(&self, query: &MemoryQuery) -> Result<Vec<MemoryRecord>, HarborError> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|(t, r)| {
                *t == query.table
                    && match &query.room_id {
                        Some(room) => &r.room_id == room,
                        None => r.agent_id.as_deref() == Some(query.agent_id.as_str()),
                    }
            })
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn insert(&self, table: &str, record: MemoryRecord) -> Result<(), HarborError> {
        self.rows.lock().push((table.to_owned(), record));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(room: &str, agent: &str) -> MemoryRecord {
        serde_json::from_value(json!({
            "entityId": "e", "agentId": agent, "roomId": room, "content": {"text": "hi"}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn load_filters_by_room_or_agent() {
        let store = InMemoryMemoryStore::new();
        store.insert("messages", record("r1", "a1")).await.unwrap();
        store.insert("messages", record("r2", "a1")).await.unwrap();
        store.insert("facts", record("r1", "a2")).await.unwrap();

        let by_room = store
            .load(&MemoryQuery {
                table: "messages".into(),
                room_id: Some("r1".into()),
                agent_id: "a1".into(),
            })
            .await
            .unwrap();
        assert_eq!(by_room.len(), 1);

        let by_agent = store
            .load(&MemoryQuery {
                table: "messages".into(),
                room_id: None,
                agent_id: "a1".into(),
            })
            .await
            .unwrap();
        assert_eq!(by_agent.len(), 2);
        assert_eq!(store.records("facts").len(), 1);
    }
}
