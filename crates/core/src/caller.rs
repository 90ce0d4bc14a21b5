use serde::{Deserialize, Serialize};

/// The chat participant a workflow runs on behalf of.
///
/// Restored memory records are re-stamped with `agent_id` and `entity_id`
/// from this value, never with the identifiers found in the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Agent runtime identifier.
    pub agent_id: String,
    /// Entity (user) the request originates from.
    pub entity_id: String,
    /// Conversation room, used to select memories to store.
    #[serde(default)]
    pub room_id: Option<String>,
}

impl Caller {
    #[must_use]
    pub fn new(agent_id: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            entity_id: entity_id.into(),
            room_id: None,
        }
    }

    #[must_use]
    pub fn with_room(mut self, room_id: impl Into<String>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }
}
