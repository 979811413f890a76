use crate::registry::PAYLOAD_FIELD;

/// A single entry read from a stream on behalf of a consumer group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    /// Stream entry ID, e.g. `1700000000000-0`
    pub id: String,
    pub fields: Vec<(String, String)>,
    /// How many times the group has delivered this entry, this delivery included
    pub deliveries: u64,
}

impl StreamMessage {
    pub fn new(id: impl Into<String>, fields: Vec<(String, String)>, deliveries: u64) -> Self {
        Self {
            id: id.into(),
            fields,
            deliveries,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The serialized payload; `None` when the field is missing or blank.
    pub fn payload(&self) -> Option<&str> {
        self.field(PAYLOAD_FIELD).filter(|v| !v.trim().is_empty())
    }
}
