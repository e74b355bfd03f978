use super::CodeStructBlock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of the merged artifact tree after one assistant message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Version {
    pub id: String,
    pub name: String,
    pub message_index: usize,
    pub code_blocks: Vec<CodeStructBlock>,
    pub timestamp: DateTime<Utc>,
}
