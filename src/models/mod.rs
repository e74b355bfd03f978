pub mod code_block;
pub mod message;
pub mod tree_node;
pub mod version;

pub use code_block::{CodeStructBlock, FileEntry};
pub use message::{ChatMessage, MessageStatus, Role};
pub use tree_node::{NodeKind, TreeNode};
pub use version::Version;

use serde::{Deserialize, Serialize};

/// A single fenced or platform block as it appears in the raw text.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ContentBlock {
    pub language: String,
    pub filename: Option<String>,
    pub content: String,
}

impl ContentBlock {
    pub fn new(language: impl Into<String>, filename: Option<String>, content: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            filename,
            content: content.into(),
        }
    }
}
