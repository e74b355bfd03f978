use serde::{Deserialize, Serialize};

/// File-system shaped artifact node. Leaves carry content, folders carry children.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CodeStructBlock {
    File {
        filename: String,
        language: String,
        content: String,
    },
    Folder {
        filename: String,
        children: Vec<CodeStructBlock>,
    },
}

impl CodeStructBlock {
    pub fn file(
        filename: impl Into<String>,
        language: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        CodeStructBlock::File {
            filename: filename.into(),
            language: language.into(),
            content: content.into(),
        }
    }

    pub fn folder(filename: impl Into<String>, children: Vec<CodeStructBlock>) -> Self {
        CodeStructBlock::Folder {
            filename: filename.into(),
            children,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CodeStructBlock::File { filename, .. } | CodeStructBlock::Folder { filename, .. } => {
                filename
            }
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, CodeStructBlock::Folder { .. })
    }
}

/// A leaf seen through a flattening traversal, with its full path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry<'a> {
    pub path: String,
    pub language: &'a str,
    pub content: &'a str,
}
