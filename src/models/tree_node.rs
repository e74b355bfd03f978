use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

/// Structural project-tree entry parsed from prose. Carries no file content.
///
/// Only folders own a `children` collection; files always have `None`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub expanded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl TreeNode {
    pub fn file(name: impl Into<String>, depth: usize, comment: Option<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::File,
            expanded: depth <= 1,
            children: None,
            comment,
        }
    }

    pub fn folder(name: impl Into<String>, depth: usize, comment: Option<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Folder,
            expanded: depth <= 1,
            children: Some(Vec::new()),
            comment,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    pub fn children(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Finds a direct child by name.
    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children().iter().find(|c| c.name == name)
    }

    /// Placeholder shown when no message has produced a structure yet.
    pub fn placeholder() -> Vec<TreeNode> {
        let mut root = TreeNode::folder("project", 0, None);
        if let Some(children) = root.children.as_mut() {
            children.push(TreeNode::file(
                "README.md",
                1,
                Some("waiting for a project structure".to_string()),
            ));
        }
        vec![root]
    }
}
