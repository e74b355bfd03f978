use crate::artifacts::extractor::extract_blocks;
use crate::artifacts::merge::update_file;
use crate::artifacts::reasoning::strip_reasoning;
use crate::artifacts::structure::parse_structure;
use crate::artifacts::transformer::transform;
use crate::artifacts::versions::VersionHistory;
use crate::models::{ChatMessage, CodeStructBlock, MessageStatus, TreeNode, Version};
use serde::{Deserialize, Serialize};

/// Everything the presentation layer reads: the latest structure and the
/// version history.
#[derive(Debug, Clone)]
pub struct ArtifactState {
    pub structure: Vec<TreeNode>,
    /// `false` while `structure` is the built-in placeholder.
    pub has_structure: bool,
    pub history: VersionHistory,
}

/// Runs the whole response-to-artifact pipeline over a conversation.
///
/// Pure and cheap enough to repeat on every streamed chunk: partial fences
/// and trees just yield fewer nodes.
pub fn run(messages: &[ChatMessage]) -> ArtifactState {
    let mut structure = Vec::new();
    let mut history = VersionHistory::new();

    for (index, message) in messages.iter().enumerate() {
        if !message.is_assistant() || message.status == MessageStatus::Failed {
            continue;
        }

        let text = strip_reasoning(&message.content);
        if text.trim().is_empty() {
            continue;
        }

        let parsed = parse_structure(&text);
        if !parsed.is_empty() {
            structure = parsed;
        }

        let blocks = extract_blocks(&text);
        if blocks.is_empty() {
            continue;
        }
        let tree = transform(&blocks);
        history.record(index, &tree, message.timestamp);
    }

    let has_structure = !structure.is_empty();
    if !has_structure {
        structure = TreeNode::placeholder();
    }

    ArtifactState {
        structure,
        has_structure,
        history,
    }
}

/// A saved in-place edit, replayed after the versions are rebuilt.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileEdit {
    pub version_id: String,
    pub path: String,
    pub content: String,
}

/// The active snapshot plus an editable working copy of its tree.
///
/// Edits stay in the working copy until `write_back` replaces the active
/// snapshot with it; other versions never see them.
#[derive(Debug, Clone)]
pub struct Workspace {
    state: ArtifactState,
    working: Vec<CodeStructBlock>,
}

impl Workspace {
    pub fn new(state: ArtifactState) -> Self {
        let working = state
            .history
            .active()
            .map(|v| v.code_blocks.clone())
            .unwrap_or_default();
        Self { state, working }
    }

    pub fn state(&self) -> &ArtifactState {
        &self.state
    }

    pub fn structure(&self) -> &[TreeNode] {
        &self.state.structure
    }

    pub fn versions(&self) -> &[Version] {
        self.state.history.list()
    }

    pub fn active(&self) -> Option<&Version> {
        self.state.history.active()
    }

    pub fn lookup(&self, key: &str) -> Option<&Version> {
        self.state.history.lookup(key)
    }

    pub fn working_tree(&self) -> &[CodeStructBlock] {
        &self.working
    }

    /// Switches versions, discarding edits that were not written back.
    pub fn select(&mut self, key: &str) -> bool {
        if !self.state.history.select(key) {
            return false;
        }
        self.reset_working();
        true
    }

    pub fn follow_latest(&mut self) {
        self.state.history.follow_latest();
        self.reset_working();
    }

    pub fn edit(&mut self, path: &str, content: &str) -> bool {
        update_file(&mut self.working, path, content)
    }

    pub fn write_back(&mut self) -> bool {
        self.state.history.write_back_active(&self.working)
    }

    /// Re-applies saved edits to the versions they were made on. Edits whose
    /// version or file no longer exists are skipped.
    pub fn replay(&mut self, edits: &[FileEdit]) -> usize {
        let selected = self.state.history.active_id().map(str::to_string);
        let following = self.state.history.active_id() == self.state.history.latest().map(|v| v.id.as_str());
        let mut applied = 0;

        for edit in edits {
            if !self.state.history.select(&edit.version_id) {
                continue;
            }
            self.reset_working();
            if self.edit(&edit.path, &edit.content) && self.write_back() {
                applied += 1;
            }
        }

        match selected {
            Some(id) if !following => {
                self.state.history.select(&id);
            }
            _ => self.state.history.follow_latest(),
        }
        self.reset_working();
        applied
    }

    fn reset_working(&mut self) {
        self.working = self
            .state
            .history
            .active()
            .map(|v| v.code_blocks.clone())
            .unwrap_or_default();
    }
}
