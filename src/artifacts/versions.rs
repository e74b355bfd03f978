use crate::artifacts::merge::merge;
use crate::models::{CodeStructBlock, Version};
use chrono::{DateTime, Utc};

/// Append-only sequence of artifact snapshots with an active pointer.
#[derive(Debug, Clone, Default)]
pub struct VersionHistory {
    versions: Vec<Version>,
    /// Pinned version; `None` follows the newest one.
    pinned: Option<usize>,
}

impl VersionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `incoming` over the newest snapshot and appends the result.
    pub fn record(
        &mut self,
        message_index: usize,
        incoming: &[CodeStructBlock],
        timestamp: DateTime<Utc>,
    ) -> &Version {
        let base = self
            .versions
            .last()
            .map(|v| v.code_blocks.as_slice())
            .unwrap_or(&[]);
        let code_blocks = merge(base, incoming);
        let number = self.versions.len() + 1;

        self.versions.push(Version {
            id: format!("v{}-m{}", number, message_index),
            name: format!("Version {}", number),
            message_index,
            code_blocks,
            timestamp,
        });
        log::debug!("recorded version {} for message {}", number, message_index);

        &self.versions[number - 1]
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn list(&self) -> &[Version] {
        &self.versions
    }

    pub fn latest(&self) -> Option<&Version> {
        self.versions.last()
    }

    pub fn get(&self, id: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.id == id)
    }

    /// Resolves a version by id, by `Version k` number, or by 1-based index.
    pub fn lookup(&self, key: &str) -> Option<&Version> {
        if let Some(version) = self.get(key) {
            return Some(version);
        }
        let number: usize = key
            .trim()
            .trim_start_matches(|c: char| c == 'v' || c == 'V')
            .parse()
            .ok()?;
        number.checked_sub(1).and_then(|i| self.versions.get(i))
    }

    pub fn active(&self) -> Option<&Version> {
        match self.pinned {
            Some(index) => self.versions.get(index),
            None => self.latest(),
        }
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active().map(|v| v.id.as_str())
    }

    /// Switches the displayed snapshot. Returns `false` for unknown ids.
    pub fn select(&mut self, key: &str) -> bool {
        let Some(id) = self.lookup(key).map(|v| v.id.clone()) else {
            return false;
        };
        let index = self.versions.iter().position(|v| v.id == id);
        // Selecting the newest version goes back to following new ones.
        self.pinned = index.filter(|&i| i + 1 < self.versions.len());
        true
    }

    pub fn follow_latest(&mut self) {
        self.pinned = None;
    }

    /// Replaces the active snapshot's tree with `tree`.
    pub(crate) fn write_back_active(&mut self, tree: &[CodeStructBlock]) -> bool {
        let index = match self.pinned {
            Some(index) => index,
            None if !self.versions.is_empty() => self.versions.len() - 1,
            None => return false,
        };
        match self.versions.get_mut(index) {
            Some(version) => {
                version.code_blocks = tree.to_vec();
                true
            }
            None => false,
        }
    }
}
