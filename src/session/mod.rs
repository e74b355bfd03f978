//! Conversation state and the request lifecycle.
//!
//! Every request gets a `RequestTicket`. Starting a new request supersedes the
//! one in flight: its assistant message keeps whatever text already arrived
//! and later chunks, completions or failures for the old ticket are ignored.

use crate::api::config::CONTEXT_HEADER;
use crate::api::errors::BackendError;
use crate::artifacts::{run, FileEdit, Workspace};
use crate::models::{ChatMessage, MessageStatus, Role};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Handle for one in-flight request, keyed by its assistant message id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    message_id: u64,
}

impl RequestTicket {
    pub fn message_id(&self) -> u64 {
        self.message_id
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    next_id: u64,
    #[serde(skip)]
    in_flight: Option<RequestTicket>,
    #[serde(default)]
    pinned_version: Option<String>,
    #[serde(default)]
    edits: Vec<FileEdit>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn message(&self, id: u64) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn in_flight(&self) -> Option<RequestTicket> {
        self.in_flight
    }

    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.in_flight.as_ref() == Some(ticket)
    }

    /// Records the user's prompt and an empty streaming assistant reply.
    pub fn begin_request(&mut self, prompt: &str) -> RequestTicket {
        if let Some(previous) = self.in_flight.take() {
            if let Some(message) = self.message_mut(previous.message_id) {
                if message.status == MessageStatus::Streaming {
                    message.status = MessageStatus::Superseded;
                    log::warn!("request for message {} superseded", previous.message_id);
                }
            }
        }

        self.push(Role::User, prompt, MessageStatus::Complete);
        let message_id = self.push(Role::Assistant, "", MessageStatus::Streaming);

        let ticket = RequestTicket { message_id };
        self.in_flight = Some(ticket);
        ticket
    }

    /// Appends streamed text. Returns `false` for stale tickets.
    pub fn apply_chunk(&mut self, ticket: &RequestTicket, chunk: &str) -> bool {
        match self.current_message(ticket) {
            Some(message) => {
                message.content.push_str(chunk);
                true
            }
            None => false,
        }
    }

    /// Drops text received so far, before a retry.
    pub fn reset_reply(&mut self, ticket: &RequestTicket) -> bool {
        match self.current_message(ticket) {
            Some(message) => {
                message.content.clear();
                true
            }
            None => false,
        }
    }

    pub fn complete(&mut self, ticket: &RequestTicket) -> bool {
        let Some(message) = self.current_message(ticket) else {
            return false;
        };
        message.status = MessageStatus::Complete;
        message.timestamp = Utc::now();
        self.in_flight = None;
        true
    }

    /// Replaces the reply with a readable description of `error`.
    pub fn fail(&mut self, ticket: &RequestTicket, error: &BackendError) -> bool {
        let Some(message) = self.current_message(ticket) else {
            return false;
        };
        log::error!("request for message {} failed: {}", ticket.message_id, error);
        message.content = error.user_message();
        message.status = MessageStatus::Failed;
        message.timestamp = Utc::now();
        self.in_flight = None;
        true
    }

    /// Marks replies left streaming by an interrupted run as superseded.
    pub fn recover_interrupted(&mut self) -> usize {
        let mut recovered = 0;
        for message in &mut self.messages {
            if message.status == MessageStatus::Streaming {
                message.status = MessageStatus::Superseded;
                recovered += 1;
            }
        }
        self.in_flight = None;
        recovered
    }

    pub fn pinned_version(&self) -> Option<&str> {
        self.pinned_version.as_deref()
    }

    pub fn pin_version(&mut self, id: Option<String>) {
        self.pinned_version = id;
    }

    pub fn edits(&self) -> &[FileEdit] {
        &self.edits
    }

    /// Saves an edit; a later edit of the same file on the same version
    /// replaces the earlier one.
    pub fn record_edit(&mut self, edit: FileEdit) {
        self.edits
            .retain(|e| !(e.version_id == edit.version_id && e.path == edit.path));
        self.edits.push(edit);
    }

    /// Re-derives the artifacts, replays saved edits and restores the pin.
    pub fn workspace(&self) -> Workspace {
        let mut workspace = Workspace::new(run(&self.messages));
        let applied = workspace.replay(&self.edits);
        if applied < self.edits.len() {
            log::debug!("{} saved edit(s) no longer apply", self.edits.len() - applied);
        }
        if let Some(id) = &self.pinned_version {
            if !workspace.select(id) {
                log::debug!("pinned version {} no longer exists", id);
            }
        }
        workspace
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn push(&mut self, role: Role, content: &str, status: MessageStatus) -> u64 {
        self.next_id += 1;
        self.messages.push(ChatMessage {
            id: self.next_id,
            role,
            content: content.to_string(),
            status,
            timestamp: Utc::now(),
        });
        self.next_id
    }

    fn message_mut(&mut self, id: u64) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    fn current_message(&mut self, ticket: &RequestTicket) -> Option<&mut ChatMessage> {
        if !self.is_current(ticket) {
            log::debug!("ignoring stale ticket for message {}", ticket.message_id);
            return None;
        }
        self.message_mut(ticket.message_id)
    }
}

/// Builds the text sent to the backend: optional instructions, the message,
/// then the selected files under a context header.
pub fn compose_prompt(system_prompt: &str, message: &str, context: &str) -> String {
    let mut prompt = String::new();
    if !system_prompt.trim().is_empty() {
        prompt.push_str(system_prompt.trim());
        prompt.push_str("\n\n");
    }
    prompt.push_str(message);
    if !context.trim().is_empty() {
        prompt.push_str(&format!("\n\n{}\n{}", CONTEXT_HEADER, context));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_accumulate_until_complete() {
        let mut session = ChatSession::new();
        let ticket = session.begin_request("build a todo app");

        assert!(session.apply_chunk(&ticket, "```ts a.ts\n"));
        assert!(session.apply_chunk(&ticket, "let a = 1;\n```"));
        assert!(session.complete(&ticket));

        let reply = session.message(ticket.message_id()).unwrap();
        assert_eq!(reply.content, "```ts a.ts\nlet a = 1;\n```");
        assert_eq!(reply.status, MessageStatus::Complete);
        assert!(session.in_flight().is_none());
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn new_request_supersedes_the_one_in_flight() {
        let mut session = ChatSession::new();
        let first = session.begin_request("first");
        session.apply_chunk(&first, "partial");

        let second = session.begin_request("second");

        assert!(!session.apply_chunk(&first, " late"));
        assert!(!session.reset_reply(&first));
        assert!(!session.complete(&first));
        assert!(!session.fail(&first, &BackendError::EmptyResponse));

        let old = session.message(first.message_id()).unwrap();
        assert_eq!(old.content, "partial");
        assert_eq!(old.status, MessageStatus::Superseded);
        assert!(session.is_current(&second));
    }

    #[test]
    fn failure_becomes_a_readable_reply() {
        let mut session = ChatSession::new();
        let ticket = session.begin_request("hello");

        assert!(session.fail(&ticket, &BackendError::MissingApiKey));

        let reply = session.message(ticket.message_id()).unwrap();
        assert_eq!(reply.status, MessageStatus::Failed);
        assert_eq!(reply.content, BackendError::MissingApiKey.user_message());
    }

    #[test]
    fn edits_survive_a_round_trip_through_the_workspace() {
        let mut session = ChatSession::new();
        let ticket = session.begin_request("make it");
        session.apply_chunk(&ticket, "```ts src/a.ts\nlet a = 1;\n```");
        session.complete(&ticket);

        let version_id = session.workspace().active().unwrap().id.clone();
        session.record_edit(FileEdit {
            version_id: version_id.clone(),
            path: "src/a.ts".to_string(),
            content: "let a = 2;".to_string(),
        });
        session.record_edit(FileEdit {
            version_id,
            path: "src/a.ts".to_string(),
            content: "let a = 3;".to_string(),
        });

        assert_eq!(session.edits().len(), 1);
        let workspace = session.workspace();
        let files = crate::artifacts::all_files(workspace.working_tree());
        assert_eq!(files[0].content, "let a = 3;");
    }

    #[test]
    fn interrupted_replies_are_recovered_after_reload() {
        let mut session = ChatSession::new();
        session.begin_request("hello");

        let json = serde_json::to_string(&session).unwrap();
        let mut restored: ChatSession = serde_json::from_str(&json).unwrap();

        assert!(restored.in_flight().is_none());
        assert_eq!(restored.recover_interrupted(), 1);
        assert_eq!(restored.messages()[1].status, MessageStatus::Superseded);
    }

    #[test]
    fn composes_prompt_with_context() {
        assert_eq!(compose_prompt("", "hi", ""), "hi");
        assert_eq!(
            compose_prompt("Be brief.", "hi", "--- a.txt ---\nx"),
            "Be brief.\n\nhi\n\nContext (selected files):\n--- a.txt ---\nx"
        );
    }
}
