pub mod display;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label shown in the transcript panel
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    /// Display name; empty means the title is derived from linked documents
    #[serde(default)]
    pub name: String,
    /// Ids of linked documents (file names in the documents directory).
    /// Entries may dangle if the file was removed; they are kept so a
    /// restored document re-attaches without any bookkeeping.
    #[serde(default)]
    pub document_ids: Vec<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            document_ids: Vec::new(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message and bump the update timestamp
    pub fn push_message(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
        self.touch();
    }

    /// Link a document by id. Returns false if it was already linked.
    pub fn link_document(&mut self, document_id: &str) -> bool {
        if self.is_linked(document_id) {
            return false;
        }
        self.document_ids.push(document_id.to_string());
        self.touch();
        true
    }

    /// Unlink a document by id. Returns false if it was not linked.
    pub fn unlink_document(&mut self, document_id: &str) -> bool {
        let before = self.document_ids.len();
        self.document_ids.retain(|id| id != document_id);
        if self.document_ids.len() == before {
            return false;
        }
        self.touch();
        true
    }

    pub fn is_linked(&self, document_id: &str) -> bool {
        self.document_ids.iter().any(|id| id == document_id)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
