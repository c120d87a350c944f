use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use std::path::PathBuf;
use std::time::Instant;

use crate::chat::display;
use crate::chat::store::ChatStore;
use crate::chat::{Conversation, Role};
use crate::config::AppConfig;
use crate::docs::DocumentLibrary;

/// How often the documents directory is rescanned while the app runs
const DOCS_RESCAN_SECONDS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Chats,
    Documents,
    Compose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    NamePrompt,
    Help,
    Confirm,
}

/// What the name prompt edits when accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAction {
    Create,
    Rename,
}

pub struct App {
    pub section: Section,
    pub popup: Popup,

    // Conversation list (sidebar)
    pub conversations: Vec<Conversation>,
    pub selected_chat: usize,
    /// Conversation shown in the transcript panel, by id
    pub open_id: Option<String>,

    // Document library (lower sidebar box)
    pub documents: DocumentLibrary,
    pub selected_doc: usize,
    pub documents_dir: PathBuf,

    // Persistence
    pub store: ChatStore,
    pub config: AppConfig,

    // Input buffers
    pub input_buffer: String,
    pub prompt_action: PromptAction,
    pub compose_buffer: String,

    // Status message (shown in info line, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,

    // Info line content
    pub info_message: Option<String>,

    // Id stashed while the delete confirmation popup is up
    pub pending_delete: Option<String>,

    // Periodic documents rescan
    pub last_docs_scan: Instant,
}

impl App {
    pub async fn new(store: ChatStore, config: AppConfig, documents_dir: PathBuf) -> Result<Self> {
        let conversations = store.list().await.unwrap_or_default();
        let documents = DocumentLibrary::scan(&documents_dir);

        let mut app = Self {
            section: Section::Chats,
            popup: Popup::None,

            conversations,
            selected_chat: 0,
            open_id: None,

            documents,
            selected_doc: 0,
            documents_dir,

            store,
            config,

            input_buffer: String::new(),
            prompt_action: PromptAction::Create,
            compose_buffer: String::new(),

            status_message: None,
            status_message_time: None,
            info_message: None,

            pending_delete: None,

            last_docs_scan: Instant::now(),
        };

        // Reopen the conversation that was open when the app last exited
        if app.config.reopen_last {
            if let Some(ref last) = app.config.last_opened {
                if let Some(index) = app.conversations.iter().position(|c| &c.id == last) {
                    tracing::info!("Reopening last conversation: {}", last);
                    app.open_id = Some(last.clone());
                    app.selected_chat = index;
                }
            }
        }

        Ok(app)
    }

    /// Set a status message (auto-clears after 3 seconds)
    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    fn open_index(&self) -> Option<usize> {
        let id = self.open_id.as_deref()?;
        self.conversations.iter().position(|c| c.id == id)
    }

    /// The conversation currently open in the transcript panel
    pub fn open_conversation(&self) -> Option<&Conversation> {
        self.open_index().map(|index| &self.conversations[index])
    }

    /// True while keystrokes land in a text buffer (name prompt or the
    /// compose line), so the caller must not treat letters as commands
    pub fn in_text_entry(&self) -> bool {
        self.popup == Popup::NamePrompt
            || (self.popup == Popup::None && self.section == Section::Compose)
    }

    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Handle popups first
        if self.popup != Popup::None {
            return self.handle_popup_key(key).await;
        }

        self.handle_normal_key(key).await
    }

    async fn handle_normal_key(&mut self, key: KeyEvent) -> Result<()> {
        // Section cycling works everywhere, including while composing
        match key.code {
            KeyCode::Tab => {
                self.section = match self.section {
                    Section::Chats => Section::Documents,
                    Section::Documents => Section::Compose,
                    Section::Compose => Section::Chats,
                };
                return Ok(());
            }
            KeyCode::BackTab => {
                self.section = match self.section {
                    Section::Chats => Section::Compose,
                    Section::Documents => Section::Chats,
                    Section::Compose => Section::Documents,
                };
                return Ok(());
            }
            _ => {}
        }

        // Compose owns the rest of the keyboard so messages can use any letter
        if self.section == Section::Compose {
            return self.handle_compose_key(key).await;
        }

        match key.code {
            // Vertical navigation
            KeyCode::Char('j') | KeyCode::Down => self.move_down(),
            KeyCode::Char('k') | KeyCode::Up => self.move_up(),

            // Open the highlighted conversation in the transcript panel
            KeyCode::Enter => {
                if self.section == Section::Chats {
                    self.open_selected();
                }
            }

            // Link/unlink the highlighted document to the open conversation
            KeyCode::Char(' ') => {
                if self.section == Section::Documents {
                    self.toggle_document_link().await?;
                }
            }

            // New chat (empty name allowed, the title is derived then)
            KeyCode::Char('n') => self.start_name_prompt(PromptAction::Create),

            // Rename the selected chat
            KeyCode::Char('r') => {
                if self.section == Section::Chats {
                    self.start_name_prompt(PromptAction::Rename);
                }
            }

            // Delete with confirmation
            KeyCode::Char('d') | KeyCode::Delete | KeyCode::Backspace => {
                self.delete_selection();
            }

            // Reload both lists from disk
            KeyCode::Char('R') => self.refresh().await?,

            // Help (? or h)
            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,

            _ => {}
        }
        Ok(())
    }

    async fn handle_popup_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.popup {
            Popup::NamePrompt => self.handle_name_prompt_key(key).await,
            Popup::Help => {
                if matches!(
                    key.code,
                    KeyCode::Esc
                        | KeyCode::Char('?')
                        | KeyCode::Char('h')
                        | KeyCode::Enter
                        | KeyCode::Char('q')
                ) {
                    self.popup = Popup::None;
                }
                Ok(())
            }
            Popup::Confirm => {
                match key.code {
                    KeyCode::Char('y') | KeyCode::Enter => {
                        self.confirm_action().await?;
                        self.popup = Popup::None;
                    }
                    KeyCode::Char('n') | KeyCode::Esc => {
                        self.pending_delete = None;
                        self.popup = Popup::None;
                    }
                    _ => {}
                }
                Ok(())
            }
            Popup::None => Ok(()),
        }
    }

    async fn handle_name_prompt_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.popup = Popup::None;
                self.input_buffer.clear();
            }
            KeyCode::Enter => match self.prompt_action {
                PromptAction::Create => self.create_chat().await?,
                PromptAction::Rename => self.rename_chat().await?,
            },
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            // Chat names are free text, unlike the ids that back them
            KeyCode::Char(c) => self.input_buffer.push(c),
            _ => {}
        }
        Ok(())
    }

    async fn handle_compose_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Enter => self.send_message().await?,
            KeyCode::Backspace => {
                self.compose_buffer.pop();
            }
            KeyCode::Esc => self.section = Section::Chats,
            KeyCode::Char(c) => self.compose_buffer.push(c),
            _ => {}
        }
        Ok(())
    }

    fn move_down(&mut self) {
        match self.section {
            Section::Chats => {
                if !self.conversations.is_empty() {
                    self.selected_chat = (self.selected_chat + 1) % self.conversations.len();
                }
            }
            Section::Documents => {
                if !self.documents.is_empty() {
                    self.selected_doc = (self.selected_doc + 1) % self.documents.len();
                }
            }
            Section::Compose => {}
        }
    }

    fn move_up(&mut self) {
        match self.section {
            Section::Chats => {
                if !self.conversations.is_empty() {
                    self.selected_chat = self
                        .selected_chat
                        .checked_sub(1)
                        .unwrap_or(self.conversations.len() - 1);
                }
            }
            Section::Documents => {
                if !self.documents.is_empty() {
                    self.selected_doc = self
                        .selected_doc
                        .checked_sub(1)
                        .unwrap_or(self.documents.len() - 1);
                }
            }
            Section::Compose => {}
        }
    }

    fn open_selected(&mut self) {
        let Some(conversation) = self.conversations.get(self.selected_chat) else {
            return;
        };
        let title = display::display_title(conversation, &self.documents);
        let id = conversation.id.clone();

        self.open_id = Some(id.clone());
        self.config.last_opened = Some(id);
        let _ = self.config.save();
        self.set_status(format!("Opened '{}'", title));
    }

    /// Start the name prompt. For renames the buffer is pre-filled with
    /// the current name so small edits stay small.
    fn start_name_prompt(&mut self, action: PromptAction) {
        match action {
            PromptAction::Create => self.input_buffer.clear(),
            PromptAction::Rename => {
                let Some(conversation) = self.conversations.get(self.selected_chat) else {
                    return;
                };
                self.input_buffer = conversation.name.clone();
            }
        }
        self.prompt_action = action;
        self.popup = Popup::NamePrompt;
    }

    async fn create_chat(&mut self) -> Result<()> {
        let name = self.input_buffer.trim().to_string();

        match self.store.create(&name).await {
            Ok(conversation) => {
                let title = display::display_title(&conversation, &self.documents);
                self.open_id = Some(conversation.id.clone());
                self.config.last_opened = Some(conversation.id.clone());
                let _ = self.config.save();

                // A fresh conversation carries the newest update timestamp,
                // so the top of the sidebar is its spot
                self.conversations.insert(0, conversation);
                self.selected_chat = 0;

                self.popup = Popup::None;
                self.input_buffer.clear();
                self.set_status(format!("Started '{}'", title));
            }
            Err(e) => {
                // Keep the prompt open so the typed name is not lost
                self.set_status(format!("Create failed: {}", e));
            }
        }
        Ok(())
    }

    async fn rename_chat(&mut self) -> Result<()> {
        if self.selected_chat >= self.conversations.len() {
            self.popup = Popup::None;
            return Ok(());
        }

        let name = self.input_buffer.trim().to_string();
        let previous = self.conversations[self.selected_chat].clone();
        self.conversations[self.selected_chat].set_name(name);

        match self.store.save(&self.conversations[self.selected_chat]).await {
            Ok(()) => {
                let title =
                    display::display_title(&self.conversations[self.selected_chat], &self.documents);
                self.popup = Popup::None;
                self.input_buffer.clear();
                self.set_status(format!("Renamed to '{}'", title));
                self.resort_conversations();
            }
            Err(e) => {
                self.conversations[self.selected_chat] = previous;
                self.set_status(format!("Rename failed: {}", e));
            }
        }
        Ok(())
    }

    fn delete_selection(&mut self) {
        if self.section != Section::Chats {
            return;
        }
        let Some(conversation) = self.conversations.get(self.selected_chat) else {
            return;
        };
        let title = display::display_title(conversation, &self.documents);
        let id = conversation.id.clone();

        self.pending_delete = Some(id);
        self.set_status(format!("Delete '{}'? (y/n)", title));
        self.popup = Popup::Confirm;
    }

    async fn confirm_action(&mut self) -> Result<()> {
        let Some(id) = self.pending_delete.take() else {
            return Ok(());
        };

        match self.store.delete(&id).await {
            Ok(()) => {
                let title = self
                    .conversations
                    .iter()
                    .find(|c| c.id == id)
                    .map(|c| display::display_title(c, &self.documents))
                    .unwrap_or_else(|| id.clone());
                self.conversations.retain(|c| c.id != id);

                // Deleting the open conversation closes it
                if self.open_id.as_deref() == Some(id.as_str()) {
                    self.open_id = None;
                    self.compose_buffer.clear();
                    if self.config.last_opened.as_deref() == Some(id.as_str()) {
                        self.config.last_opened = None;
                        let _ = self.config.save();
                    }
                }

                // Adjust selection if needed
                if self.selected_chat >= self.conversations.len() {
                    self.selected_chat = self.conversations.len().saturating_sub(1);
                }
                self.set_status(format!("Deleted '{}'", title));
            }
            Err(e) => {
                self.set_status(format!("Delete failed: {}", e));
            }
        }
        Ok(())
    }

    /// Space in the Documents section: link the highlighted document to
    /// the open conversation, or unlink it if already linked.
    async fn toggle_document_link(&mut self) -> Result<()> {
        let Some(document) = self.documents.documents().get(self.selected_doc) else {
            return Ok(());
        };
        let doc_id = document.id.clone();
        let doc_name = document.name.clone();

        let Some(index) = self.open_index() else {
            self.set_status("Open a chat first (Enter in Chats)");
            return Ok(());
        };

        let previous = self.conversations[index].clone();
        let linked = self.conversations[index].link_document(&doc_id);
        if !linked {
            self.conversations[index].unlink_document(&doc_id);
        }

        match self.store.save(&self.conversations[index]).await {
            Ok(()) => {
                self.set_status(if linked {
                    format!("Linked '{}'", doc_name)
                } else {
                    format!("Unlinked '{}'", doc_name)
                });
                self.resort_conversations();
            }
            Err(e) => {
                self.conversations[index] = previous;
                self.set_status(format!("Save failed: {}", e));
            }
        }
        Ok(())
    }

    async fn send_message(&mut self) -> Result<()> {
        let content = self.compose_buffer.trim().to_string();
        if content.is_empty() {
            return Ok(());
        }

        let Some(index) = self.open_index() else {
            self.set_status("Open a chat first (Enter in Chats)");
            return Ok(());
        };

        let previous = self.conversations[index].clone();
        self.conversations[index].push_message(Role::User, content);

        match self.store.save(&self.conversations[index]).await {
            Ok(()) => {
                self.compose_buffer.clear();
                self.resort_conversations();
            }
            Err(e) => {
                // Keep the draft so the text is not lost
                self.conversations[index] = previous;
                self.set_status(format!("Save failed: {}", e));
            }
        }
        Ok(())
    }

    async fn refresh(&mut self) -> Result<()> {
        self.conversations = self.store.list().await.unwrap_or_default();
        self.documents = DocumentLibrary::scan(&self.documents_dir);

        if self.selected_chat >= self.conversations.len() {
            self.selected_chat = self.conversations.len().saturating_sub(1);
        }
        if self.selected_doc >= self.documents.len() {
            self.selected_doc = self.documents.len().saturating_sub(1);
        }
        Ok(())
    }

    /// Re-sort newest update first and keep the cursor on the same
    /// conversation while rows move around it
    fn resort_conversations(&mut self) {
        let followed = self.conversations.get(self.selected_chat).map(|c| c.id.clone());
        self.conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        if let Some(id) = followed {
            if let Some(index) = self.conversations.iter().position(|c| c.id == id) {
                self.selected_chat = index;
            }
        }
    }

    pub async fn tick(&mut self) -> Result<()> {
        // Clear status message after 3 seconds
        if let Some(time) = self.status_message_time {
            if time.elapsed().as_secs() >= 3 {
                self.status_message = None;
                self.status_message_time = None;
            }
        }

        // Rescan the documents directory so files added or removed while
        // the app runs (and the dangling links they cause) show up
        if self.last_docs_scan.elapsed().as_secs() >= DOCS_RESCAN_SECONDS {
            self.documents = DocumentLibrary::scan(&self.documents_dir);
            if self.selected_doc >= self.documents.len() {
                self.selected_doc = self.documents.len().saturating_sub(1);
            }
            self.last_docs_scan = Instant::now();
        }

        self.update_info_message();
        Ok(())
    }

    /// Update the info line: the open conversation's vitals, or an
    /// overview of both lists when nothing is open
    fn update_info_message(&mut self) {
        let message = if let Some(conversation) = self.open_conversation() {
            let title = display::display_title(conversation, &self.documents);
            let live = conversation
                .document_ids
                .iter()
                .filter(|id| self.documents.get(id).is_some())
                .count();
            let dangling = conversation.document_ids.len() - live;

            let mut parts = vec![title, format!("{} messages", conversation.messages.len())];
            if live > 0 {
                parts.push(format!("󰈔 {}", live));
            }
            if dangling > 0 {
                parts.push(format!("⚠ {} missing", dangling));
            }
            parts.join(" │ ")
        } else {
            format!(
                "{} conversations │ 󰈔 {} in {}",
                self.conversations.len(),
                self.documents.len(),
                self.documents_dir.display()
            )
        };
        self.info_message = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use std::path::Path;

    async fn test_app() -> (tempfile::TempDir, App) {
        let tmp = tempfile::tempdir().unwrap();
        let store = ChatStore::open(tmp.path().join("conversations")).await.unwrap();
        let docs_dir = tmp.path().join("docs");
        std::fs::create_dir_all(&docs_dir).unwrap();
        let app = App::new(store, AppConfig::default(), docs_dir).await.unwrap();
        (tmp, app)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::empty())
    }

    fn conversation_path(tmp: &Path, id: &str) -> PathBuf {
        tmp.join("conversations").join(format!("{}.json", id))
    }

    // Replace the store directory with a plain file so every write fails
    fn break_store_dir(tmp: &Path) {
        let dir = tmp.join("conversations");
        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::write(&dir, "in the way").unwrap();
    }

    #[tokio::test]
    async fn test_tab_cycles_sections() {
        let (_tmp, mut app) = test_app().await;
        assert_eq!(app.section, Section::Chats);

        app.handle_key(key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.section, Section::Documents);
        app.handle_key(key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.section, Section::Compose);

        // Tab still cycles while the compose line captures text
        app.handle_key(key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.section, Section::Chats);

        app.handle_key(key(KeyCode::BackTab)).await.unwrap();
        assert_eq!(app.section, Section::Compose);
    }

    #[tokio::test]
    async fn test_navigation_wraps_and_empty_list_noops() {
        let (_tmp, mut app) = test_app().await;

        // Empty list: navigation must not move or panic
        app.handle_key(key(KeyCode::Char('j'))).await.unwrap();
        assert_eq!(app.selected_chat, 0);

        for name in ["a", "b", "c"] {
            app.store.create(name).await.unwrap();
        }
        app.refresh().await.unwrap();

        app.handle_key(key(KeyCode::Char('k'))).await.unwrap();
        assert_eq!(app.selected_chat, 2);
        app.handle_key(key(KeyCode::Char('j'))).await.unwrap();
        assert_eq!(app.selected_chat, 0);
        app.handle_key(key(KeyCode::Down)).await.unwrap();
        assert_eq!(app.selected_chat, 1);
    }

    #[tokio::test]
    async fn test_delete_confirm_flow_removes_and_clamps() {
        let (_tmp, mut app) = test_app().await;
        app.store.create("first").await.unwrap();
        app.store.create("second").await.unwrap();
        app.refresh().await.unwrap();

        // Delete the bottom entry so the selection has to be clamped
        app.selected_chat = 1;
        app.handle_key(key(KeyCode::Char('d'))).await.unwrap();
        assert_eq!(app.popup, Popup::Confirm);

        app.handle_key(key(KeyCode::Char('y'))).await.unwrap();
        assert_eq!(app.popup, Popup::None);
        assert_eq!(app.conversations.len(), 1);
        assert_eq!(app.selected_chat, 0);
        assert_eq!(app.store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_cancel_keeps_everything() {
        let (_tmp, mut app) = test_app().await;
        app.store.create("survivor").await.unwrap();
        app.refresh().await.unwrap();

        app.handle_key(key(KeyCode::Char('d'))).await.unwrap();
        assert_eq!(app.popup, Popup::Confirm);

        app.handle_key(key(KeyCode::Char('n'))).await.unwrap();
        assert_eq!(app.popup, Popup::None);
        assert!(app.pending_delete.is_none());
        assert_eq!(app.conversations.len(), 1);
        assert_eq!(app.store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deleting_open_chat_closes_it() {
        let (_tmp, mut app) = test_app().await;
        let conversation = app.store.create("open me").await.unwrap();
        app.refresh().await.unwrap();
        app.open_id = Some(conversation.id.clone());
        app.compose_buffer = "draft".to_string();

        app.handle_key(key(KeyCode::Char('d'))).await.unwrap();
        app.handle_key(key(KeyCode::Enter)).await.unwrap();

        assert!(app.open_id.is_none());
        assert!(app.open_conversation().is_none());
        assert!(app.compose_buffer.is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_leaves_list_untouched() {
        let (tmp, mut app) = test_app().await;
        let conversation = app.store.create("ghost").await.unwrap();
        app.refresh().await.unwrap();

        // Remove the file behind the store's back so the delete fails
        std::fs::remove_file(conversation_path(tmp.path(), &conversation.id)).unwrap();

        app.handle_key(key(KeyCode::Char('d'))).await.unwrap();
        app.handle_key(key(KeyCode::Char('y'))).await.unwrap();

        assert_eq!(app.conversations.len(), 1);
        assert!(app.status_message.as_deref().unwrap().contains("Delete failed"));
    }

    #[tokio::test]
    async fn test_create_failure_keeps_prompt_and_creates_nothing() {
        let (tmp, mut app) = test_app().await;
        break_store_dir(tmp.path());

        app.handle_key(key(KeyCode::Char('n'))).await.unwrap();
        for c in "meeting notes".chars() {
            app.handle_key(key(KeyCode::Char(c))).await.unwrap();
        }
        app.handle_key(key(KeyCode::Enter)).await.unwrap();

        // The prompt stays up with the typed name; nothing was created
        assert_eq!(app.popup, Popup::NamePrompt);
        assert_eq!(app.input_buffer, "meeting notes");
        assert!(app.conversations.is_empty());
        assert!(app.status_message.as_deref().unwrap().contains("Create failed"));
    }

    #[tokio::test]
    async fn test_rename_failure_restores_the_old_name() {
        let (tmp, mut app) = test_app().await;
        app.store.create("quarterly report").await.unwrap();
        app.refresh().await.unwrap();
        break_store_dir(tmp.path());

        app.handle_key(key(KeyCode::Char('r'))).await.unwrap();
        assert_eq!(app.input_buffer, "quarterly report");
        for c in " v2".chars() {
            app.handle_key(key(KeyCode::Char(c))).await.unwrap();
        }
        app.handle_key(key(KeyCode::Enter)).await.unwrap();

        assert_eq!(app.conversations[0].name, "quarterly report");
        assert_eq!(app.popup, Popup::NamePrompt);
        assert!(app.status_message.as_deref().unwrap().contains("Rename failed"));
    }

    #[tokio::test]
    async fn test_name_prompt_esc_cancels() {
        let (_tmp, mut app) = test_app().await;

        app.handle_key(key(KeyCode::Char('n'))).await.unwrap();
        assert_eq!(app.popup, Popup::NamePrompt);
        for c in "abc".chars() {
            app.handle_key(key(KeyCode::Char(c))).await.unwrap();
        }
        assert_eq!(app.input_buffer, "abc");

        app.handle_key(key(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.popup, Popup::None);
        assert!(app.input_buffer.is_empty());
        assert!(app.conversations.is_empty());
    }

    #[tokio::test]
    async fn test_rename_via_prompt_persists() {
        let (_tmp, mut app) = test_app().await;
        let conversation = app.store.create("draft").await.unwrap();
        app.refresh().await.unwrap();

        app.handle_key(key(KeyCode::Char('r'))).await.unwrap();
        assert_eq!(app.popup, Popup::NamePrompt);
        assert_eq!(app.input_buffer, "draft");

        for c in " 2".chars() {
            app.handle_key(key(KeyCode::Char(c))).await.unwrap();
        }
        app.handle_key(key(KeyCode::Enter)).await.unwrap();

        assert_eq!(app.popup, Popup::None);
        let loaded = app.store.load(&conversation.id).await.unwrap();
        assert_eq!(loaded.name, "draft 2");
        assert!(app.status_message.as_deref().unwrap().contains("Renamed"));
    }

    #[tokio::test]
    async fn test_compose_captures_plain_letters() {
        let (_tmp, mut app) = test_app().await;
        let conversation = app.store.create("").await.unwrap();
        app.refresh().await.unwrap();
        app.open_id = Some(conversation.id.clone());
        app.section = Section::Compose;

        // 'q', 'j' and 'd' are commands elsewhere; here they are text
        for c in "quad j d".chars() {
            app.handle_key(key(KeyCode::Char(c))).await.unwrap();
        }
        assert_eq!(app.compose_buffer, "quad j d");

        app.handle_key(key(KeyCode::Enter)).await.unwrap();
        assert!(app.compose_buffer.is_empty());

        let loaded = app.store.load(&conversation.id).await.unwrap();
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(loaded.messages[0].content, "quad j d");
        assert_eq!(loaded.messages[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_send_without_open_chat_hints() {
        let (_tmp, mut app) = test_app().await;
        app.section = Section::Compose;

        for c in "hello".chars() {
            app.handle_key(key(KeyCode::Char(c))).await.unwrap();
        }
        app.handle_key(key(KeyCode::Enter)).await.unwrap();

        // The draft is kept and the user is pointed at the chat list
        assert_eq!(app.compose_buffer, "hello");
        assert!(app.status_message.as_deref().unwrap().contains("Open a chat"));
    }

    #[tokio::test]
    async fn test_send_message_moves_chat_to_top() {
        let (_tmp, mut app) = test_app().await;
        let older = app.store.create("older").await.unwrap();
        app.store.create("newer").await.unwrap();
        app.refresh().await.unwrap();
        assert_eq!(app.conversations[1].id, older.id);

        app.open_id = Some(older.id.clone());
        app.section = Section::Compose;
        app.compose_buffer = "bump".to_string();
        app.handle_key(key(KeyCode::Enter)).await.unwrap();

        assert_eq!(app.conversations[0].id, older.id);
    }

    #[tokio::test]
    async fn test_toggle_document_link_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ChatStore::open(tmp.path().join("conversations")).await.unwrap();
        let docs_dir = tmp.path().join("docs");
        std::fs::create_dir_all(&docs_dir).unwrap();
        std::fs::write(docs_dir.join("notes.md"), b"notes").unwrap();
        let mut app = App::new(store, AppConfig::default(), docs_dir).await.unwrap();

        let conversation = app.store.create("").await.unwrap();
        app.refresh().await.unwrap();
        app.open_id = Some(conversation.id.clone());
        app.section = Section::Documents;

        app.handle_key(key(KeyCode::Char(' '))).await.unwrap();
        let loaded = app.store.load(&conversation.id).await.unwrap();
        assert_eq!(loaded.document_ids, vec!["notes.md".to_string()]);
        assert!(app.status_message.as_deref().unwrap().contains("Linked"));

        app.handle_key(key(KeyCode::Char(' '))).await.unwrap();
        let loaded = app.store.load(&conversation.id).await.unwrap();
        assert!(loaded.document_ids.is_empty());
        assert!(app.status_message.as_deref().unwrap().contains("Unlinked"));
    }

    #[tokio::test]
    async fn test_link_without_open_chat_hints() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ChatStore::open(tmp.path().join("conversations")).await.unwrap();
        let docs_dir = tmp.path().join("docs");
        std::fs::create_dir_all(&docs_dir).unwrap();
        std::fs::write(docs_dir.join("spec.pdf"), b"pdf").unwrap();
        let mut app = App::new(store, AppConfig::default(), docs_dir).await.unwrap();

        app.section = Section::Documents;
        app.handle_key(key(KeyCode::Char(' '))).await.unwrap();

        assert!(app.status_message.as_deref().unwrap().contains("Open a chat"));
    }

    #[tokio::test]
    async fn test_reopen_last_on_startup() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ChatStore::open(tmp.path().join("conversations")).await.unwrap();
        let first = store.create("first").await.unwrap();
        store.create("second").await.unwrap();

        let config = AppConfig {
            reopen_last: true,
            last_opened: Some(first.id.clone()),
            ..AppConfig::default()
        };
        let app = App::new(store, config, tmp.path().join("docs")).await.unwrap();

        assert_eq!(app.open_id.as_deref(), Some(first.id.as_str()));
        // "first" is the older conversation, so it sits below "second"
        assert_eq!(app.selected_chat, 1);
    }

    #[tokio::test]
    async fn test_reopen_skips_vanished_conversation() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ChatStore::open(tmp.path().join("conversations")).await.unwrap();
        store.create("still here").await.unwrap();

        let config = AppConfig {
            reopen_last: true,
            last_opened: Some("chat-000".to_string()),
            ..AppConfig::default()
        };
        let app = App::new(store, config, tmp.path().join("docs")).await.unwrap();

        assert!(app.open_id.is_none());
        assert_eq!(app.selected_chat, 0);
    }

    #[tokio::test]
    async fn test_status_feeds_confirm_popup_text() {
        let (_tmp, mut app) = test_app().await;
        app.store.create("Tax papers").await.unwrap();
        app.refresh().await.unwrap();

        app.handle_key(key(KeyCode::Char('d'))).await.unwrap();
        assert!(app
            .status_message
            .as_deref()
            .unwrap()
            .contains("Delete 'Tax papers'?"));
    }
}
