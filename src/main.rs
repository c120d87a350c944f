mod app;
mod chat;
mod config;
mod docs;
mod theme;
mod ui;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::{App, Popup};
use chat::display;
use chat::store::ChatStore;
use config::AppConfig;
use docs::DocumentLibrary;

#[derive(Parser, Debug)]
#[command(name = "kaiwa")]
#[command(version = "0.1.0")]
#[command(about = "A terminal-friendly chat manager for document-assistant workflows")]
struct Args {
    /// Output the conversation list as JSON (for scripts)
    #[arg(short, long)]
    list: bool,

    /// Create a conversation (optionally named) and print its id
    #[arg(short, long, value_name = "NAME")]
    new: Option<Option<String>>,

    /// Delete a conversation by id
    #[arg(short, long, value_name = "ID")]
    delete: Option<String>,

    /// Scan this documents directory instead of the configured one
    #[arg(long, value_name = "PATH")]
    docs_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = AppConfig::load().unwrap_or_default();
    let documents_dir = config.resolve_documents_dir(args.docs_dir);

    // Open the store before anything else so failures print cleanly,
    // never from inside the alternate screen
    let store = ChatStore::open_default().await?;

    // Handle CLI-only commands
    if args.list {
        return print_list(&store, &documents_dir).await;
    }

    if let Some(name) = args.new {
        return new_chat(&store, name.as_deref().unwrap_or(""), &config).await;
    }

    if let Some(id) = args.delete {
        return delete_chat(&store, &id, &config).await;
    }

    // Run TUI
    run_tui(store, config, documents_dir).await
}

async fn print_list(store: &ChatStore, documents_dir: &Path) -> Result<()> {
    let documents = DocumentLibrary::scan(documents_dir);
    let conversations = store.list().await?;

    // One entry per conversation, newest update first
    let entries: Vec<serde_json::Value> = conversations
        .iter()
        .map(|conversation| {
            serde_json::json!({
                "id": conversation.id,
                "title": display::display_title(conversation, &documents),
                "preview": display::preview_line(conversation),
                "messages": conversation.messages.len(),
                "documents": conversation.document_ids.len(),
                "updated_at": conversation.updated_at.to_rfc3339(),
            })
        })
        .collect();

    println!("{}", serde_json::to_string(&entries)?);
    Ok(())
}

async fn new_chat(store: &ChatStore, name: &str, config: &AppConfig) -> Result<()> {
    let conversation = store.create(name).await?;

    // Scripts consume the id from stdout; it goes out the moment the
    // conversation exists
    println!("{}", conversation.id);

    let label = if conversation.name.is_empty() {
        conversation.id.clone()
    } else {
        conversation.name.clone()
    };
    if config.notifications {
        notify("kaiwa", &format!("Started chat '{}'", label));
    }
    Ok(())
}

async fn delete_chat(store: &ChatStore, id: &str, config: &AppConfig) -> Result<()> {
    store.delete(id).await?;

    if config.notifications {
        notify("kaiwa", &format!("Deleted chat '{}'", id));
    }
    Ok(())
}

async fn run_tui(store: ChatStore, config: AppConfig, documents_dir: PathBuf) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state
    let mut app = App::new(store, config, documents_dir).await?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        // 'q' quits only when no text buffer is capturing it
                        KeyCode::Char('q') if app.popup == Popup::None && !app.in_text_entry() => {
                            return Ok(())
                        }
                        KeyCode::Char('c') if key.modifiers.contains(event::KeyModifiers::CONTROL) => {
                            return Ok(())
                        }
                        _ => {
                            // Handle key and catch any errors to prevent crashes
                            if let Err(e) = app.handle_key(key).await {
                                app.status_message = Some(format!("Error: {}", e));
                            }
                        }
                    }
                }
            }
        }

        // Periodic refresh
        let _ = app.tick().await;
    }
}

/// Best-effort desktop notification; delivery failure never fails the
/// surrounding command.
fn notify(summary: &str, body: &str) {
    let _ = notify_rust::Notification::new()
        .summary(summary)
        .body(body)
        .icon("mail-message-new")
        .show();
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store(tmp: &tempfile::TempDir) -> ChatStore {
        ChatStore::open(tmp.path().join("conversations")).await.unwrap()
    }

    fn noisy_config() -> AppConfig {
        AppConfig {
            notifications: true,
            ..AppConfig::default()
        }
    }

    // Notifications are best effort: with no notification service around
    // (headless shells, ssh) the command still persists the chat and
    // exits cleanly so scripts can read the id.
    #[tokio::test]
    async fn test_new_chat_does_not_require_a_notification_service() {
        let tmp = tempfile::tempdir().unwrap();
        let store = test_store(&tmp).await;

        new_chat(&store, "weekly sync", &noisy_config()).await.unwrap();

        let conversations = store.list().await.unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].name, "weekly sync");
    }

    #[tokio::test]
    async fn test_delete_chat_does_not_require_a_notification_service() {
        let tmp = tempfile::tempdir().unwrap();
        let store = test_store(&tmp).await;
        let conversation = store.create("done with this").await.unwrap();

        delete_chat(&store, &conversation.id, &noisy_config())
            .await
            .unwrap();

        assert!(store.list().await.unwrap().is_empty());
    }
}
