use std::sync::OnceLock;

use chrono::Utc;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::{App, Popup, PromptAction, Section};
use crate::chat::display;
use crate::chat::Role;
use crate::theme::Theme;

// Load theme colors from system (Omarchy/Hyprland) once at startup
static THEME: OnceLock<Theme> = OnceLock::new();

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::load)
}

// Helper functions to get theme colors
fn accent() -> Color { theme().accent }
fn user() -> Color { theme().user }
fn assistant() -> Color { theme().assistant }
fn inactive() -> Color { theme().inactive }
fn success() -> Color { theme().success }
fn warning() -> Color { theme().warning }
fn danger() -> Color { theme().danger }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn bg_selected() -> Color { theme().bg_selected }
fn header() -> Color { theme().header }

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(1), // Info line
            Constraint::Min(8),    // Chats/documents sidebar + transcript
            Constraint::Length(1), // Footer
        ])
        .split(area);

    draw_info_line(f, app, chunks[0]);
    draw_main(f, app, chunks[1]);
    draw_footer(f, app, chunks[2]);

    // Draw popups on top
    match app.popup {
        Popup::None => {}
        Popup::NamePrompt => draw_name_prompt(f, app),
        Popup::Help => draw_help_popup(f),
        Popup::Confirm => draw_confirm_popup(f, app),
    }
}

fn draw_main(f: &mut Frame, app: &App, area: Rect) {
    // Responsive: give the sidebar more room on narrow terminals
    let sidebar_width = if area.width < 90 {
        Constraint::Percentage(45)
    } else {
        Constraint::Percentage(36)
    };

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([sidebar_width, Constraint::Min(30)])
        .split(area);

    // Documents keep a third of the sidebar unless the terminal is short
    let (chats_height, docs_height) = if area.height < 20 {
        (Constraint::Min(4), Constraint::Min(3))
    } else {
        (Constraint::Ratio(2, 3), Constraint::Ratio(1, 3))
    };

    let sidebar = Layout::default()
        .direction(Direction::Vertical)
        .constraints([chats_height, docs_height])
        .split(columns[0]);

    let panel = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(4),    // Transcript
            Constraint::Length(3), // Compose line
        ])
        .split(columns[1]);

    draw_chats_box(f, app, sidebar[0]);
    draw_documents_box(f, app, sidebar[1]);
    draw_transcript_box(f, app, panel[0]);
    draw_compose_box(f, app, panel[1]);
}

fn draw_info_line(f: &mut Frame, app: &App, area: Rect) {
    // Priority: status message > info message > ready
    let line = if let Some(ref status) = app.status_message {
        // Action feedback (e.g. "Deleted 'Tax papers'", "Linked 'notes.md'")
        Line::from(vec![
            Span::styled(status, Style::default().fg(warning())),
        ])
    } else if let Some(ref info) = app.info_message {
        // Open conversation vitals or list overview
        Line::from(vec![
            Span::styled(info, Style::default().fg(text_dim())),
        ])
    } else {
        Line::from(vec![
            Span::styled("Ready", Style::default().fg(text_dim())),
        ])
    };

    let info = Paragraph::new(line).alignment(Alignment::Center);
    f.render_widget(info, area);
}

fn draw_chats_box(f: &mut Frame, app: &App, area: Rect) {
    let is_active = app.section == Section::Chats;
    let border_color = if is_active { accent() } else { inactive() };
    let title_style = if is_active {
        Style::default().fg(accent()).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(inactive())
    };

    let block = Block::default()
        .title(Span::styled(" Chats ", title_style))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    // Hide the time column when the sidebar gets cramped
    let show_time = area.width > 34;
    let now = Utc::now();

    let rows: Vec<Row> = if app.conversations.is_empty() {
        vec![
            Row::new(vec![
                Span::styled("  No conversations yet", Style::default().fg(text_dim())),
            ]),
            Row::new(vec![
                Span::styled("  Press 'n' to start one", Style::default().fg(accent())),
            ]),
        ]
    } else {
        app.conversations
            .iter()
            .enumerate()
            .map(|(i, conversation)| {
                let is_open = app.open_id.as_deref() == Some(conversation.id.as_str());
                let open_indicator = if is_open { " ●" } else { "" };

                let title = display::display_title(conversation, &app.documents);
                let preview = display::preview_line(conversation);
                let age = display::relative_time(conversation.updated_at, now);

                let row_style = if i == app.selected_chat && is_active {
                    Style::default()
                        .bg(bg_selected())
                        .fg(text()) // Ensure text is visible against selection bg
                } else {
                    Style::default()
                };

                let card = Text::from(vec![
                    Line::from(vec![
                        Span::styled(title, Style::default().fg(text())),
                        Span::styled(open_indicator, Style::default().fg(success())),
                    ]),
                    Line::from(Span::styled(preview, Style::default().fg(text_dim()))),
                ]);

                if show_time {
                    Row::new(vec![
                        card,
                        Text::from(Line::from(Span::styled(
                            age,
                            Style::default().fg(text_dim()),
                        ))),
                    ])
                    .height(2)
                    .style(row_style)
                } else {
                    Row::new(vec![card]).height(2).style(row_style)
                }
            })
            .collect()
    };

    let widths = if show_time {
        vec![Constraint::Min(16), Constraint::Length(12)]
    } else {
        vec![Constraint::Min(16)]
    };

    let table = Table::new(rows, widths).block(block);

    f.render_widget(table, area);
}

fn draw_documents_box(f: &mut Frame, app: &App, area: Rect) {
    let is_active = app.section == Section::Documents;
    let border_color = if is_active { accent() } else { inactive() };
    let title_style = if is_active {
        Style::default().fg(accent()).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(inactive())
    };

    let block = Block::default()
        .title(Span::styled(" Documents ", title_style))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let open = app.open_conversation();

    let rows: Vec<Row> = if app.documents.is_empty() {
        vec![
            Row::new(vec![
                Span::styled("  No documents found", Style::default().fg(text_dim())),
            ]),
            Row::new(vec![
                Span::styled("  md/txt/pdf files appear here", Style::default().fg(text_dim())),
            ]),
        ]
    } else {
        app.documents
            .documents()
            .iter()
            .enumerate()
            .map(|(i, document)| {
                let linked = open.map(|c| c.is_linked(&document.id)).unwrap_or(false);
                let icon_color = if linked { success() } else { text_dim() };
                let linked_indicator = if linked { " ●" } else { "" };

                let row_style = if i == app.selected_doc && is_active {
                    Style::default().bg(bg_selected()).fg(text())
                } else {
                    Style::default()
                };

                Row::new(vec![
                    Span::styled("󰈔", Style::default().fg(icon_color)),
                    Span::styled(
                        format!("{}{}", document.name, linked_indicator),
                        Style::default().fg(text()),
                    ),
                ])
                .style(row_style)
            })
            .collect()
    };

    let widths = vec![Constraint::Length(3), Constraint::Min(10)];

    let table = Table::new(rows, widths).block(block);

    f.render_widget(table, area);
}

fn draw_transcript_box(f: &mut Frame, app: &App, area: Rect) {
    // The transcript is a viewer; keys belong to the sections around it
    let title = app
        .open_conversation()
        .map(|c| format!(" {} ", display::display_title(c, &app.documents)))
        .unwrap_or_else(|| " Transcript ".to_string());

    let block = Block::default()
        .title(Span::styled(title, Style::default().fg(header())))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(inactive()));

    let Some(conversation) = app.open_conversation() else {
        let help = Paragraph::new("No conversation open\nSelect a chat and press Enter")
            .style(Style::default().fg(text_dim()))
            .block(block);
        f.render_widget(help, area);
        return;
    };

    let now = Utc::now();
    let mut lines: Vec<Line> = Vec::new();
    for message in &conversation.messages {
        let role_color = match message.role {
            Role::User => user(),
            Role::Assistant => assistant(),
        };
        lines.push(Line::from(vec![
            Span::styled(
                message.role.label(),
                Style::default().fg(role_color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" · {}", display::relative_time(message.timestamp, now)),
                Style::default().fg(text_dim()),
            ),
        ]));
        for part in message.content.lines() {
            lines.push(Line::from(Span::styled(part, Style::default().fg(text()))));
        }
        lines.push(Line::from(""));
    }

    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "No messages yet",
            Style::default().fg(text_dim()),
        )));
        lines.push(Line::from(Span::styled(
            "Tab to Compose and write the first one",
            Style::default().fg(text_dim()),
        )));
    }

    // Keep the newest messages visible
    let inner_height = area.height.saturating_sub(2) as usize; // Account for borders
    let start = lines.len().saturating_sub(inner_height);
    let visible = lines.split_off(start);

    let content = Paragraph::new(visible)
        .block(block)
        .wrap(Wrap { trim: false });

    f.render_widget(content, area);
}

fn draw_compose_box(f: &mut Frame, app: &App, area: Rect) {
    let is_active = app.section == Section::Compose;
    let border_color = if is_active { accent() } else { inactive() };
    let title_style = if is_active {
        Style::default().fg(accent()).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(inactive())
    };

    let block = Block::default()
        .title(Span::styled(" Compose ", title_style))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let content = if is_active {
        Paragraph::new(format!("{}_", app.compose_buffer)).style(Style::default().fg(text()))
    } else if app.compose_buffer.is_empty() {
        Paragraph::new("Tab here to write a message").style(Style::default().fg(text_dim()))
    } else {
        Paragraph::new(app.compose_buffer.as_str()).style(Style::default().fg(text()))
    };

    f.render_widget(content.block(block), area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints: Vec<(&str, &str)> = match app.section {
        Section::Chats => vec![
            ("↑↓", "Nav"),
            ("Enter", "Open"),
            ("n", "New"),
            ("r", "Rename"),
            ("d", "Del"),
            ("Tab", "Next"),
            ("h", "Help"),
        ],
        Section::Documents => vec![
            ("↑↓", "Nav"),
            ("Space", "Link"),
            ("n", "New chat"),
            ("R", "Rescan"),
            ("Tab", "Next"),
            ("h", "Help"),
        ],
        Section::Compose => vec![
            ("Enter", "Send"),
            ("Esc", "Chats"),
            ("Tab", "Next"),
        ],
    };

    // Responsive: show fewer hints on narrow terminals
    let max_hints = if area.width < 60 { 4 } else if area.width < 80 { 5 } else { hints.len() };

    let hint_spans: Vec<Span> = hints
        .iter()
        .take(max_hints)
        .flat_map(|(key, action)| {
            vec![
                Span::styled(*key, Style::default().fg(accent())),
                Span::styled(format!(" {} │ ", action), Style::default().fg(text_dim())),
            ]
        })
        .collect();

    // Footer is commands legend ONLY - no status messages here
    let footer = Paragraph::new(Line::from(hint_spans))
        .alignment(Alignment::Center);

    f.render_widget(footer, area);
}

fn draw_name_prompt(f: &mut Frame, app: &App) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 70 { 80 } else { 50 },
        if area.height < 20 { 45 } else { 30 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let popup_title = match app.prompt_action {
        PromptAction::Create => " New Chat ",
        PromptAction::Rename => " Rename Chat ",
    };

    let block = Block::default()
        .title(Span::styled(popup_title, Style::default().fg(accent())))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent()));

    f.render_widget(block, popup_area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(popup_area);

    let name_input = Paragraph::new(format!("{}_", app.input_buffer))
        .style(Style::default().fg(text()))
        .block(
            Block::default()
                .title(Span::styled(" Name ", Style::default().fg(accent())))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent())),
        );
    f.render_widget(name_input, inner[0]);

    let hint = Paragraph::new(Line::from(vec![
        Span::styled("Enter", Style::default().fg(success())),
        Span::styled(" save │ ", Style::default().fg(text_dim())),
        Span::styled("Esc", Style::default().fg(danger())),
        Span::styled(" cancel │ ", Style::default().fg(text_dim())),
        Span::styled("empty name titles from documents", Style::default().fg(text_dim())),
    ]))
    .alignment(Alignment::Center);
    f.render_widget(hint, inner[1]);
}

fn draw_help_popup(f: &mut Frame) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 70 },
        if area.height < 40 { 95 } else { 85 },
        area
    );

    f.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled("═══ Navigation ═══", Style::default().fg(header()).add_modifier(Modifier::BOLD))),
        Line::from(vec![
            Span::styled("  Tab       ", Style::default().fg(accent())),
            Span::raw("Switch sections (Chats → Documents → Compose)"),
        ]),
        Line::from(vec![
            Span::styled("  ↑/↓ j/k   ", Style::default().fg(accent())),
            Span::raw("Move up/down in lists"),
        ]),
        Line::from(""),
        Line::from(Span::styled("═══ Chats ═══", Style::default().fg(header()).add_modifier(Modifier::BOLD))),
        Line::from(vec![
            Span::styled("  Enter     ", Style::default().fg(accent())),
            Span::raw("Open the selected conversation"),
        ]),
        Line::from(vec![
            Span::styled("  n         ", Style::default().fg(accent())),
            Span::raw("New chat (empty name takes its title from linked documents)"),
        ]),
        Line::from(vec![
            Span::styled("  r         ", Style::default().fg(accent())),
            Span::raw("Rename the selected chat"),
        ]),
        Line::from(vec![
            Span::styled("  d         ", Style::default().fg(accent())),
            Span::raw("Delete the selected chat (asks first)"),
        ]),
        Line::from(""),
        Line::from(Span::styled("═══ Documents ═══", Style::default().fg(header()).add_modifier(Modifier::BOLD))),
        Line::from(vec![
            Span::styled("  Space     ", Style::default().fg(accent())),
            Span::raw("Link/unlink the document to the open chat"),
        ]),
        Line::from(vec![
            Span::styled("  R         ", Style::default().fg(accent())),
            Span::raw("Rescan the documents folder now"),
        ]),
        Line::from(vec![
            Span::raw("            Folder is rescanned every 10s anyway"),
        ]),
        Line::from(""),
        Line::from(Span::styled("═══ Compose ═══", Style::default().fg(header()).add_modifier(Modifier::BOLD))),
        Line::from(vec![
            Span::styled("  Enter     ", Style::default().fg(accent())),
            Span::raw("Send the message to the open chat"),
        ]),
        Line::from(vec![
            Span::styled("  Esc       ", Style::default().fg(accent())),
            Span::raw("Jump back to the chat list (draft is kept)"),
        ]),
        Line::from(""),
        Line::from(Span::styled("═══ Quick Start ═══", Style::default().fg(header()).add_modifier(Modifier::BOLD))),
        Line::from(vec![
            Span::styled("  kaiwa                  ", Style::default().fg(accent())),
            Span::raw("Launch this TUI"),
        ]),
        Line::from(vec![
            Span::styled("  kaiwa --list           ", Style::default().fg(accent())),
            Span::raw("Conversation list as JSON for scripts"),
        ]),
        Line::from(vec![
            Span::styled("  kaiwa --new \"Report\"   ", Style::default().fg(accent())),
            Span::raw("Create a chat and print its id"),
        ]),
        Line::from(vec![
            Span::styled("  kaiwa --delete <ID>    ", Style::default().fg(accent())),
            Span::raw("Delete a chat by id"),
        ]),
        Line::from(""),
        Line::from(Span::styled("═══ Files ═══", Style::default().fg(header()).add_modifier(Modifier::BOLD))),
        Line::from(vec![
            Span::styled("  ~/.config/kaiwa/config.toml            ", Style::default().fg(text_dim())),
        ]),
        Line::from(vec![
            Span::styled("  ~/.local/share/kaiwa/conversations/    ", Style::default().fg(text_dim())),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(text_dim())),
            Span::styled("h", Style::default().fg(accent())),
            Span::styled("/", Style::default().fg(text_dim())),
            Span::styled("?", Style::default().fg(accent())),
            Span::styled("/", Style::default().fg(text_dim())),
            Span::styled("Esc", Style::default().fg(accent())),
            Span::styled(" to close", Style::default().fg(text_dim())),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" 󰋖 kaiwa Help ", Style::default().fg(accent())))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent())),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

fn draw_confirm_popup(f: &mut Frame, app: &App) {
    let popup_area = centered_rect(40, 20, f.area());

    f.render_widget(Clear, popup_area);

    let message = app.status_message.as_deref().unwrap_or("Confirm?");

    let confirm = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(warning()))),
        Line::from(""),
        Line::from(vec![
            Span::styled("  y", Style::default().fg(success()).add_modifier(Modifier::BOLD)),
            Span::raw(" Yes   "),
            Span::styled("n", Style::default().fg(danger()).add_modifier(Modifier::BOLD)),
            Span::raw(" No"),
        ]),
    ])
    .block(
        Block::default()
            .title(Span::styled(" Confirm ", Style::default().fg(warning())))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(warning())),
    )
    .alignment(Alignment::Center);

    f.render_widget(confirm, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
