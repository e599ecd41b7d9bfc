//! Book detail screen.

use crate::state::{App, AuthorState, DetailState};
use crate::widgets::{DetailPanel, StatusIndicator};
use libris_core::{cover_url, BookDetail, CoverSize};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

const LOADING_DESCRIPTION: &str = "Loading description...";

pub fn author_label(author: &AuthorState) -> String {
    match author {
        AuthorState::Unknown => "Unknown author".to_string(),
        AuthorState::Pending => "Loading author...".to_string(),
        AuthorState::Error(message) => format!("Author unavailable: {}", message),
        AuthorState::Ready(author) => author.name.clone(),
    }
}

pub fn description_text(book: &BookDetail) -> &str {
    book.description.as_deref().unwrap_or(LOADING_DESCRIPTION)
}

pub fn cover_urls(book: &BookDetail) -> Vec<String> {
    book.covers
        .iter()
        .map(|id| cover_url(*id, CoverSize::Medium))
        .collect()
}

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let border_style = app.theme.border_style(true);
    let (book, author, fetching) = match &app.detail {
        DetailState::Ready {
            book,
            author,
            fetching,
        } => (book, author, *fetching),
        other => {
            let (status, style) = match other {
                DetailState::Error(message) => (
                    format!("Could not load this book: {}", message),
                    Style::default().fg(app.theme.error),
                ),
                _ => (
                    "Loading book...".to_string(),
                    Style::default().fg(app.theme.text_dim),
                ),
            };
            StatusIndicator {
                title: "Book",
                status,
                style,
                border_style,
            }
            .render(f, area);
            return;
        }
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Min(4),
            Constraint::Length(6),
        ])
        .split(area);

    let label_style = Style::default().fg(app.theme.primary);
    let mut panel = DetailPanel::new("Book", label_style, border_style)
        .styled_field(
            "Title",
            book.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )
        .field("Author", author_label(author));
    if let AuthorState::Ready(found) = author {
        if let Some(link) = &found.link {
            panel = panel.styled_field("Author link", link.clone(), app.theme.link_style());
        }
    }
    let covers = cover_urls(book);
    panel = panel.field(
        "Covers",
        if covers.is_empty() {
            "none".to_string()
        } else {
            covers.join("  ")
        },
    );
    panel.render(f, chunks[0]);

    let description_style = if book.is_skeleton() || fetching {
        Style::default().fg(app.theme.text_dim)
    } else {
        Style::default().fg(app.theme.text)
    };
    let description = Paragraph::new(description_text(book).to_string())
        .style(description_style)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Description")
                .borders(Borders::ALL)
                .border_style(border_style),
        );
    f.render_widget(description, chunks[1]);

    let links: Vec<ListItem> = match &book.links {
        Some(links) if !links.is_empty() => links
            .iter()
            .map(|link| {
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{}: ", link.title)),
                    Span::styled(link.url.clone(), app.theme.link_style()),
                ]))
            })
            .collect(),
        Some(_) => vec![ListItem::new("No links")],
        None if book.is_skeleton() => vec![ListItem::new("Loading links...")],
        None => vec![ListItem::new("No links")],
    };
    f.render_widget(
        List::new(links).block(
            Block::default()
                .title("Links")
                .borders(Borders::ALL)
                .border_style(border_style),
        ),
        chunks[2],
    );
}
