//! View rendering dispatch.

pub mod detail;
pub mod search;

use crate::nav::{Focus, Screen};
use crate::state::App;
use crate::theme::notification_color;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn render_view(f: &mut Frame<'_>, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.size());

    render_header(f, app, layout[0]);

    match app.screen {
        Screen::Search => search::render(f, app, layout[1]),
        Screen::Detail => detail::render(f, app, layout[1]),
    }

    render_footer(f, app, layout[2]);
}

fn render_header(f: &mut Frame<'_>, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(
            "LIBRIS",
            Style::default()
                .fg(app.theme.primary)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" | Open Library search | ", Style::default().fg(app.theme.text_dim)),
        Span::raw(app.screen.title()),
    ];
    if !app.filter.is_empty() {
        spans.push(Span::styled(
            format!(" | \"{}\" p.{}", app.filter, app.page),
            Style::default().fg(app.theme.text_dim),
        ));
    }
    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(app.theme.border_style(false)),
    );
    f.render_widget(header, area);
}

pub fn help_text(app: &App) -> &'static str {
    match (app.screen, app.focus) {
        (Screen::Detail, _) => "Esc back • Ctrl-R refresh • q quit",
        (Screen::Search, Focus::Input) => "Enter search • Tab results • Ctrl-C quit",
        (Screen::Search, Focus::Results) => {
            "j/k select • h/l page • Enter open • / edit search • Ctrl-R refresh • q quit"
        }
    }
}

fn render_footer(f: &mut Frame<'_>, app: &App, area: Rect) {
    let (text, style) = match app.notifications.last() {
        Some(note) => (
            format!("{}: {}", note.level.label(), note.message),
            Style::default().fg(notification_color(note.level, &app.theme)),
        ),
        None => (
            help_text(app).to_string(),
            Style::default().fg(app.theme.text_dim),
        ),
    };
    let footer = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.theme.border_style(false)),
        )
        .style(style);
    f.render_widget(footer, area);
}
