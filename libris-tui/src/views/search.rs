//! Search form, result grid and pagination.

use crate::nav::Focus;
use crate::state::{App, ResultsState};
use crate::widgets::{Pagination, StatusIndicator};
use libris_core::SearchResult;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    render_form(f, app, chunks[0]);
    render_results(f, app, chunks[1]);
}

fn render_form(f: &mut Frame<'_>, app: &App, area: Rect) {
    let mut input = app.input.clone();
    input.set_block(
        Block::default()
            .title("Search")
            .borders(Borders::ALL)
            .border_style(app.theme.border_style(app.focus == Focus::Input)),
    );
    f.render_widget(input.widget(), area);
}

/// Message for the states that have no grid.
pub fn state_message(state: &ResultsState) -> Option<String> {
    match state {
        ResultsState::Empty => Some("Type a title, author or subject and press Enter.".to_string()),
        ResultsState::Pending => Some("Searching...".to_string()),
        ResultsState::Error(message) => Some(format!("Something went wrong: {}", message)),
        ResultsState::NoResults => Some("No books match this search.".to_string()),
        ResultsState::Ready { .. } => None,
    }
}

pub fn result_label(result: &SearchResult) -> String {
    let mut label = result.title.clone();
    if let Some(author) = &result.author_name {
        label.push_str(" by ");
        label.push_str(author);
    }
    if let Some(year) = result.publish_year {
        label.push_str(&format!(" ({})", year));
    }
    label
}

fn render_results(f: &mut Frame<'_>, app: &App, area: Rect) {
    let border_style = app.theme.border_style(app.focus == Focus::Results);

    let ResultsState::Ready {
        page,
        placeholder,
        fetching,
    } = &app.results
    else {
        let style = match app.results {
            ResultsState::Error(_) => Style::default().fg(app.theme.error),
            _ => Style::default().fg(app.theme.text_dim),
        };
        let indicator = StatusIndicator {
            title: "Results",
            status: state_message(&app.results).unwrap_or_default(),
            style,
            border_style,
        };
        indicator.render(f, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(area);

    let count = if *fetching {
        format!("{} records found (updating...)", page.num_found)
    } else {
        format!("{} records found", page.num_found)
    };
    f.render_widget(
        Paragraph::new(count)
            .alignment(Alignment::Right)
            .style(Style::default().fg(app.theme.text_dim)),
        chunks[0],
    );

    let row_style = app.theme.row_style(*placeholder);
    let items: Vec<ListItem> = page
        .docs
        .iter()
        .map(|result| ListItem::new(result_label(result)).style(row_style))
        .collect();

    let mut state = ListState::default();
    if !page.docs.is_empty() && app.focus == Focus::Results {
        state.select(Some(app.selected.min(page.docs.len() - 1)));
    }

    let list = List::new(items)
        .block(
            Block::default()
                .title("Results")
                .borders(Borders::ALL)
                .border_style(border_style),
        )
        .highlight_style(app.theme.selected_style())
        .highlight_symbol("> ");
    f.render_stateful_widget(list, chunks[1], &mut state);

    let pagination = Pagination {
        page: app.page,
        max_pages: app.results.max_pages(),
        active_style: Style::default().fg(app.theme.primary),
        inactive_style: Style::default().fg(app.theme.text_muted),
    };
    pagination.render(f, chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_core::{AuthorId, BookId};

    #[test]
    fn test_result_label_includes_author_and_year() {
        let result = SearchResult {
            id: BookId::new("/works/OL1W"),
            title: "Dune".to_string(),
            author_name: Some("Frank Herbert".to_string()),
            author_id: Some(AuthorId::new("/authors/OL1A")),
            cover_id: None,
            publish_year: Some(1965),
        };
        assert_eq!(result_label(&result), "Dune by Frank Herbert (1965)");
    }

    #[test]
    fn test_result_label_without_optional_fields() {
        let result = SearchResult {
            id: BookId::new("/works/OL2W"),
            title: "Anonymous".to_string(),
            author_name: None,
            author_id: None,
            cover_id: None,
            publish_year: None,
        };
        assert_eq!(result_label(&result), "Anonymous");
    }

    #[test]
    fn test_every_non_grid_state_has_a_message() {
        assert!(state_message(&ResultsState::Empty).is_some());
        assert!(state_message(&ResultsState::Pending).is_some());
        assert!(state_message(&ResultsState::NoResults).is_some());
        assert!(state_message(&ResultsState::Error("boom".to_string()))
            .unwrap()
            .contains("boom"));
    }
}
