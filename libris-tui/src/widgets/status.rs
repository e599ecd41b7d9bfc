//! Centered one-line message for empty, loading and error states.

use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

pub struct StatusIndicator<'a> {
    pub title: &'a str,
    pub status: String,
    pub style: Style,
    pub border_style: Style,
}

impl StatusIndicator<'_> {
    pub fn render(&self, f: &mut Frame<'_>, area: Rect) {
        let paragraph = Paragraph::new(self.status.clone())
            .style(self.style)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(self.title)
                    .borders(Borders::ALL)
                    .border_style(self.border_style),
            );
        f.render_widget(paragraph, area);
    }
}
