//! Page control under the result grid.

use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub struct Pagination {
    pub page: u32,
    pub max_pages: u32,
    pub active_style: Style,
    pub inactive_style: Style,
}

impl Pagination {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.max_pages
    }

    pub fn line(&self) -> Line<'static> {
        let arrow = |label: &'static str, enabled: bool| {
            let style = if enabled {
                self.active_style
            } else {
                self.inactive_style
            };
            Span::styled(label, style)
        };
        Line::from(vec![
            arrow("< prev", self.has_prev()),
            Span::raw(format!("   Page {} of {}   ", self.page, self.max_pages)),
            arrow("next >", self.has_next()),
        ])
    }

    pub fn render(&self, f: &mut Frame<'_>, area: Rect) {
        let paragraph = Paragraph::new(self.line())
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::TOP));
        f.render_widget(paragraph, area);
    }
}
