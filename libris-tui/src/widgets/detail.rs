//! Labelled field list inside a bordered panel.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

pub struct DetailPanel<'a> {
    pub title: &'a str,
    pub fields: Vec<(&'a str, Vec<Span<'a>>)>,
    pub label_style: Style,
    pub border_style: Style,
}

impl<'a> DetailPanel<'a> {
    pub fn new(title: &'a str, label_style: Style, border_style: Style) -> Self {
        Self {
            title,
            fields: Vec::new(),
            label_style,
            border_style,
        }
    }

    pub fn field(mut self, label: &'a str, value: impl Into<String>) -> Self {
        self.fields.push((label, vec![Span::raw(value.into())]));
        self
    }

    pub fn styled_field(mut self, label: &'a str, value: impl Into<String>, style: Style) -> Self {
        self.fields
            .push((label, vec![Span::styled(value.into(), style)]));
        self
    }

    pub fn lines(&self) -> Vec<Line<'a>> {
        self.fields
            .iter()
            .map(|(label, value)| {
                let mut spans = vec![Span::styled(format!("{}: ", label), self.label_style)];
                spans.extend(value.iter().cloned());
                Line::from(spans)
            })
            .collect()
    }

    pub fn render(&self, f: &mut Frame<'_>, area: Rect) {
        let widget = Paragraph::new(Text::from(self.lines()))
            .block(
                Block::default()
                    .title(self.title)
                    .borders(Borders::ALL)
                    .border_style(self.border_style),
            )
            .wrap(Wrap { trim: true });

        f.render_widget(widget, area);
    }
}
