//! Colors and styles for the TUI.

use crate::notifications::NotificationLevel;
use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct Theme {
    pub primary: Color,
    pub secondary: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub text: Color,
    pub text_dim: Color,
    pub text_muted: Color,
    pub border: Color,
    pub border_focus: Color,
    pub highlight_bg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::paper()
    }
}

impl Theme {
    pub fn paper() -> Self {
        Self {
            primary: Color::Rgb(222, 184, 135),
            secondary: Color::Rgb(135, 206, 235),
            warning: Color::Rgb(255, 215, 0),
            error: Color::Rgb(255, 99, 71),
            info: Color::Rgb(135, 206, 235),
            text: Color::Rgb(245, 245, 245),
            text_dim: Color::Rgb(136, 136, 136),
            text_muted: Color::Rgb(90, 90, 90),
            border: Color::Rgb(68, 68, 68),
            border_focus: Color::Rgb(222, 184, 135),
            highlight_bg: Color::Rgb(42, 42, 42),
        }
    }

    pub fn border_style(&self, focused: bool) -> Style {
        let color = if focused { self.border_focus } else { self.border };
        Style::default().fg(color)
    }

    /// Rows of a grid. Placeholder rows are dimmed until the real page lands.
    pub fn row_style(&self, placeholder: bool) -> Style {
        if placeholder {
            Style::default()
                .fg(self.text_muted)
                .add_modifier(Modifier::DIM)
        } else {
            Style::default().fg(self.text)
        }
    }

    pub fn selected_style(&self) -> Style {
        Style::default()
            .fg(self.primary)
            .bg(self.highlight_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn link_style(&self) -> Style {
        Style::default()
            .fg(self.secondary)
            .add_modifier(Modifier::UNDERLINED)
    }
}

pub fn notification_color(level: NotificationLevel, theme: &Theme) -> Color {
    match level {
        NotificationLevel::Info => theme.info,
        NotificationLevel::Warning => theme.warning,
        NotificationLevel::Error => theme.error,
    }
}
