//! Keybinding definitions for the TUI.

use crate::nav::{Focus, Screen};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    /// Run the search typed into the form.
    Submit,
    /// Forward the key to the search form.
    Edit(KeyEvent),
    ToggleFocus,
    MoveUp,
    MoveDown,
    PrevPage,
    NextPage,
    Open,
    Back,
    Refresh,
}

pub fn map_key(event: KeyEvent, screen: Screen, focus: Focus) -> Option<Action> {
    let KeyEvent { code, modifiers, .. } = event;

    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Some(Action::Quit),
            KeyCode::Char('r') => Some(Action::Refresh),
            _ if screen == Screen::Search && focus == Focus::Input => Some(Action::Edit(event)),
            _ => None,
        };
    }

    match screen {
        Screen::Detail => match code {
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Left | KeyCode::Char('h') => {
                Some(Action::Back)
            }
            _ => None,
        },
        Screen::Search => match focus {
            Focus::Input => match code {
                KeyCode::Enter => Some(Action::Submit),
                KeyCode::Tab | KeyCode::Esc | KeyCode::Down => Some(Action::ToggleFocus),
                _ => Some(Action::Edit(event)),
            },
            Focus::Results => match code {
                KeyCode::Char('q') => Some(Action::Quit),
                KeyCode::Tab | KeyCode::Char('/') => Some(Action::ToggleFocus),
                KeyCode::Enter => Some(Action::Open),
                KeyCode::Up | KeyCode::Char('k') => Some(Action::MoveUp),
                KeyCode::Down | KeyCode::Char('j') => Some(Action::MoveDown),
                KeyCode::Left | KeyCode::Char('h') | KeyCode::PageUp => Some(Action::PrevPage),
                KeyCode::Right | KeyCode::Char('l') | KeyCode::PageDown => Some(Action::NextPage),
                _ => None,
            },
        },
    }
}
