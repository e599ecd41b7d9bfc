//! Screens and focus.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Search,
    Detail,
}

impl Screen {
    pub fn title(&self) -> &'static str {
        match self {
            Screen::Search => "Search",
            Screen::Detail => "Book",
        }
    }
}

/// Which part of the search screen receives keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Results,
}

impl Focus {
    pub fn toggle(&self) -> Focus {
        match self {
            Focus::Input => Focus::Results,
            Focus::Results => Focus::Input,
        }
    }
}
