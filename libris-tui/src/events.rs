//! Event types for the TUI event loop.

use crossterm::event::KeyEvent;
use libris_storage::CacheEvent;

#[derive(Debug, Clone)]
pub enum TuiEvent {
    Input(KeyEvent),
    Tick,
    Resize { width: u16, height: u16 },
    Cache(CacheEvent),
}
