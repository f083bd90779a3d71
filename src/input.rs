//! Crossterm bridge (feature `crossterm`).
//!
//! Terminal frontends drive the stores through the same keyboard contract
//! browsers use: key name strings like "ArrowUp" and "Space". This module
//! converts crossterm key events into that shape so a terminal host can
//! feed [`Document::dispatch_key_down`](crate::dom::Document::dispatch_key_down)
//! directly.

use crossterm::event::{KeyCode, KeyEvent as CrosstermKeyEvent, KeyEventKind, KeyModifiers};

use crate::dom::{KeyState, KeyboardEvent, Modifiers};

/// Convert a crossterm key event. Returns `None` for key codes with no
/// browser-style name (function keys, media keys and the like).
pub fn keyboard_event_from_crossterm(event: CrosstermKeyEvent) -> Option<KeyboardEvent> {
    let key = match event.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Esc => "Escape".to_string(),
        KeyCode::Up => "ArrowUp".to_string(),
        KeyCode::Down => "ArrowDown".to_string(),
        KeyCode::Left => "ArrowLeft".to_string(),
        KeyCode::Right => "ArrowRight".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        _ => return None,
    };

    let state = match event.kind {
        KeyEventKind::Press | KeyEventKind::Repeat => KeyState::Press,
        KeyEventKind::Release => KeyState::Release,
    };

    Some(KeyboardEvent {
        key,
        modifiers: convert_modifiers(event.modifiers),
        state,
    })
}

fn convert_modifiers(mods: KeyModifiers) -> Modifiers {
    Modifiers {
        ctrl: mods.contains(KeyModifiers::CONTROL),
        alt: mods.contains(KeyModifiers::ALT),
        shift: mods.contains(KeyModifiers::SHIFT),
        meta: mods.contains(KeyModifiers::SUPER),
    }
}
