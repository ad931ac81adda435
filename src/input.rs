//! Key and mouse bindings, folded into a single pointer sampled once per tick.

use crate::game::InputSource;
use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

/// Action from a key or mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Press,
    Release,
    Quit,
    None,
}

/// Map key event to action. Space and Enter act as the pointer; auto-repeats are ignored.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent {
        code,
        modifiers,
        kind,
        ..
    } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod {
        return Action::None;
    }
    match (code, kind) {
        (KeyCode::Char('q') | KeyCode::Esc, KeyEventKind::Press) => Action::Quit,
        (KeyCode::Char(' ') | KeyCode::Enter, KeyEventKind::Press) => Action::Press,
        (KeyCode::Char(' ') | KeyCode::Enter, KeyEventKind::Release) => Action::Release,
        _ => Action::None,
    }
}

/// Left mouse button is the pointer.
pub fn mouse_to_action(mouse: MouseEvent) -> Action {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => Action::Press,
        MouseEventKind::Up(MouseButton::Left) => Action::Release,
        _ => Action::None,
    }
}

/// Pointer edges for the current tick.
///
/// Terminals without the keyboard enhancement protocol never send key releases, so a
/// key press that cannot expect one gets a synthesised release on the following tick.
/// A release that lands in the same tick as its press is held back a tick as well, so a
/// quick click never starts a game and drops a block at once.
#[derive(Debug, Default)]
pub struct PointerInput {
    down: bool,
    up: bool,
    held: bool,
    release_pending: bool,
    key_releases: bool,
}

impl PointerInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.kind == KeyEventKind::Release {
            self.key_releases = true;
        }
        let action = key_to_action(key);
        self.apply(action, !self.key_releases);
        action
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) -> Action {
        let action = mouse_to_action(mouse);
        self.apply(action, false);
        action
    }

    fn apply(&mut self, action: Action, synthesise_release: bool) {
        match action {
            Action::Press if !self.held => {
                self.down = true;
                self.held = true;
                self.release_pending = synthesise_release;
            }
            Action::Release if self.held && self.down => {
                self.release_pending = true;
            }
            Action::Release if self.held => {
                self.up = true;
                self.held = false;
                self.release_pending = false;
            }
            _ => {}
        }
    }

    /// Clear this tick's edges; queue the synthesised release for the next one.
    pub fn end_tick(&mut self) {
        self.down = false;
        self.up = false;
        if self.held && self.release_pending {
            self.held = false;
            self.release_pending = false;
            self.up = true;
        }
    }

    #[cfg(test)]
    pub fn is_held(&self) -> bool {
        self.held
    }
}

impl InputSource for PointerInput {
    fn pointer_down(&self) -> bool {
        self.down
    }

    fn pointer_up(&self) -> bool {
        self.up
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        }
    }

    fn mouse(kind: MouseEventKind) -> MouseEvent {
        MouseEvent {
            kind,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(key_to_action(key(KeyCode::Char('q'), KeyEventKind::Press)), Action::Quit);
        assert_eq!(key_to_action(key(KeyCode::Esc, KeyEventKind::Press)), Action::Quit);
        assert_eq!(key_to_action(key(KeyCode::Char(' '), KeyEventKind::Press)), Action::Press);
        assert_eq!(key_to_action(key(KeyCode::Enter, KeyEventKind::Release)), Action::Release);
        assert_eq!(key_to_action(key(KeyCode::Char(' '), KeyEventKind::Repeat)), Action::None);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl_c), Action::Quit);
    }

    #[test]
    fn test_mouse_click_gives_both_edges() {
        let mut input = PointerInput::new();
        input.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left)));
        assert!(input.pointer_down());
        assert!(!input.pointer_up());
        input.end_tick();
        assert!(!input.pointer_down());
        assert!(!input.pointer_up());
        assert!(input.is_held());

        input.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left)));
        assert!(input.pointer_up());
        input.end_tick();
        assert!(!input.pointer_up());
    }

    #[test]
    fn test_click_within_one_tick_splits_edges() {
        let mut input = PointerInput::new();
        input.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left)));
        input.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left)));
        assert!(input.pointer_down());
        assert!(!input.pointer_up());
        input.end_tick();
        assert!(!input.pointer_down());
        assert!(input.pointer_up());
        assert!(!input.is_held());
        input.end_tick();
        assert!(!input.pointer_up());
    }

    #[test]
    fn test_right_button_ignored() {
        let mut input = PointerInput::new();
        input.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Right)));
        assert!(!input.pointer_down());
    }

    #[test]
    fn test_key_release_is_synthesised_without_enhancement() {
        let mut input = PointerInput::new();
        input.handle_key(key(KeyCode::Char(' '), KeyEventKind::Press));
        assert!(input.pointer_down());
        input.end_tick();
        assert!(input.pointer_up());
        assert!(!input.is_held());
        input.end_tick();
        assert!(!input.pointer_up());
    }

    #[test]
    fn test_reported_key_release_is_used() {
        let mut input = PointerInput::new();
        input.handle_key(key(KeyCode::Enter, KeyEventKind::Release));
        input.end_tick();

        input.handle_key(key(KeyCode::Enter, KeyEventKind::Press));
        input.end_tick();
        assert!(!input.pointer_up());
        assert!(input.is_held());
        input.handle_key(key(KeyCode::Enter, KeyEventKind::Release));
        assert!(input.pointer_up());
    }

    #[test]
    fn test_held_pointer_does_not_press_twice() {
        let mut input = PointerInput::new();
        input.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left)));
        input.end_tick();
        input.handle_key(key(KeyCode::Char(' '), KeyEventKind::Press));
        assert!(!input.pointer_down());
    }
}
