use crate::navigation::{Boundaries, NavDirection, NavigationIntent};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use tracing::debug;

/// Outcome of offering a key event to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyDispatch {
    /// The key belongs to the gallery; callers must not pass it on.
    Handled(NavigationIntent),
    /// Not ours; other handlers may use it.
    Ignored,
}

impl KeyDispatch {
    pub fn is_handled(&self) -> bool {
        matches!(self, KeyDispatch::Handled(_))
    }
}

/// Clickable regions of the lightbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    PrevArrow,
    NextArrow,
    CloseButton,
    Backdrop,
    Image,
}

pub fn intent_for_key(code: KeyCode) -> Option<NavigationIntent> {
    match code {
        KeyCode::Left => Some(NavigationIntent::Prev),
        KeyCode::Right => Some(NavigationIntent::Next),
        KeyCode::Esc => Some(NavigationIntent::Close),
        _ => None,
    }
}

/// Routes keys and clicks to navigation intents.
///
/// The keyboard listener is attached only while the gallery is open and
/// keyboard input is enabled; dropping the dispatcher detaches it.
#[derive(Debug)]
pub struct InputDispatcher {
    open: bool,
    keyboard_enabled: bool,
    listening: bool,
    backdrop_closes: bool,
}

impl InputDispatcher {
    pub fn new(keyboard_enabled: bool, backdrop_closes: bool) -> Self {
        Self {
            open: false,
            keyboard_enabled,
            listening: false,
            backdrop_closes,
        }
    }

    /// Re-evaluates the listener after the open state or the keyboard flag
    /// changed.
    pub fn sync(&mut self, open: bool, keyboard_enabled: bool) {
        self.open = open;
        self.keyboard_enabled = keyboard_enabled;

        let wanted = open && keyboard_enabled;
        if wanted && !self.listening {
            self.listening = true;
            debug!("keyboard listener attached");
        } else if !wanted {
            self.detach();
        }
    }

    pub fn detach(&mut self) {
        if self.listening {
            self.listening = false;
            debug!("keyboard listener detached");
        }
    }

    pub fn set_backdrop_closes(&mut self, backdrop_closes: bool) {
        self.backdrop_closes = backdrop_closes;
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn handle_key(&self, key: &KeyEvent) -> KeyDispatch {
        if !self.listening || key.kind != KeyEventKind::Press {
            return KeyDispatch::Ignored;
        }
        match intent_for_key(key.code) {
            Some(intent) => KeyDispatch::Handled(intent),
            None => KeyDispatch::Ignored,
        }
    }

    /// Arrows are hidden at the matching boundary, so clicks there do nothing.
    pub fn handle_click(&self, target: ClickTarget, bounds: Boundaries) -> Option<NavigationIntent> {
        if !self.open {
            return None;
        }
        match target {
            ClickTarget::PrevArrow if !bounds.blocks(NavDirection::Prev) => Some(NavigationIntent::Prev),
            ClickTarget::NextArrow if !bounds.blocks(NavDirection::Next) => Some(NavigationIntent::Next),
            ClickTarget::CloseButton => Some(NavigationIntent::Close),
            ClickTarget::Backdrop if self.backdrop_closes => Some(NavigationIntent::Close),
            ClickTarget::Image => Some(NavigationIntent::ClickImage),
            _ => None,
        }
    }
}

impl Drop for InputDispatcher {
    fn drop(&mut self) {
        self.detach();
    }
}
