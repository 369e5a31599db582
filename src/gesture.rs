use crate::navigation::{Boundaries, NavigationIntent, SwipeDirection};

/// Turns raw pointer positions into swipe intents.
///
/// Holds only the gesture in progress; everything is cleared on release or
/// cancel.
#[derive(Debug, Default, Clone)]
pub struct GestureTracker {
    origin: Option<f32>,
    started: bool,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer went down at horizontal position `x`.
    pub fn press(&mut self, x: f32) {
        self.origin = Some(x);
        self.started = false;
    }

    /// Pointer moved to `x`. Directions blocked at a boundary produce nothing
    /// at all, so the image cannot be dragged past either end.
    pub fn drag(&mut self, x: f32, bounds: Boundaries) -> Option<NavigationIntent> {
        let dx = x - self.origin?;

        let direction = if dx < 0.0 && !bounds.at_last {
            SwipeDirection::Left
        } else if dx > 0.0 && !bounds.at_first {
            SwipeDirection::Right
        } else {
            return None;
        };
        let delta = dx.abs();

        if self.started {
            Some(NavigationIntent::SwipeUpdate { direction, delta })
        } else {
            self.started = true;
            Some(NavigationIntent::SwipeStart { direction, delta })
        }
    }

    /// Pointer released. Returns `SwipeRelease` only if a swipe was under way;
    /// `None` means the gesture was a tap.
    pub fn release(&mut self) -> Option<NavigationIntent> {
        let was_swipe = self.started;
        self.cancel();
        was_swipe.then_some(NavigationIntent::SwipeRelease)
    }

    pub fn cancel(&mut self) {
        self.origin = None;
        self.started = false;
    }

    pub fn is_pressed(&self) -> bool {
        self.origin.is_some()
    }

    /// True once the current gesture has produced a swipe.
    pub fn moved(&self) -> bool {
        self.started
    }
}
