use tracing::debug;

use crate::keyboard::KeyEvent;
use crate::page::ElementRef;
use crate::session::TypingSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTrigger {
    Pause,
    Reset,
}

/// Turns page focus and keyboard activity into session triggers.
/// Stateless; `Start` reads the page's focus directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct FocusTracker;

impl FocusTracker {
    pub fn new() -> Self {
        Self
    }

    pub fn on_focus_in(
        &self,
        element: &ElementRef,
        session: &TypingSession,
    ) -> Option<FocusTrigger> {
        if element.kind().is_eligible() {
            if !session.has_target() || session.is_target(element) {
                return None;
            }
            if session.is_typing() {
                debug!("focus moved to another input field");
                return Some(FocusTrigger::Pause);
            }
            return None;
        }

        if session.is_typing() {
            debug!("focus moved to a non-input element");
            return Some(FocusTrigger::Pause);
        }
        None
    }

    /// `related` is the element receiving focus, if any.
    pub fn on_blur(
        &self,
        related: Option<&ElementRef>,
        session: &TypingSession,
    ) -> Option<FocusTrigger> {
        if !session.is_typing() || !session.has_target() {
            return None;
        }
        let keeps_input = related.map(|el| el.kind().is_eligible()).unwrap_or(false);
        if keeps_input {
            return None;
        }
        debug!("typing target lost focus");
        Some(FocusTrigger::Pause)
    }

    pub fn on_key_down(&self, event: &KeyEvent, session: &TypingSession) -> Option<FocusTrigger> {
        if session.is_requested() && event.is_manual_input() {
            debug!(key = %event.key, "manual input during auto-typing");
            return Some(FocusTrigger::Reset);
        }
        None
    }
}
