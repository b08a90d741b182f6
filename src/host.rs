//! One page with both contexts installed: the session controller and the
//! overlay, connected by the page channel and sharing one clock.

use std::time::Duration;

use rand::Rng;
use tracing::trace;

use crate::channel::{Listener, PageChannel};
use crate::config::TypingConfig;
use crate::controller::TypingController;
use crate::keyboard::KeyEvent;
use crate::model::TypingState;
use crate::overlay::OverlayController;
use crate::page::{ElementRef, MemoryPage, Page};
use crate::settings::SettingsStore;

pub struct PageHost<R: Rng, S: SettingsStore> {
    page: MemoryPage,
    channel: PageChannel,
    controller: TypingController<MemoryPage, R>,
    overlay: OverlayController<S>,
    controller_inbox: Listener,
    overlay_inbox: Listener,
    now: Duration,
    states: Vec<TypingState>,
}

impl<R: Rng, S: SettingsStore> PageHost<R, S> {
    pub fn new(config: TypingConfig, rng: R, settings: S) -> Self {
        let page = MemoryPage::new();
        let channel = PageChannel::new();
        let controller_inbox = channel.listen();
        let overlay_inbox = channel.listen();
        let overlay = OverlayController::new(settings, channel.poster(), config.countdown);
        let controller = TypingController::new(page.clone(), rng, config, channel.poster());
        let mut host = Self {
            page,
            channel,
            controller,
            overlay,
            controller_inbox,
            overlay_inbox,
            now: Duration::ZERO,
            states: Vec::new(),
        };
        host.deliver();
        host
    }

    pub fn page(&self) -> &MemoryPage {
        &self.page
    }

    pub fn channel(&self) -> &PageChannel {
        &self.channel
    }

    pub fn controller(&self) -> &TypingController<MemoryPage, R> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut TypingController<MemoryPage, R> {
        &mut self.controller
    }

    pub fn overlay(&self) -> &OverlayController<S> {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut OverlayController<S> {
        &mut self.overlay
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Every `typing_state` seen on the channel, in order.
    pub fn states(&self) -> &[TypingState] {
        &self.states
    }

    pub fn take_states(&mut self) -> Vec<TypingState> {
        std::mem::take(&mut self.states)
    }

    /// Move focus the way a click or tab would: blur the old element, then
    /// focus the new one.
    pub fn focus(&mut self, element: Option<ElementRef>) {
        let previous = self.page.set_focus(element.clone());
        if previous.is_some() {
            self.controller.on_blur(element.as_ref());
        }
        if let Some(element) = &element {
            self.controller.on_focus_in(element);
        }
        self.deliver();
    }

    pub fn key_down(&mut self, event: &KeyEvent) {
        self.controller.on_key_down(event);
        self.deliver();
    }

    pub fn show_result(&mut self, raw: &str) {
        self.overlay.show_result(raw);
        self.deliver();
    }

    pub fn click_type(&mut self) {
        self.overlay.click_type();
        self.deliver();
    }

    pub fn close_overlay(&mut self) {
        self.overlay.close();
        self.deliver();
    }

    /// Dispatch queued channel traffic until both sides are quiet.
    pub fn deliver(&mut self) {
        loop {
            let mut quiet = true;
            while let Some(message) = self.controller_inbox.recv() {
                quiet = false;
                self.controller.handle_message(message);
            }
            while let Some(message) = self.overlay_inbox.recv() {
                quiet = false;
                if let Some(n) = message.notification() {
                    trace!(state = ?n.state, "overlay saw state");
                    self.states.push(n.state);
                }
                self.overlay.on_message(&message);
            }
            if quiet {
                break;
            }
        }
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        match (self.controller.next_deadline(), self.overlay.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fire everything due by `now` in deadline order, delivering channel
    /// traffic between timers.
    pub fn advance_to(&mut self, now: Duration) {
        self.deliver();
        while let Some(deadline) = self.next_deadline().filter(|d| *d <= now) {
            self.now = self.now.max(deadline);
            self.controller.fire_due(deadline);
            self.overlay.fire_due(deadline);
            self.deliver();
        }
        self.now = self.now.max(now);
        self.controller.advance_clock(self.now);
        self.overlay.advance_clock(self.now);
    }

    pub fn advance_by(&mut self, delta: Duration) {
        self.advance_to(self.now + delta);
    }

    /// Run until no timer is pending or `limit` of virtual time has passed.
    pub fn run_until_settled(&mut self, limit: Duration) -> TypingState {
        let end = self.now + limit;
        while let Some(deadline) = self.next_deadline() {
            if deadline > end {
                break;
            }
            self.advance_to(deadline);
        }
        self.controller.state()
    }

    pub fn active_element(&self) -> Option<ElementRef> {
        self.page.active_element()
    }
}
