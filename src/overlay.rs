//! Overlay side of the channel: the result popup and its type button.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::channel::Poster;
use crate::model::{Command, TypingState, WireMessage};
use crate::settings::{load_typing_delays, SettingsStore};
use crate::timer::{TimerId, Timers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonIcon {
    Play,
    Pause,
    Spinner,
    Done,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ButtonView {
    pub icon: ButtonIcon,
    pub title: &'static str,
    pub disabled: bool,
}

impl ButtonView {
    pub fn for_state(state: TypingState) -> Self {
        let (icon, title, disabled) = match state {
            TypingState::Idle => (ButtonIcon::Play, "Type into the focused field", false),
            TypingState::WaitingToStart => {
                (ButtonIcon::Spinner, "Starting soon. Click to cancel", false)
            }
            TypingState::Typing => (ButtonIcon::Pause, "Pause typing", false),
            TypingState::Paused => (ButtonIcon::Play, "Resume typing", false),
            TypingState::Completed => (ButtonIcon::Done, "Typing complete", true),
            TypingState::NoInputTarget => (ButtonIcon::Error, "No input field focused", true),
        };
        Self {
            icon,
            title,
            disabled,
        }
    }
}

/// Remove markdown code fence lines (three backticks plus an optional
/// language tag) so only the fenced content gets typed.
pub fn strip_code_fences(raw: &str) -> String {
    raw.split_inclusive('\n')
        .map(|line| {
            let Some(rest) = line.strip_prefix("```") else {
                return line;
            };
            let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_');
            rest.strip_prefix('\n').unwrap_or(rest)
        })
        .collect()
}

pub struct OverlayController<S: SettingsStore> {
    settings: S,
    outbox: Poster,
    countdown: Duration,
    timers: Timers,
    countdown_timer: Option<TimerId>,
    state: TypingState,
    answer: Option<String>,
}

impl<S: SettingsStore> OverlayController<S> {
    pub fn new(settings: S, outbox: Poster, countdown: Duration) -> Self {
        Self {
            settings,
            outbox,
            countdown,
            timers: Timers::new(),
            countdown_timer: None,
            state: TypingState::Idle,
            answer: None,
        }
    }

    pub fn state(&self) -> TypingState {
        self.state
    }

    /// Text the type button will send, once a result is showing.
    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.answer.is_some()
    }

    pub fn button(&self) -> ButtonView {
        ButtonView::for_state(self.state)
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut S {
        &mut self.settings
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    pub fn advance_clock(&mut self, now: Duration) {
        self.timers.set_now(now);
    }

    pub fn fire_due(&mut self, now: Duration) {
        while let Some(id) = self.timers.pop_due(now) {
            self.on_timer(id);
        }
        self.timers.set_now(now);
    }

    /// Show a fresh answer. Replacing an open popup abandons its run.
    pub fn show_result(&mut self, raw: &str) {
        if self.is_open() {
            self.cancel_countdown();
            self.outbox.post(Command::Reset);
        }
        self.answer = Some(strip_code_fences(raw));
        self.state = TypingState::Idle;
    }

    pub fn close(&mut self) {
        self.cancel_countdown();
        self.outbox.post(Command::Reset);
        self.answer = None;
        self.state = TypingState::Idle;
    }

    /// Ignored while the button is disabled.
    pub fn click_type(&mut self) {
        if !self.is_open() || self.button().disabled {
            return;
        }
        match self.state {
            TypingState::Idle | TypingState::Paused => {
                self.cancel_countdown();
                self.state = TypingState::WaitingToStart;
                self.countdown_timer = Some(self.timers.schedule(self.countdown));
                info!(
                    secs = self.countdown.as_secs_f32(),
                    "typing starts after countdown"
                );
            }
            TypingState::Typing => self.outbox.post(Command::Pause),
            TypingState::WaitingToStart => {
                self.cancel_countdown();
                self.state = TypingState::Idle;
                self.outbox.post(Command::Reset);
                info!("countdown cancelled");
            }
            TypingState::Completed | TypingState::NoInputTarget => {
                debug!(state = ?self.state, "type button disabled")
            }
        }
    }

    pub fn on_notification(&mut self, state: TypingState) {
        if !self.is_open() {
            return;
        }
        self.cancel_countdown();
        self.state = state;
    }

    /// Apply a message seen on the channel. Commands (our own echoes) are skipped.
    pub fn on_message(&mut self, message: &WireMessage) {
        if let Some(notification) = message.notification() {
            self.on_notification(notification.state);
        }
    }

    fn on_timer(&mut self, id: TimerId) {
        if self.countdown_timer != Some(id) {
            return;
        }
        self.countdown_timer = None;
        if self.state != TypingState::WaitingToStart {
            return;
        }
        let Some(text) = self.answer.clone() else {
            return;
        };
        let delays = load_typing_delays(&self.settings);
        debug!(
            min_ms = delays.min_ms(),
            max_ms = delays.max_ms(),
            "countdown finished"
        );
        self.outbox.post(Command::Start {
            text,
            min_delay_ms: Some(delays.min_ms()),
            max_delay_ms: Some(delays.max_ms()),
        });
    }

    fn cancel_countdown(&mut self) {
        if let Some(id) = self.countdown_timer.take() {
            self.timers.cancel(id);
        }
    }
}
