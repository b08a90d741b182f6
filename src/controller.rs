use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, trace, warn};

use crate::channel::Poster;
use crate::config::{DelayRange, TypingConfig};
use crate::editor::{insert_char, remove_last_char};
use crate::focus::{FocusTracker, FocusTrigger};
use crate::keyboard::KeyEvent;
use crate::model::{Command, Inbound, StateNotification, TypingState, WireMessage};
use crate::page::{ElementRef, Page};
use crate::session::{Edit, Pacing, Step, TypingSession};
use crate::timer::{TimerId, Timers};

/// Owns the single typing session and everything that drives it.
///
/// Command handlers, focus handlers and timer callbacks all run on the same
/// thread, so the session has exactly one mutator at a time.
pub struct TypingController<P: Page, R: Rng> {
    page: P,
    rng: R,
    config: TypingConfig,
    session: TypingSession,
    focus: FocusTracker,
    timers: Timers,
    tick: Option<TimerId>,
    outbox: Poster,
    edits_applied: usize,
}

impl<P: Page, R: Rng> TypingController<P, R> {
    /// Install the controller and announce `Idle` on the channel.
    pub fn new(page: P, rng: R, config: TypingConfig, outbox: Poster) -> Self {
        let controller = Self {
            page,
            rng,
            config,
            session: TypingSession::default(),
            focus: FocusTracker::new(),
            timers: Timers::new(),
            tick: None,
            outbox,
            edits_applied: 0,
        };
        controller.notify(TypingState::Idle);
        controller
    }

    pub fn state(&self) -> TypingState {
        self.session.status()
    }

    pub fn session(&self) -> &TypingSession {
        &self.session
    }

    pub fn config(&self) -> &TypingConfig {
        &self.config
    }

    /// Edits applied to targets since this controller was created.
    pub fn edits_applied(&self) -> usize {
        self.edits_applied
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    pub fn advance_clock(&mut self, now: Duration) {
        self.timers.set_now(now);
    }

    /// Run every timer due by `now`.
    pub fn fire_due(&mut self, now: Duration) {
        while let Some(id) = self.timers.pop_due(now) {
            self.on_timer(id);
        }
        self.timers.set_now(now);
    }

    pub fn handle_message(&mut self, message: WireMessage) {
        match message.into_inbound() {
            Some(Inbound::Command(command)) => self.handle_command(command),
            Some(Inbound::MalformedStart) => {
                warn!("start command without text; resynchronizing overlay");
                self.notify(TypingState::Idle);
            }
            None => {}
        }
    }

    pub fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start {
                text,
                min_delay_ms,
                max_delay_ms,
            } => self.start(&text, min_delay_ms, max_delay_ms),
            Command::Pause => self.pause(),
            Command::Reset => self.reset(),
        }
    }

    pub fn on_focus_in(&mut self, element: &ElementRef) {
        let trigger = self.focus.on_focus_in(element, &self.session);
        self.apply_trigger(trigger);
    }

    pub fn on_blur(&mut self, related: Option<&ElementRef>) {
        let trigger = self.focus.on_blur(related, &self.session);
        self.apply_trigger(trigger);
    }

    pub fn on_key_down(&mut self, event: &KeyEvent) {
        let trigger = self.focus.on_key_down(event, &self.session);
        self.apply_trigger(trigger);
    }

    fn apply_trigger(&mut self, trigger: Option<FocusTrigger>) {
        match trigger {
            Some(FocusTrigger::Pause) => self.pause(),
            Some(FocusTrigger::Reset) => self.reset(),
            None => {}
        }
    }

    fn start(&mut self, text: &str, min_delay_ms: Option<u64>, max_delay_ms: Option<u64>) {
        if text.is_empty() {
            warn!("start command without text; resynchronizing overlay");
            self.notify(TypingState::Idle);
            return;
        }

        if self.session.is_typing() && self.tick.is_some() {
            debug!("already typing; ignoring start");
            return;
        }

        let focused = self
            .page
            .active_element()
            .filter(|el| el.kind().is_eligible());
        let Some(target) = focused else {
            warn!("focused element is not an input field; cannot start typing");
            self.cancel_tick();
            self.session.set_status(TypingState::NoInputTarget);
            self.notify(TypingState::NoInputTarget);
            return;
        };

        let delays = DelayRange::or_defaults(min_delay_ms, max_delay_ms, self.config.delays());
        let pacing = Pacing::from_config(&self.config, delays);

        let resume = self.session.status() != TypingState::Completed
            && !self.session.is_finished()
            && self.session.has_text(text);
        if resume {
            self.session.set_pacing(pacing);
            if !self.session.is_target(&target) {
                if let Some(typo) = self.session.drop_pending_typo() {
                    debug!(index = typo.index, "target changed mid-typo; dropping correction");
                }
            }
        } else {
            self.session =
                TypingSession::new(text, pacing, self.config.typo_budget, &mut self.rng);
        }

        self.session.set_target(&target);
        self.session.set_status(TypingState::Typing);
        self.notify(TypingState::Typing);
        info!(
            cursor = self.session.cursor(),
            len = self.session.len(),
            resume,
            "typing started"
        );

        self.schedule_tick(Duration::ZERO);
    }

    fn pause(&mut self) {
        if !self.session.is_typing() {
            debug!(state = ?self.state(), "not typing; ignoring pause");
            return;
        }
        self.cancel_tick();
        self.session.set_status(TypingState::Paused);
        self.notify(TypingState::Paused);
        info!(cursor = self.session.cursor(), "typing paused");
    }

    fn reset(&mut self) {
        self.cancel_tick();
        self.session = TypingSession::default();
        self.notify(TypingState::Idle);
        info!("typing reset");
    }

    fn complete(&mut self) {
        self.cancel_tick();
        self.session.set_status(TypingState::Completed);
        self.notify(TypingState::Completed);
        info!(len = self.session.len(), "typing completed");
    }

    fn on_timer(&mut self, id: TimerId) {
        if self.tick != Some(id) {
            trace!(?id, "stale timer");
            return;
        }
        self.tick = None;
        self.run_tick();
    }

    fn run_tick(&mut self) {
        if !self.session.is_typing() {
            return;
        }

        if self.session.is_finished() {
            self.complete();
            return;
        }

        let Some(target) = self.session.target().filter(|t| t.is_connected()) else {
            // No reschedule: the next focus change or keystroke decides.
            warn!(cursor = self.session.cursor(), "typing target is gone; playback stalled");
            return;
        };

        match self.session.advance(&mut self.rng) {
            Step::Finished => self.complete(),
            Step::Edit { edit, next } => {
                let applied = match edit {
                    Edit::Insert(c) => insert_char(&*target, c),
                    Edit::RemoveLast => remove_last_char(&*target),
                };
                if applied {
                    self.edits_applied += 1;
                }
                trace!(?edit, next_ms = next.as_millis() as u64, "tick");
                self.schedule_tick(next);
            }
        }
    }

    fn schedule_tick(&mut self, delay: Duration) {
        self.cancel_tick();
        self.tick = Some(self.timers.schedule(delay));
    }

    fn cancel_tick(&mut self) {
        if let Some(id) = self.tick.take() {
            self.timers.cancel(id);
        }
    }

    fn notify(&self, state: TypingState) {
        debug!(?state, "typing state");
        self.outbox.post(StateNotification { state });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Listener, PageChannel};
    use crate::page::{MemoryElement, MemoryPage, PageElement};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Rig {
        page: MemoryPage,
        inbox: Listener,
        controller: TypingController<MemoryPage, StdRng>,
    }

    fn rig(config: TypingConfig) -> Rig {
        let channel = PageChannel::new();
        let inbox = channel.listen();
        let page = MemoryPage::new();
        let controller = TypingController::new(
            page.clone(),
            StdRng::seed_from_u64(42),
            config,
            channel.poster(),
        );
        Rig {
            page,
            inbox,
            controller,
        }
    }

    fn no_typos() -> TypingConfig {
        TypingConfig {
            typo_budget: 0,
            ..Default::default()
        }
    }

    fn start(text: &str) -> Command {
        Command::Start {
            text: text.to_string(),
            min_delay_ms: Some(10),
            max_delay_ms: Some(10),
        }
    }

    fn states(inbox: &Listener) -> Vec<TypingState> {
        inbox
            .drain()
            .iter()
            .filter_map(|m| m.notification())
            .map(|n| n.state)
            .collect()
    }

    #[test]
    fn announces_idle_on_install() {
        let rig = rig(no_typos());
        assert_eq!(states(&rig.inbox), vec![TypingState::Idle]);
    }

    #[test]
    fn start_without_focus_reports_no_input_target() {
        let mut rig = rig(no_typos());
        rig.page.set_focus(Some(MemoryElement::button()));
        states(&rig.inbox);

        rig.controller.handle_command(start("hello"));
        assert_eq!(rig.controller.state(), TypingState::NoInputTarget);
        assert_eq!(states(&rig.inbox), vec![TypingState::NoInputTarget]);
        assert_eq!(rig.controller.pending_timers(), 0);
    }

    #[test]
    fn types_to_completion() {
        let mut rig = rig(no_typos());
        let field = MemoryElement::text_input();
        rig.page.set_focus(Some(field.clone()));
        states(&rig.inbox);

        rig.controller.handle_command(start("abc"));
        rig.controller.fire_due(Duration::from_secs(5));

        assert_eq!(field.value(), "abc");
        assert_eq!(rig.controller.state(), TypingState::Completed);
        assert_eq!(
            states(&rig.inbox),
            vec![TypingState::Typing, TypingState::Completed]
        );
        assert_eq!(rig.controller.edits_applied(), 3);
    }

    #[test]
    fn redundant_start_is_ignored() {
        let mut rig = rig(no_typos());
        let field = MemoryElement::text_input();
        rig.page.set_focus(Some(field.clone()));
        rig.controller.handle_command(start("abc"));
        states(&rig.inbox);

        rig.controller.handle_command(start("abc"));
        rig.controller.handle_command(start("other"));
        assert!(states(&rig.inbox).is_empty());
        assert_eq!(rig.controller.pending_timers(), 1);

        rig.controller.fire_due(Duration::from_secs(5));
        assert_eq!(field.value(), "abc");
    }

    #[test]
    fn pause_outside_typing_is_quiet() {
        let mut rig = rig(no_typos());
        states(&rig.inbox);
        rig.controller.handle_command(Command::Pause);
        assert!(states(&rig.inbox).is_empty());
        assert_eq!(rig.controller.state(), TypingState::Idle);
    }

    #[test]
    fn malformed_start_resynchronizes_idle() {
        let mut rig = rig(no_typos());
        states(&rig.inbox);
        rig.controller.handle_message(WireMessage::StartTyping {
            text: None,
            min_delay_ms: None,
            max_delay_ms: None,
        });
        rig.controller.handle_command(start(""));
        assert_eq!(
            states(&rig.inbox),
            vec![TypingState::Idle, TypingState::Idle]
        );
        assert_eq!(rig.controller.pending_timers(), 0);
    }

    #[test]
    fn detached_target_stalls_without_rescheduling() {
        let mut rig = rig(no_typos());
        let field = MemoryElement::text_input();
        rig.page.set_focus(Some(field.clone()));
        rig.controller.handle_command(start("abcdef"));
        rig.controller.fire_due(Duration::from_millis(15));
        let typed = field.value();
        assert!(!typed.is_empty());

        field.detach();
        rig.controller.fire_due(Duration::from_secs(5));
        assert_eq!(field.value(), typed);
        assert_eq!(rig.controller.state(), TypingState::Typing);
        assert_eq!(rig.controller.pending_timers(), 0);
    }

    #[test]
    fn stalled_session_can_be_restarted_on_a_new_field() {
        let mut rig = rig(no_typos());
        let field = MemoryElement::text_input();
        rig.page.set_focus(Some(field.clone()));
        rig.controller.handle_command(start("abcdef"));
        rig.controller.fire_due(Duration::from_millis(15));
        let typed = field.value().chars().count();
        field.detach();
        rig.controller.fire_due(Duration::from_millis(100));

        let fresh = MemoryElement::text_input();
        rig.page.set_focus(Some(fresh.clone()));
        rig.controller.handle_command(start("abcdef"));
        rig.controller.fire_due(Duration::from_secs(5));

        let rest: String = "abcdef".chars().skip(typed).collect();
        assert_eq!(fresh.value(), rest);
        assert_eq!(rig.controller.state(), TypingState::Completed);
    }

    #[test]
    fn completed_run_starts_over_after_no_input_target() {
        let mut rig = rig(no_typos());
        let field = MemoryElement::text_input();
        rig.page.set_focus(Some(field.clone()));
        rig.controller.handle_command(start("hello"));
        rig.controller.fire_due(Duration::from_secs(5));
        assert_eq!(rig.controller.state(), TypingState::Completed);

        rig.page.set_focus(Some(MemoryElement::button()));
        rig.controller.handle_command(start("hello"));
        assert_eq!(rig.controller.state(), TypingState::NoInputTarget);

        let fresh = MemoryElement::text_input();
        rig.page.set_focus(Some(fresh.clone()));
        rig.controller.handle_command(start("hello"));
        assert_eq!(rig.controller.session().cursor(), 0);
        rig.controller.fire_due(Duration::from_secs(10));
        assert_eq!(fresh.value(), "hello");
        assert_eq!(rig.controller.state(), TypingState::Completed);
    }

    #[test]
    fn huge_delays_are_capped_instead_of_overflowing() {
        let mut rig = rig(no_typos());
        let field = MemoryElement::text_input();
        rig.page.set_focus(Some(field.clone()));
        rig.controller.handle_command(Command::Start {
            text: ".".to_string(),
            min_delay_ms: Some(u64::MAX),
            max_delay_ms: Some(u64::MAX),
        });
        rig.controller.fire_due(Duration::ZERO);
        assert_eq!(field.value(), ".");
        assert_eq!(
            rig.controller.next_deadline(),
            Some(Duration::from_millis(crate::config::DELAY_CEILING_MS + 200))
        );

        rig.controller.fire_due(Duration::from_secs(61));
        assert_eq!(rig.controller.state(), TypingState::Completed);
    }

    fn one_typo() -> TypingConfig {
        TypingConfig {
            typo_budget: 1,
            ..Default::default()
        }
    }

    #[test]
    fn resume_on_a_new_field_drops_the_open_correction() {
        let mut rig = rig(one_typo());
        let field = MemoryElement::text_input();
        rig.page.set_focus(Some(field.clone()));
        rig.controller.handle_command(start("ab"));
        // 'a' at 0 ms, the wrong neighbor of 'b' at 10 ms.
        rig.controller.fire_due(Duration::from_millis(10));
        assert!(rig.controller.session().pending_typo().is_some());
        let stray = field.value();
        assert_eq!(stray.chars().count(), 2);

        rig.controller.handle_command(Command::Pause);
        let other = MemoryElement::text_input().with_value("xyz");
        rig.page.set_focus(Some(other.clone()));
        rig.controller.handle_command(start("ab"));
        rig.controller.fire_due(Duration::from_secs(5));

        assert_eq!(other.value(), "xyzb");
        assert_eq!(field.value(), stray);
        assert_eq!(rig.controller.state(), TypingState::Completed);
    }

    #[test]
    fn resume_on_the_same_field_finishes_the_correction() {
        let mut rig = rig(one_typo());
        let field = MemoryElement::text_input();
        rig.page.set_focus(Some(field.clone()));
        rig.controller.handle_command(start("ab"));
        rig.controller.fire_due(Duration::from_millis(10));
        rig.controller.handle_command(Command::Pause);

        rig.controller.handle_command(start("ab"));
        rig.controller.fire_due(Duration::from_secs(5));
        assert_eq!(field.value(), "ab");
        assert_eq!(rig.controller.session().typos_started(), 1);
    }
}
