use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::Duration;

use rand::Rng;

use crate::config::{DelayRange, TypingConfig};
use crate::keyboard::qwerty_adjacent_char;
use crate::model::TypingState;
use crate::page::{same_element, ElementRef, WeakElementRef};
use crate::typo::{choose_typo_sites, PendingTypo, TypoPhase};

/// One mutation the playback step wants applied to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    Insert(char),
    RemoveLast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Apply `edit`, then tick again after `next`.
    Edit { edit: Edit, next: Duration },
    Finished,
}

/// Delay pacing shared by all ticks of one run.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub delays: DelayRange,
    pub typo_delay_ms_min: u64,
    pub typo_delay_ms_max: u64,
    pub sentence_pause_ms: u64,
    pub comma_pause_ms: u64,
}

impl Pacing {
    pub fn from_config(cfg: &TypingConfig, delays: DelayRange) -> Self {
        Self {
            delays,
            typo_delay_ms_min: cfg.typo_delay_ms_min,
            typo_delay_ms_max: cfg.typo_delay_ms_max.max(cfg.typo_delay_ms_min),
            sentence_pause_ms: cfg.sentence_pause_ms,
            comma_pause_ms: cfg.comma_pause_ms,
        }
    }

    pub fn char_delay(&self, c: char, rng: &mut impl Rng) -> Duration {
        let ms = rng.gen_range(self.delays.min_ms()..=self.delays.max_ms());
        Duration::from_millis(ms.saturating_add(self.punctuation_pause_ms(c)))
    }

    pub fn punctuation_pause_ms(&self, c: char) -> u64 {
        match c {
            '.' | '!' | '?' => self.sentence_pause_ms,
            ',' => self.comma_pause_ms,
            _ => 0,
        }
    }

    fn typo_delay(&self, rng: &mut impl Rng) -> Duration {
        Duration::from_millis(rng.gen_range(self.typo_delay_ms_min..=self.typo_delay_ms_max))
    }
}

/// The single playback context. `Default` is the empty, idle session.
#[derive(Debug, Default)]
pub struct TypingSession {
    text: Vec<char>,
    cursor: usize,
    target: Option<WeakElementRef>,
    pacing: Option<Pacing>,
    status: TypingState,
    typo_budget: usize,
    typo_sites: BTreeSet<usize>,
    pending_typo: Option<PendingTypo>,
    typos_started: usize,
}

impl TypingSession {
    /// A fresh run over `text`, typo sites chosen up front.
    pub fn new(text: &str, pacing: Pacing, typo_budget: usize, rng: &mut impl Rng) -> Self {
        let text: Vec<char> = text.chars().collect();
        let typo_sites = choose_typo_sites(&text, typo_budget, rng);
        Self {
            text,
            pacing: Some(pacing),
            typo_budget,
            typo_sites,
            ..Default::default()
        }
    }

    pub fn status(&self) -> TypingState {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: TypingState) {
        self.status = status;
    }

    pub fn is_typing(&self) -> bool {
        self.status == TypingState::Typing
    }

    /// Typing or paused: a run the user has asked for and not finished.
    pub fn is_requested(&self) -> bool {
        matches!(self.status, TypingState::Typing | TypingState::Paused)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn has_text(&self, text: &str) -> bool {
        !self.text.is_empty() && self.text.iter().copied().eq(text.chars())
    }

    /// Every character typed and no correction outstanding.
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.text.len() && self.pending_typo.is_none()
    }

    /// Forget a correction in flight. The character at the cursor is typed
    /// normally on the next step.
    pub fn drop_pending_typo(&mut self) -> Option<PendingTypo> {
        self.pending_typo.take()
    }

    pub fn typo_budget(&self) -> usize {
        self.typo_budget
    }

    pub fn typo_sites(&self) -> &BTreeSet<usize> {
        &self.typo_sites
    }

    pub fn pending_typo(&self) -> Option<PendingTypo> {
        self.pending_typo
    }

    pub fn typos_started(&self) -> usize {
        self.typos_started
    }

    pub fn pacing(&self) -> Option<Pacing> {
        self.pacing
    }

    pub fn set_pacing(&mut self, pacing: Pacing) {
        self.pacing = Some(pacing);
    }

    pub fn target(&self) -> Option<ElementRef> {
        self.target.as_ref().and_then(|w| w.upgrade())
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    pub fn is_target(&self, element: &ElementRef) -> bool {
        self.target
            .as_ref()
            .map(|w| same_element(element, w))
            .unwrap_or(false)
    }

    pub fn set_target(&mut self, element: &ElementRef) {
        self.target = Some(Rc::downgrade(element));
    }

    /// Compute the next playback step, advancing the cursor and typo state.
    ///
    /// The caller applies the returned edit to the target.
    pub fn advance(&mut self, rng: &mut impl Rng) -> Step {
        let Some(pacing) = self.pacing else {
            return Step::Finished;
        };

        if let Some(mut typo) = self.pending_typo.take() {
            return match typo.phase {
                TypoPhase::InsertWrongChar | TypoPhase::DeleteWrongChar => {
                    let edit = match typo.phase {
                        TypoPhase::InsertWrongChar => Edit::Insert(typo.substitute),
                        _ => Edit::RemoveLast,
                    };
                    if let Some(next) = typo.phase.next() {
                        typo.phase = next;
                        self.pending_typo = Some(typo);
                    }
                    Step::Edit {
                        edit,
                        next: pacing.typo_delay(rng),
                    }
                }
                TypoPhase::InsertCorrectChar => {
                    let c = self.text[typo.index];
                    self.cursor = typo.index + 1;
                    Step::Edit {
                        edit: Edit::Insert(c),
                        next: pacing.char_delay(c, rng),
                    }
                }
            };
        }

        if self.cursor >= self.text.len() {
            return Step::Finished;
        }

        let c = self.text[self.cursor];

        if self.typo_budget > 0 && self.typo_sites.remove(&self.cursor) {
            if let Some(substitute) = qwerty_adjacent_char(c, rng) {
                self.typo_budget -= 1;
                self.typos_started += 1;
                self.pending_typo = Some(PendingTypo {
                    index: self.cursor,
                    substitute,
                    phase: TypoPhase::DeleteWrongChar,
                });
                return Step::Edit {
                    edit: Edit::Insert(substitute),
                    next: pacing.typo_delay(rng),
                };
            }
        }

        self.cursor += 1;
        Step::Edit {
            edit: Edit::Insert(c),
            next: pacing.char_delay(c, rng),
        }
    }
}
