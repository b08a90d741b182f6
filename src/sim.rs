use std::time::Duration;

use anyhow::{ensure, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::TypingConfig;
use crate::host::PageHost;
use crate::model::{Command, TypingState};
use crate::page::{ElementRef, MemoryElement, PageElement};
use crate::settings::MemoryStore;

/// Virtual time after which a simulation gives up.
pub const DEFAULT_SIM_LIMIT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct SimOptions {
    pub seed: u64,
    pub config: TypingConfig,
    /// Type into a content-editable region instead of a textarea.
    pub rich: bool,
    pub limit: Duration,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            config: TypingConfig::default(),
            rich: false,
            limit: DEFAULT_SIM_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub final_text: String,
    pub final_state: TypingState,
    pub states: Vec<TypingState>,
    /// Edits applied to the field, typo corrections included.
    pub edits: usize,
    pub typos: usize,
    pub elapsed_ms: u64,
}

impl SimReport {
    pub fn matches(&self, text: &str) -> bool {
        self.final_text == text
    }
}

/// Type `text` into a fresh in-memory field on the virtual clock.
pub fn simulate_typing(text: &str, options: &SimOptions) -> Result<SimReport> {
    options.config.validate()?;
    ensure!(!text.is_empty(), "nothing to type");

    let mut host = PageHost::new(
        options.config.clone(),
        StdRng::seed_from_u64(options.seed),
        MemoryStore::new(),
    );

    let field: ElementRef = if options.rich {
        MemoryElement::content_editable()
    } else {
        MemoryElement::textarea()
    };
    host.focus(Some(field.clone()));

    host.channel().poster().post(Command::Start {
        text: text.to_string(),
        min_delay_ms: Some(options.config.min_delay_ms),
        max_delay_ms: Some(options.config.max_delay_ms),
    });
    host.deliver();

    let started = host.now();
    let final_state = host.run_until_settled(options.limit);

    Ok(SimReport {
        final_text: field.value(),
        final_state,
        states: host.states().to_vec(),
        edits: host.controller().edits_applied(),
        typos: host.controller().session().typos_started(),
        elapsed_ms: (host.now() - started).as_millis() as u64,
    })
}
