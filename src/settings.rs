//! Persistent key/value settings shared by the overlay and the CLI.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, ensure, Context, Result};
use serde_json::{Map, Value};
use tracing::warn;

use crate::config::{DelayRange, DEFAULT_MAX_TYPING_DELAY_MS, DEFAULT_MIN_TYPING_DELAY_MS};

pub const MIN_TYPING_DELAY_KEY: &str = "minTypingDelay";
pub const MAX_TYPING_DELAY_KEY: &str = "maxTypingDelay";
/// Instruction used by the free-form chat panel.
pub const CHAT_PROMPT_KEY: &str = "prompt";
/// Instructions bound to the numbered hotkeys, slot 1 first.
pub const PROMPT_SLOT_KEYS: [&str; 3] = ["prompt1", "prompt2", "prompt3"];

pub const DEFAULT_CHAT_PROMPT: &str = "Answer only. Be brief and clear. If this is code, fix any \
errors and show it in full. If the code has gaps, fill them in.";

pub trait SettingsStore {
    /// Values for the requested keys. Absent keys are simply missing.
    fn get(&self, keys: &[&str]) -> Map<String, Value>;

    fn set(&mut self, items: Map<String, Value>) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, keys: &[&str]) -> Map<String, Value> {
        keys.iter()
            .filter_map(|k| self.values.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect()
    }

    fn set(&mut self, items: Map<String, Value>) -> Result<()> {
        self.values.extend(items);
        Ok(())
    }
}

/// Settings kept as a flat JSON object on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonFileStore {
    /// Open `path`, treating a missing file as empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            match serde_json::from_str::<Value>(&json)
                .with_context(|| format!("failed to parse {}", path.display()))?
            {
                Value::Object(map) => map,
                _ => return Err(anyhow!("{} must contain a JSON object", path.display())),
            }
        } else {
            Map::new()
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, keys: &[&str]) -> Map<String, Value> {
        keys.iter()
            .filter_map(|k| self.values.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect()
    }

    fn set(&mut self, items: Map<String, Value>) -> Result<()> {
        self.values.extend(items);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.values)
            .context("failed to serialize settings")?;
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

fn delay_value(values: &Map<String, Value>, key: &str, default: u64) -> u64 {
    match values.get(key) {
        None | Some(Value::Null) => default,
        Some(v) => match v.as_u64().or_else(|| v.as_f64().map(|f| f.max(0.0).round() as u64)) {
            Some(ms) => ms,
            None => {
                warn!(key, value = %v, "ignoring non-numeric typing delay setting");
                default
            }
        },
    }
}

/// Read the typing delays, defaulting to 30/120 ms.
pub fn load_typing_delays(store: &dyn SettingsStore) -> DelayRange {
    let values = store.get(&[MIN_TYPING_DELAY_KEY, MAX_TYPING_DELAY_KEY]);
    DelayRange::sanitized(
        delay_value(&values, MIN_TYPING_DELAY_KEY, DEFAULT_MIN_TYPING_DELAY_MS),
        delay_value(&values, MAX_TYPING_DELAY_KEY, DEFAULT_MAX_TYPING_DELAY_MS),
    )
}

pub fn save_typing_delays(
    store: &mut dyn SettingsStore,
    min_ms: Option<u64>,
    max_ms: Option<u64>,
) -> Result<()> {
    let mut items = Map::new();
    if let Some(ms) = min_ms {
        items.insert(MIN_TYPING_DELAY_KEY.to_string(), Value::from(ms));
    }
    if let Some(ms) = max_ms {
        items.insert(MAX_TYPING_DELAY_KEY.to_string(), Value::from(ms));
    }
    if items.is_empty() {
        return Ok(());
    }
    store.set(items)
}

fn prompt_key(slot: usize) -> Result<&'static str> {
    ensure!(
        (1..=PROMPT_SLOT_KEYS.len()).contains(&slot),
        "prompt slot must be between 1 and {}",
        PROMPT_SLOT_KEYS.len()
    );
    Ok(PROMPT_SLOT_KEYS[slot - 1])
}

/// The instruction stored for hotkey `slot` (1-based), if one is set.
pub fn load_prompt(store: &dyn SettingsStore, slot: usize) -> Option<String> {
    let key = prompt_key(slot).ok()?;
    match store.get(&[key]).remove(key) {
        Some(Value::String(prompt)) if !prompt.trim().is_empty() => Some(prompt),
        None | Some(Value::Null) | Some(Value::String(_)) => None,
        Some(other) => {
            warn!(key, value = %other, "ignoring non-string prompt setting");
            None
        }
    }
}

pub fn save_prompt(store: &mut dyn SettingsStore, slot: usize, prompt: &str) -> Result<()> {
    let key = prompt_key(slot)?;
    let mut items = Map::new();
    items.insert(key.to_string(), Value::from(prompt));
    store.set(items)
}

pub fn load_chat_prompt(store: &dyn SettingsStore) -> String {
    match store.get(&[CHAT_PROMPT_KEY]).remove(CHAT_PROMPT_KEY) {
        Some(Value::String(prompt)) if !prompt.trim().is_empty() => prompt,
        _ => DEFAULT_CHAT_PROMPT.to_string(),
    }
}
