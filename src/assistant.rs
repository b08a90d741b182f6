//! The answer pipeline in front of the overlay: selected text (or text read
//! from a screenshot) plus a stored instruction goes to a chat-completion
//! backend, and the reply becomes the overlay result.
//!
//! Only the interfaces live here. HTTP clients for a concrete provider
//! implement [`ChatClient`] and [`OcrClient`] outside this crate.

use anyhow::{anyhow, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::settings::{load_chat_prompt, load_prompt, SettingsStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

pub trait ChatClient {
    /// Send `messages` and return the first choice's text.
    fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

pub trait OcrClient {
    /// Recognize text in a `data:image/...;base64,` URL.
    fn recognize(&self, image_data_url: &str) -> Result<String>;
}

/// A hotkey request: one user message carrying the instruction and the task.
pub fn compose_messages(prompt: &str, selected: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::new(
        Role::User,
        format!("Instruction: {prompt}\n\nTask: {selected}"),
    )]
}

/// A chat-panel request: system instruction, prior turns, then the new message.
pub fn compose_chat(system_prompt: &str, history: &[ChatMessage], message: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::new(Role::System, system_prompt));
    messages.extend_from_slice(history);
    messages.push(ChatMessage::new(Role::User, message));
    messages
}

/// Pull the reply text out of an OpenAI-style chat-completion body.
pub fn extract_completion(body: &Value) -> Result<String> {
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(anyhow!("API returned an error: {message}"));
    }

    let content = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.pointer("/message/content"))
        .and_then(Value::as_str)
        .with_context(|| format!("unexpected response shape: {body}"))?;
    ensure!(!content.is_empty(), "response contained an empty answer");
    Ok(content.to_string())
}

pub fn validate_image_data_url(image_data_url: &str) -> Result<()> {
    ensure!(
        image_data_url.starts_with("data:image/"),
        "image must be a data:image/ URL"
    );
    let (_, payload) = image_data_url
        .split_once(";base64,")
        .context("image must be base64 encoded")?;
    ensure!(!payload.is_empty(), "image payload is empty");
    Ok(())
}

/// Answer the selection with the instruction in hotkey `slot`.
///
/// Every outcome is text for the overlay: the answer, or a message saying
/// what went wrong.
pub fn answer_selection(
    client: &dyn ChatClient,
    store: &dyn SettingsStore,
    slot: usize,
    selected: &str,
) -> String {
    if selected.trim().is_empty() {
        return "Select some text before using the hotkey.".to_string();
    }
    let Some(prompt) = load_prompt(store, slot) else {
        return format!("No prompt is configured for slot {slot}.");
    };

    info!(slot, chars = selected.chars().count(), "requesting answer");
    match client.complete(&compose_messages(&prompt, selected)) {
        Ok(answer) => answer,
        Err(err) => {
            warn!(error = %format!("{err:#}"), "answer request failed");
            format!("The request failed: {err:#}")
        }
    }
}

/// Continue a chat-panel conversation using the stored chat instruction.
pub fn answer_chat(
    client: &dyn ChatClient,
    store: &dyn SettingsStore,
    history: &[ChatMessage],
    message: &str,
) -> String {
    let messages = compose_chat(&load_chat_prompt(store), history, message);
    match client.complete(&messages) {
        Ok(answer) => answer,
        Err(err) => {
            warn!(error = %format!("{err:#}"), "chat request failed");
            format!("The request failed: {err:#}")
        }
    }
}

/// Read text from a cropped screenshot, then answer it like a selection.
pub fn answer_screenshot(
    ocr: &dyn OcrClient,
    client: &dyn ChatClient,
    store: &dyn SettingsStore,
    slot: usize,
    image_data_url: &str,
) -> String {
    let recognized = validate_image_data_url(image_data_url)
        .and_then(|_| ocr.recognize(image_data_url));
    match recognized {
        Ok(text) => answer_selection(client, store, slot, &text),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "text recognition failed");
            format!("Text recognition failed: {err:#}")
        }
    }
}
