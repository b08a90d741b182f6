use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypingState {
    #[default]
    Idle,
    /// Overlay-side countdown before `Start` is sent. The session never reports it.
    WaitingToStart,
    Typing,
    Paused,
    Completed,
    NoInputTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start {
        text: String,
        min_delay_ms: Option<u64>,
        max_delay_ms: Option<u64>,
    },
    Pause,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateNotification {
    pub state: TypingState,
}

/// Everything that crosses the page channel, in post-message form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    StartTyping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_delay_ms: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_delay_ms: Option<u64>,
    },
    PauseTyping,
    ResetTyping,
    TypingState {
        state: TypingState,
    },
}

/// What the session side makes of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command(Command),
    /// `start_typing` without usable text.
    MalformedStart,
}

impl WireMessage {
    pub fn into_inbound(self) -> Option<Inbound> {
        match self {
            WireMessage::StartTyping {
                text,
                min_delay_ms,
                max_delay_ms,
            } => match text {
                Some(text) if !text.is_empty() => Some(Inbound::Command(Command::Start {
                    text,
                    min_delay_ms,
                    max_delay_ms,
                })),
                _ => Some(Inbound::MalformedStart),
            },
            WireMessage::PauseTyping => Some(Inbound::Command(Command::Pause)),
            WireMessage::ResetTyping => Some(Inbound::Command(Command::Reset)),
            WireMessage::TypingState { .. } => None,
        }
    }

    pub fn notification(&self) -> Option<StateNotification> {
        match self {
            WireMessage::TypingState { state } => Some(StateNotification { state: *state }),
            _ => None,
        }
    }
}

impl From<Command> for WireMessage {
    fn from(command: Command) -> Self {
        match command {
            Command::Start {
                text,
                min_delay_ms,
                max_delay_ms,
            } => WireMessage::StartTyping {
                text: Some(text),
                min_delay_ms,
                max_delay_ms,
            },
            Command::Pause => WireMessage::PauseTyping,
            Command::Reset => WireMessage::ResetTyping,
        }
    }
}

impl From<StateNotification> for WireMessage {
    fn from(n: StateNotification) -> Self {
        WireMessage::TypingState { state: n.state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn start_message_uses_snake_case_tag() {
        let msg = WireMessage::from(Command::Start {
            text: "hi".to_string(),
            min_delay_ms: Some(10),
            max_delay_ms: None,
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"type": "start_typing", "text": "hi", "min_delay_ms": 10})
        );
    }

    #[test]
    fn state_notification_serializes_no_input_target() {
        let msg = WireMessage::from(StateNotification {
            state: TypingState::NoInputTarget,
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"type": "typing_state", "state": "no_input_target"})
        );
    }

    #[test]
    fn start_without_text_is_malformed() {
        let msg: WireMessage = serde_json::from_value(json!({"type": "start_typing"})).unwrap();
        assert_eq!(msg.into_inbound(), Some(Inbound::MalformedStart));

        let msg: WireMessage =
            serde_json::from_value(json!({"type": "start_typing", "text": ""})).unwrap();
        assert_eq!(msg.into_inbound(), Some(Inbound::MalformedStart));
    }

    #[test]
    fn state_messages_are_not_commands() {
        let msg = WireMessage::TypingState {
            state: TypingState::Typing,
        };
        assert_eq!(msg.clone().into_inbound(), None);
        assert_eq!(
            msg.notification(),
            Some(StateNotification {
                state: TypingState::Typing
            })
        );
    }
}
