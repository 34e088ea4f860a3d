use super::Head;

/// Why a chat message could not be turned into a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("invalid body: message has no text body")]
    InvalidBody,
    #[error("invalid command: {head} needs at least {min} tokens, got {got}")]
    InvalidCommand { head: Head, min: usize, got: usize },
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("invalid type: expected {expected}, got {token:?}")]
    InvalidType { token: String, expected: &'static str },
}
