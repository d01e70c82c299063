//! Conversation title derivation.

use std::str::FromStr;

/// Number of characters kept from the user's text.
pub const TITLE_MAX_CHARS: usize = 20;

/// Appended when the text was cut short.
pub const TITLE_CONTINUATION: &str = "...";

/// Title shown before any message is submitted.
pub const DEFAULT_TITLE: &str = "新对话";

/// Derive a conversation title from submitted text.
///
/// Counts Unicode scalar values, so CJK input is never split mid-character.
#[must_use]
pub fn derive_title(text: &str) -> String {
    match text.char_indices().nth(TITLE_MAX_CHARS) {
        Some((cut, _)) => format!("{}{TITLE_CONTINUATION}", &text[..cut]),
        None => text.to_string(),
    }
}

/// Environment variable selecting the [`TitlePolicy`].
pub const TITLE_POLICY_VAR: &str = "TITLE_POLICY";

/// Which submissions rename a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TitlePolicy {
    /// Every submission renames the conversation after its latest input.
    #[default]
    EveryMessage,
    /// Only the first submission names the conversation.
    FirstMessage,
}

impl TitlePolicy {
    /// Title to apply for a submission, or `None` to keep the existing one.
    #[must_use]
    pub fn next_title(self, is_first_message: bool, text: &str) -> Option<String> {
        match self {
            Self::EveryMessage => Some(derive_title(text)),
            Self::FirstMessage => is_first_message.then(|| derive_title(text)),
        }
    }
}

impl FromStr for TitlePolicy {
    type Err = String;

    /// Accepts `every_message` or `first_message`, case-insensitively.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "every_message" => Ok(Self::EveryMessage),
            "first_message" => Ok(Self::FirstMessage),
            other => Err(format!("{TITLE_POLICY_VAR} must be every_message or first_message, got '{other}'")),
        }
    }
}

#[cfg(test)]
#[path = "title_test.rs"]
mod tests;
