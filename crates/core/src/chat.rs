//! Chat message types and validation.

use serde::{Deserialize, Serialize};

/// Maximum length of a chat message, in characters.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Kind of chat message. Emoticons are gated by the session's
/// `allow_emoticons` flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Emoticon,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Emoticon => "emoticon",
        }
    }

    /// Parse the stored column value; unknown values read as text.
    pub fn from_db(value: &str) -> Self {
        match value {
            "emoticon" => Self::Emoticon,
            _ => Self::Text,
        }
    }
}

/// Validate and normalise a chat message body. Returns the trimmed text.
pub fn validate_message(message: &str) -> Result<String, String> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err("Message must not be empty".to_string());
    }
    let len = trimmed.chars().count();
    if len > MAX_MESSAGE_LEN {
        return Err(format!(
            "Message must be at most {MAX_MESSAGE_LEN} characters, got {len}"
        ));
    }
    Ok(trimmed.to_string())
}
