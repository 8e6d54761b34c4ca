//! Call results and their normalization to text

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder returned when a call produced no text at all
pub const NO_OUTPUT: &str = "(no output)";

/// One typed part of a call result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContentPart {
    Text(String),
    /// Any non-text part (image, audio, resource, ...). Dropped by normalization.
    Other { kind: String, data: Value },
}

impl ContentPart {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text(text.into())
    }

    /// Create a non-text part of the given kind
    pub fn other(kind: impl Into<String>) -> Self {
        ContentPart::Other {
            kind: kind.into(),
            data: Value::Null,
        }
    }

    /// The text, if this is a text part
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text(text) => Some(text),
            ContentPart::Other { .. } => None,
        }
    }
}

/// Raw result of one remote call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallOutput {
    pub parts: Vec<ContentPart>,
    /// Set when the tool itself flagged the result as an error
    pub is_error: bool,
}

impl CallOutput {
    /// Create a successful output from its parts
    pub fn new(parts: Vec<ContentPart>) -> Self {
        Self {
            parts,
            is_error: false,
        }
    }

    /// A single text part
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![ContentPart::text(text)])
    }

    /// Mark the output as a tool-level error
    pub fn with_error_flag(mut self, is_error: bool) -> Self {
        self.is_error = is_error;
        self
    }

    /// Join text parts with `\n` in order, dropping everything else.
    /// Never empty: falls back to [`NO_OUTPUT`].
    pub fn normalize(&self) -> String {
        let text = self
            .parts
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("\n");

        if text.is_empty() {
            NO_OUTPUT.to_string()
        } else {
            text
        }
    }
}

/// Normalized result of `Broker::call`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invocation {
    /// Operation name as registered
    pub operation: String,
    /// Server that executed the call
    pub server: String,
    /// Normalized text
    pub text: String,
    /// Tool-reported error. Still user-facing text, not a failure.
    pub is_error: bool,
}
