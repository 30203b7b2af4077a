//! Token types produced by analyzers.

use serde::{Deserialize, Serialize};

/// A single unit of analyzed text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The text content of the token
    pub text: String,

    /// The position of the token in the token stream (0-based)
    pub position: usize,

    /// The byte offset where this token starts in the original text
    pub start_offset: usize,

    /// The byte offset where this token ends in the original text
    pub end_offset: usize,
}

impl Token {
    /// Create a new token with the given text and position.
    pub fn new<S: Into<String>>(text: S, position: usize) -> Self {
        let text = text.into();
        let end_offset = text.len();
        Token {
            text,
            position,
            start_offset: 0,
            end_offset,
        }
    }

    /// Create a new token with explicit byte offsets.
    pub fn with_offsets<S: Into<String>>(
        text: S,
        position: usize,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset,
            end_offset,
        }
    }
}

/// A boxed stream of tokens.
pub type TokenStream = Box<dyn Iterator<Item = Token> + Send>;
