//! Text analysis for tokenized fields.
//!
//! The index writer hands the value of every `Tokenized` field to an
//! [`Analyzer`](analyzer::Analyzer), which turns it into a stream of
//! [`Token`](token::Token)s.

pub mod analyzer;
pub mod token;
