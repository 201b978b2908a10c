//! Change-set interpretation for Larder.
//!
//! The interpreter is strictly a translator: it turns a free-text reply plus
//! the current inventory into a structured change-set. It never decides what
//! the inventory should look like; the reconciliation engine in
//! `larder-core` owns those rules. Interpretation is fail-open: a broken
//! transport or a garbled reply produces an empty change-set, never an error.
//!
//! Two implementations of the [`Interpreter`] capability exist:
//! - [`LlmInterpreter`], backed by an [`LlmClient`] over HTTP
//! - [`KeywordInterpreter`], a deterministic "ordered <item>" heuristic for
//!   installations without a configured model

pub mod fallback;
pub mod interpreter;
pub mod llm;

pub use fallback::KeywordInterpreter;
pub use interpreter::{build_prompt, parse_change_set, Interpreter, LlmInterpreter};
pub use llm::{HttpLlmClient, LlmClient};
