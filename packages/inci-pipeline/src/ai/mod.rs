//! Model extractor implementations.
//!
//! Reference backends for the `ModelExtractor` trait. Callers can plug in
//! their own provider instead.

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "openai")]
pub use openai::{OpenAiExtractor, DEFAULT_MODEL};
