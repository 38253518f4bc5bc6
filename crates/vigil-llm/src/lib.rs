//! Gemini client for Vigil's language-model collaborators.
//!
//! [`GeminiClient`] implements both [`vigil_core::collab::Extractor`] and
//! [`vigil_core::collab::Responder`] on top of the `generateContent` endpoint.

pub mod error;
mod gemini;
pub mod prompt;

pub use error::{Error, Result};
pub use gemini::{DEFAULT_MODEL, GeminiClient};
