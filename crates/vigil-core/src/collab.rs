//! Contracts for the language-model collaborators.
//!
//! Implemented by `vigil-llm`; tests use scripted fakes.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::extraction::RawExtraction;

/// Who said a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  User,
  Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub role:    Role,
  pub content: String,
}

impl ChatMessage {
  pub fn user(content: impl Into<String>) -> Self {
    Self { role: Role::User, content: content.into() }
  }

  pub fn assistant(content: impl Into<String>) -> Self {
    Self { role: Role::Assistant, content: content.into() }
  }
}

/// Structured extraction of symptoms and vitals from free text.
///
/// Implementations must not invent values that cannot be traced to the
/// input. The core does not check this beyond normalisation.
pub trait Extractor: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn extract<'a>(
    &'a self,
    text: &'a str,
  ) -> impl Future<Output = Result<RawExtraction, Self::Error>> + Send + 'a;
}

/// Conversational reply generation.
pub trait Responder: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// `system_context` carries the rendered history window; `history` holds
  /// the earlier turns of this conversation, oldest first.
  fn respond<'a>(
    &'a self,
    system_context: &'a str,
    history: &'a [ChatMessage],
    input: &'a str,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;
}
