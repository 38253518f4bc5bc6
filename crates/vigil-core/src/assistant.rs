//! Turn processing.
//!
//! A [`Session`] is the caller-owned conversation state for one subject. The
//! [`Assistant`] takes it by `&mut` for each turn: extract facts, file them,
//! read back the history window, ask for a reply, and record the exchange.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::time::timeout;
use tracing::warn;

use crate::{
  Error, Result,
  clock::Clock,
  collab::{ChatMessage, Extractor, Responder},
  engine::{UpsertEngine, UpsertOutcome},
  extraction::Extraction,
  store::FactStore,
  subject::SubjectName,
  window::{DEFAULT_WINDOW, render_context, window},
};

/// Shown before the first turn of a conversation.
pub const GREETING: &str =
  "Hello! I'm your health assistant. How can I help you with your health today?";

// ─── Session ─────────────────────────────────────────────────────────────────

/// One subject's conversation. Owned by the caller and threaded through every
/// turn; nothing about it is global.
#[derive(Debug, Clone)]
pub struct Session {
  subject: SubjectName,
  history: Vec<ChatMessage>,
}

impl Session {
  pub fn new(subject: SubjectName) -> Self {
    Self { subject, history: Vec::new() }
  }

  pub fn subject(&self) -> &SubjectName { &self.subject }

  /// Earlier turns, oldest first.
  pub fn history(&self) -> &[ChatMessage] { &self.history }

  fn record(&mut self, input: &str, reply: &str) {
    self.history.push(ChatMessage::user(input));
    self.history.push(ChatMessage::assistant(reply));
  }
}

// ─── Assistant ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct AssistantConfig {
  /// Days of history passed to the responder.
  pub window_limit: usize,
  /// Upper bound on each extractor and responder call.
  pub timeout:      Duration,
}

impl Default for AssistantConfig {
  fn default() -> Self {
    Self { window_limit: DEFAULT_WINDOW, timeout: Duration::from_secs(60) }
  }
}

/// The result of a successful turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
  pub reply:      String,
  pub outcome:    UpsertOutcome,
  /// The facts that were filed this turn (empty if extraction failed).
  pub extraction: Extraction,
}

pub struct Assistant<S, X, R> {
  engine:    Arc<UpsertEngine<S>>,
  extractor: X,
  responder: R,
  clock:     Arc<dyn Clock>,
  config:    AssistantConfig,
}

impl<S, X, R> Assistant<S, X, R>
where
  S: FactStore,
  X: Extractor,
  R: Responder,
{
  pub fn new(
    engine: Arc<UpsertEngine<S>>,
    extractor: X,
    responder: R,
    clock: Arc<dyn Clock>,
    config: AssistantConfig,
  ) -> Self {
    Self { engine, extractor, responder, clock, config }
  }

  pub fn engine(&self) -> &Arc<UpsertEngine<S>> { &self.engine }

  /// Process one user message.
  ///
  /// Extraction failures are absorbed (the turn continues with no facts);
  /// store failures, responder failures and timeouts fail the turn. A failed
  /// turn leaves the session untouched but keeps any store writes already
  /// committed.
  pub async fn process_turn(
    &self,
    session: &mut Session,
    input: &str,
  ) -> Result<TurnReply> {
    let subject = session.subject().clone();

    let extraction = self.extract(input).await?;
    let outcome = self
      .engine
      .apply(&subject, &extraction, self.clock.today())
      .await?;

    let days =
      window(self.engine.store().as_ref(), &subject, self.config.window_limit)
        .await?;
    let context = render_context(&days);

    let after = self.config.timeout;
    let reply = timeout(
      after,
      self.responder.respond(&context, session.history(), input),
    )
    .await
    .map_err(|_| Error::Timeout { operation: "response generation", after })?
    .map_err(|e| Error::Generation(Box::new(e)))?;

    session.record(input, &reply);
    Ok(TurnReply { reply, outcome, extraction })
  }

  async fn extract(&self, input: &str) -> Result<Extraction> {
    let after = self.config.timeout;
    match timeout(after, self.extractor.extract(input)).await {
      Err(_) => Err(Error::Timeout { operation: "extraction", after }),
      Ok(Ok(raw)) => Ok(raw.normalize()),
      Ok(Err(err)) => {
        warn!(error = %err, "extraction failed; continuing without facts");
        Ok(Extraction::default())
      }
    }
  }
}
