//! JSON REST API for Vigil.
//!
//! Exposes an axum [`Router`] backed by any [`vigil_core::store::FactStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", vigil_api::api_router(state))
//! ```

pub mod days;
pub mod error;
pub mod observations;
pub mod subjects;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use tower_http::trace::TraceLayer;
use vigil_core::{
  clock::Clock,
  engine::UpsertEngine,
  store::FactStore,
  window::DEFAULT_WINDOW,
};

pub use error::ApiError;

/// Shared handler state. Writes go through the engine, which takes the
/// store's subject locks like every other writer on that store.
pub struct AppState<S> {
  pub engine:       Arc<UpsertEngine<S>>,
  pub clock:        Arc<dyn Clock>,
  pub window_limit: usize,
}

impl<S> AppState<S> {
  pub fn new(engine: Arc<UpsertEngine<S>>, clock: Arc<dyn Clock>) -> Self {
    Self { engine, clock, window_limit: DEFAULT_WINDOW }
  }

  pub fn with_window_limit(mut self, window_limit: usize) -> Self {
    self.window_limit = window_limit;
    self
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      engine:       self.engine.clone(),
      clock:        self.clock.clone(),
      window_limit: self.window_limit,
    }
  }
}

/// Build a fully-materialised API router over `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: FactStore + 'static,
{
  Router::new()
    // Subjects
    .route("/subjects", get(subjects::list::<S>))
    .route("/subjects/{name}", get(subjects::get_one::<S>))
    // History
    .route("/subjects/{name}/days", get(days::list::<S>))
    // Observations
    .route("/subjects/{name}/observations", post(observations::create::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
