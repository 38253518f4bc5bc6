//! Handler for `POST /subjects/:name/observations`.
//!
//! The body is an extractor-shaped object, `{"symptoms": [...], "vitals":
//! {...}}`. It is normalised and filed under today's date exactly as a chat
//! turn would be.

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Serialize;
use vigil_core::{
  engine::UpsertOutcome,
  extraction::{Extraction, RawExtraction},
  store::FactStore,
  subject::SubjectName,
};

use crate::{AppState, error::ApiError};

#[derive(Debug, Serialize)]
pub struct ObservationReply {
  pub outcome:    UpsertOutcome,
  /// The facts after normalisation.
  pub extraction: Extraction,
}

/// `POST /subjects/:name/observations` — 201 when a day record was created,
/// 200 when an existing one was merged into, 400 when the body is not JSON.
pub async fn create<S: FactStore>(
  State(state): State<AppState<S>>,
  Path(name): Path<String>,
  body: Result<Json<RawExtraction>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let name = SubjectName::parse(&name)?;
  let Json(body) = body?;
  let extraction = body.normalize();
  let outcome = state
    .engine
    .apply(&name, &extraction, state.clock.today())
    .await?;

  let status = match outcome {
    UpsertOutcome::CreatedSubject | UpsertOutcome::CreatedDay => StatusCode::CREATED,
    UpsertOutcome::Merged { .. } | UpsertOutcome::Unchanged => StatusCode::OK,
  };
  Ok((status, Json(ObservationReply { outcome, extraction })))
}
