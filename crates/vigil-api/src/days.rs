//! Handler for `GET /subjects/:name/days`.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use vigil_core::{
  record::DaySnapshot,
  store::FactStore,
  subject::SubjectName,
  window::window,
};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize, Default)]
pub struct DaysParams {
  /// Number of days to return. Defaults to the configured window.
  pub limit: Option<usize>,
}

/// `GET /subjects/:name/days[?limit=N]` — newest first. A subject with no
/// records (or no subject at all) yields an empty list.
pub async fn list<S: FactStore>(
  State(state): State<AppState<S>>,
  Path(name): Path<String>,
  Query(params): Query<DaysParams>,
) -> Result<Json<Vec<DaySnapshot>>, ApiError> {
  let name = SubjectName::parse(&name)?;
  let limit = params.limit.unwrap_or(state.window_limit);
  let days = window(state.engine.store().as_ref(), &name, limit).await?;
  Ok(Json(days))
}
