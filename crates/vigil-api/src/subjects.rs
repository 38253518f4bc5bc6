//! Handlers for `/subjects` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/subjects` | All subjects, name-ordered |
//! | `GET`  | `/subjects/:name` | 404 if not found |

use axum::{
  Json,
  extract::{Path, State},
};
use vigil_core::{
  Error,
  store::FactStore,
  subject::{Subject, SubjectName},
};

use crate::{AppState, error::ApiError};

/// `GET /subjects`
pub async fn list<S: FactStore>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Subject>>, ApiError> {
  let subjects = state
    .engine
    .store()
    .list_subjects()
    .await
    .map_err(Error::store)?;
  Ok(Json(subjects))
}

/// `GET /subjects/:name`
pub async fn get_one<S: FactStore>(
  State(state): State<AppState<S>>,
  Path(name): Path<String>,
) -> Result<Json<Subject>, ApiError> {
  let name = SubjectName::parse(&name)?;
  let subject = state
    .engine
    .store()
    .find_subject(&name)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| ApiError::NotFound(format!("subject {name} not found")))?;
  Ok(Json(subject))
}
