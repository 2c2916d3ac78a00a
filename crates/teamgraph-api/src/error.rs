//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use teamgraph_core::merge::MergeRejection;
use teamgraph_engine::Error as EngineError;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Engine(#[from] EngineError),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Engine(err) => engine_status(err),
    }
  }
}

fn engine_status(err: &EngineError) -> StatusCode {
  match err {
    EngineError::MergeRejected(rejection) => match rejection {
      MergeRejection::TeamNotFound { .. } => StatusCode::NOT_FOUND,
      MergeRejection::AlreadyMerged { .. } => StatusCode::CONFLICT,
      MergeRejection::SelfMerge { .. } | MergeRejection::Cycle { .. } => {
        StatusCode::UNPROCESSABLE_ENTITY
      }
    },
    EngineError::TeamNotFound(_) | EngineError::ReviewNotFound(_) => StatusCode::NOT_FOUND,
    EngineError::ReviewAlreadyResolved(_) => StatusCode::CONFLICT,
    EngineError::InvalidResolution(_) | EngineError::Core(_) => StatusCode::BAD_REQUEST,
    EngineError::MergeTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
    EngineError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    EngineError::Csv(_) | EngineError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use uuid::Uuid;

  use super::*;

  #[test]
  fn merge_rejections_map_to_client_errors() {
    let id = Uuid::new_v4();
    let self_merge = ApiError::from(EngineError::MergeRejected(MergeRejection::SelfMerge {
      team_id: id,
    }));
    assert_eq!(self_merge.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let merged = ApiError::from(EngineError::MergeRejected(MergeRejection::AlreadyMerged {
      team_id: id,
      into:    Uuid::new_v4(),
    }));
    assert_eq!(merged.status(), StatusCode::CONFLICT);
  }

  #[test]
  fn retryable_errors_map_to_server_errors() {
    let timeout = ApiError::from(EngineError::MergeTimeout(Duration::from_secs(30)));
    assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);

    let store = ApiError::from(EngineError::store(std::io::Error::other("locked")));
    assert_eq!(store.status(), StatusCode::SERVICE_UNAVAILABLE);
  }
}
