//! HTTP error mapping
//!
//! Every error body is `{"error": "<message>"}`. Not-found is kept apart
//! from validation so polling peers can tell "not ready yet" from
//! "malformed request".

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::error;

use crate::UnknownPeerRole;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A required query parameter or body field is missing or empty
    #[error("{0}")]
    MissingParameter(&'static str),

    #[error("Invalid peerType: {0}")]
    InvalidPeerType(#[from] UnknownPeerRole),

    #[error("Offer not found")]
    OfferNotFound,

    #[error("Answer not found")]
    AnswerNotFound,

    #[error("Answer already published for this offer")]
    AnswerConflict,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParameter(_) | ApiError::InvalidPeerType(_) => StatusCode::BAD_REQUEST,
            ApiError::OfferNotFound | ApiError::AnswerNotFound => StatusCode::NOT_FOUND,
            ApiError::AnswerConflict => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref e) = self {
            error!("Signaling request failed: {:#}", e);
        }
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
