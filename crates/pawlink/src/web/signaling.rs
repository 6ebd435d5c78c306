//! Signaling handlers: `/offer`, `/answer`, `/ice-candidate`
//!
//! The connection code travels as the `id` query parameter on every call.
//! All validation happens before the relay is touched, so a rejected
//! request never mutates a session.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{FromRequestParts, Query, State};
use axum::http::request::Parts;
use axum::response::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::error::ApiError;
use super::WebState;
use crate::relay::AnswerWrite;
use crate::{IceCandidate, PeerRole, SessionDescription};

const ID_REQUIRED: &str = "Connection ID is required";
const OFFER_REQUIRED: &str = "Connection ID and offer are required";
const ANSWER_REQUIRED: &str = "Connection ID and answer are required";
const PEER_TYPE_REQUIRED: &str = "Connection ID and peerType are required";
const CANDIDATE_REQUIRED: &str = "Connection ID, peerType, and candidate are required";

#[derive(Debug, Default, Deserialize)]
pub struct SignalQuery {
    id: Option<String>,
    #[serde(rename = "peerType")]
    peer_type: Option<String>,
}

/// Query strings axum cannot decode (e.g. `?id=a&id=b`) are reported the
/// same way as a missing id, with a JSON body.
impl<S: Send + Sync> FromRequestParts<S> for SignalQuery {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<SignalQuery>::from_request_parts(parts, state).await {
            Ok(Query(query)) => Ok(query),
            Err(rejection) => {
                debug!("Bad signaling query: {}", rejection.body_text());
                Err(ApiError::MissingParameter(ID_REQUIRED))
            }
        }
    }
}

impl SignalQuery {
    /// Connection code for endpoints that need nothing else
    pub(crate) fn code_param(&self) -> Result<&str, ApiError> {
        self.code(ID_REQUIRED)
    }

    fn code(&self, missing: &'static str) -> Result<&str, ApiError> {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(ApiError::MissingParameter(missing))
    }

    fn role(&self, missing: &'static str) -> Result<PeerRole, ApiError> {
        let raw = self
            .peer_type
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(ApiError::MissingParameter(missing))?;
        Ok(raw.parse::<PeerRole>()?)
    }
}

/// Pull a required field out of a JSON body. Descriptions and candidates
/// are JSON objects, so anything else in that field (absent, `null`, `""`,
/// `false`, a number) counts as missing, as does a body that is not JSON.
fn body_field<T: DeserializeOwned>(
    body: &Bytes,
    field: &str,
    missing: &'static str,
) -> Result<T, ApiError> {
    let mut value: Value =
        serde_json::from_slice(body).map_err(|_| ApiError::MissingParameter(missing))?;
    match value.get_mut(field).map(Value::take) {
        Some(v @ Value::Object(_)) => {
            serde_json::from_value(v).map_err(|_| ApiError::MissingParameter(missing))
        }
        _ => Err(ApiError::MissingParameter(missing)),
    }
}

fn success() -> Json<Value> {
    Json(json!({ "success": true }))
}

/// GET /offer: remote viewer polls for the base station's offer
pub async fn get_offer(
    State(state): State<Arc<WebState>>,
    query: SignalQuery,
) -> Result<Json<Value>, ApiError> {
    let code = query.code(ID_REQUIRED)?;
    let offer = state
        .relay
        .offer(code)
        .await?
        .ok_or(ApiError::OfferNotFound)?;
    Ok(Json(json!({ "offer": offer })))
}

/// POST /offer: base station publishes an offer, resetting the session
pub async fn post_offer(
    State(state): State<Arc<WebState>>,
    query: SignalQuery,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let code = query.code(OFFER_REQUIRED)?;
    let offer: SessionDescription = body_field(&body, "offer", OFFER_REQUIRED)?;
    state.relay.publish_offer(code, offer).await?;
    Ok(success())
}

/// DELETE /offer: either side tears the whole session down
pub async fn delete_offer(
    State(state): State<Arc<WebState>>,
    query: SignalQuery,
) -> Result<Json<Value>, ApiError> {
    let code = query.code(ID_REQUIRED)?;
    state.relay.teardown(code).await?;
    Ok(success())
}

/// GET /answer: base station polls for the viewer's answer
pub async fn get_answer(
    State(state): State<Arc<WebState>>,
    query: SignalQuery,
) -> Result<Json<Value>, ApiError> {
    let code = query.code(ID_REQUIRED)?;
    let answer = state
        .relay
        .answer(code)
        .await?
        .ok_or(ApiError::AnswerNotFound)?;
    Ok(Json(json!({ "answer": answer })))
}

/// POST /answer: remote viewer publishes its answer
pub async fn post_answer(
    State(state): State<Arc<WebState>>,
    query: SignalQuery,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let code = query.code(ANSWER_REQUIRED)?;
    let answer: SessionDescription = body_field(&body, "answer", ANSWER_REQUIRED)?;
    match state.relay.publish_answer(code, answer).await? {
        AnswerWrite::Rejected => Err(ApiError::AnswerConflict),
        AnswerWrite::Stored | AnswerWrite::Replaced => Ok(success()),
    }
}

/// GET /ice-candidate: drain the candidates the other role published
pub async fn get_candidates(
    State(state): State<Arc<WebState>>,
    query: SignalQuery,
) -> Result<Json<Value>, ApiError> {
    let code = query.code(PEER_TYPE_REQUIRED)?;
    let role = query.role(PEER_TYPE_REQUIRED)?;
    let candidates: Vec<IceCandidate> = state.relay.drain_candidates(code, role).await?;
    Ok(Json(json!({ "candidates": candidates })))
}

/// POST /ice-candidate: queue a candidate for the other role
pub async fn post_candidate(
    State(state): State<Arc<WebState>>,
    query: SignalQuery,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let code = query.code(CANDIDATE_REQUIRED)?;
    let role = query.role(CANDIDATE_REQUIRED)?;
    let candidate: IceCandidate = body_field(&body, "candidate", CANDIDATE_REQUIRED)?;
    state.relay.publish_candidate(code, role, candidate).await?;
    Ok(success())
}
