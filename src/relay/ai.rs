//! Chat-completion passthrough
//!
//! The caller brings their own credential; the relay holds no AI secret.

use hyper::body::Bytes;
use hyper::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};

use super::RelayResponse;
use crate::config::AppState;
use crate::error::RelayError;

/// Forward `body` as-is and mirror the upstream status and JSON
pub async fn forward_chat(
    state: &AppState,
    body: Bytes,
    authorization: Option<HeaderValue>,
) -> Result<RelayResponse, RelayError> {
    let mut request = state
        .client
        .post(&state.config.upstream.ai_url)
        .header(CONTENT_TYPE, "application/json")
        .body(body);
    if let Some(auth) = authorization {
        request = request.header(AUTHORIZATION, auth);
    }

    let response = request.send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;

    let body = serde_json::from_slice::<Value>(&bytes).unwrap_or_else(|_| {
        json!({
            "error": "AI endpoint returned a non-JSON response",
            "body": String::from_utf8_lossy(&bytes),
        })
    });
    Ok(RelayResponse::new(status, body))
}
