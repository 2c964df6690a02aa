//! Relay core
//!
//! Executes exactly one upstream behaviour per classified request and
//! produces a status plus JSON body. CORS and transport concerns live in
//! `handler`/`http`; nothing here outlives a single request.

pub mod action;
pub mod ai;
pub mod moex;
pub mod news;

use hyper::body::Bytes;
use hyper::header::HeaderValue;
use hyper::StatusCode;
use serde_json::{json, Value};

use crate::config::AppState;
use crate::error::RelayError;
use crate::logger;

pub use action::Action;

/// Outcome of a relay call, before it becomes an HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl RelayResponse {
    pub const fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    pub const fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, body)
    }

    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::new(status, json!({ "error": message }))
    }
}

impl From<RelayError> for RelayResponse {
    fn from(err: RelayError) -> Self {
        Self::error(err.status(), &err.to_string())
    }
}

/// Inbound request data the relay needs besides the action
pub struct Inbound {
    /// Raw body bytes, forwarded verbatim in AI-proxy mode
    pub body: Bytes,
    /// `Authorization` header, forwarded verbatim in AI-proxy mode
    pub authorization: Option<HeaderValue>,
}

/// Run the selected mode. Never fails: errors become `{"error": ...}` bodies.
pub async fn relay(state: &AppState, action: Action, inbound: Inbound) -> RelayResponse {
    match action {
        Action::LastTrade => moex::last_trade(state).await,
        Action::News => news::news(state).await,
        Action::AiProxy => ai::forward_chat(state, inbound.body, inbound.authorization)
            .await
            .unwrap_or_else(|e| {
                logger::log_upstream_failure("AI proxy", &e);
                e.into()
            }),
        Action::MarketData(query) => moex::market_data(state, &query)
            .await
            .unwrap_or_else(|e| {
                if !matches!(e, RelayError::InvalidRequest(_)) {
                    logger::log_upstream_failure("market data", &e);
                }
                e.into()
            }),
    }
}

/// Parse an inbound body; empty or non-JSON bodies read as `{}`
pub fn parse_body(body: &[u8]) -> Value {
    serde_json::from_slice::<Value>(body)
        .ok()
        .filter(Value::is_object)
        .unwrap_or_else(|| json!({}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(b""), json!({}));
        assert_eq!(parse_body(b"not json"), json!({}));
        assert_eq!(parse_body(b"[1,2]"), json!({}));
        assert_eq!(parse_body(br#"{"action":"getNews"}"#), json!({"action": "getNews"}));
    }

    #[test]
    fn test_error_response_shape() {
        let resp: RelayResponse = RelayError::InvalidRequest("Missing from or till".into()).into();
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.body, json!({"error": "Missing from or till"}));
    }
}
