//! Request classification
//!
//! The inbound body is inspected once and turned into an [`Action`]. Priority
//! is fixed: `action` field, then AI-proxy shape, then market data.

use serde_json::Value;

pub const ACTION_LAST_TRADE: &str = "getLastTrade";
pub const ACTION_NEWS: &str = "getNews";

/// Passport login; only built when both fields are non-empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Parameters of a candle request as sent by the client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketQuery {
    pub credentials: Option<Credentials>,
    pub from: Option<String>,
    pub till: Option<String>,
    /// Candle interval in minutes; `None` falls back to the configured default
    pub interval: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    LastTrade,
    News,
    /// Forward the body untouched to the chat-completion endpoint
    AiProxy,
    MarketData(MarketQuery),
}

impl Action {
    /// Classify a parsed request body. Anything that is not a JSON object
    /// behaves like an empty object and lands in market data.
    pub fn classify(body: &Value) -> Self {
        match body.get("action").and_then(Value::as_str) {
            Some(ACTION_LAST_TRADE) => return Self::LastTrade,
            Some(ACTION_NEWS) => return Self::News,
            _ => {}
        }

        if is_present(body.get("model")) && is_present(body.get("messages")) {
            return Self::AiProxy;
        }

        Self::MarketData(MarketQuery::from_body(body))
    }

    /// Short name used in access logs
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LastTrade => "last_trade",
            Self::News => "news",
            Self::AiProxy => "ai_proxy",
            Self::MarketData(_) => "market_data",
        }
    }
}

impl MarketQuery {
    fn from_body(body: &Value) -> Self {
        let username = text_field(body, "username");
        let password = text_field(body, "password");
        let credentials = match (username, password) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            _ => None,
        };

        Self {
            credentials,
            from: text_field(body, "from"),
            till: text_field(body, "till"),
            interval: body.get("interval").and_then(parse_interval),
        }
    }
}

/// Field counts as present unless it is missing, null, false, zero or an empty string
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null | Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(_) => true,
    }
}

/// Non-empty string field; numbers are accepted and rendered as text
fn text_field(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_interval(value: &Value) -> Option<u32> {
    let minutes = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    u32::try_from(minutes).ok().filter(|m| *m > 0)
}
