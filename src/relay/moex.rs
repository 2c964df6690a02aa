//! MOEX ISS client
//!
//! Market data is a two-step pipeline: [`authenticate`] turns optional
//! credentials into an optional session cookie, then [`fetch_candles`] runs
//! with or without it. A failed login is a public-access fallback, not an error.

use hyper::header::{COOKIE, SET_COOKIE};
use serde_json::{json, Value};

use super::action::{Credentials, MarketQuery};
use super::RelayResponse;
use crate::config::{AppState, MarketConfig};
use crate::error::RelayError;
use crate::logger;

/// `name=value` pair of the passport session cookie, attributes stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCookie(String);

impl AuthCookie {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Most recent trade of the configured contract
#[derive(Debug, Clone, PartialEq)]
pub struct LastTrade {
    pub price: f64,
    pub time: Option<String>,
}

/// Market-data mode: validate, authenticate, fetch, annotate
pub async fn market_data(
    state: &AppState,
    query: &MarketQuery,
) -> Result<RelayResponse, RelayError> {
    let market = &state.config.market;
    validate(market, query)?;

    let cookie = match &query.credentials {
        Some(credentials) => authenticate(state, credentials).await,
        None => None,
    };

    let interval = query.interval.unwrap_or(market.default_interval);
    let data = fetch_candles(state, query, interval, cookie.as_ref()).await?;

    if candle_row_count(&data) == 0 {
        let warning = empty_candles_warning(
            &market.candles_security,
            query.from.as_deref(),
            query.till.as_deref(),
            cookie.is_some(),
        );
        logger::log_warning(&warning);
        return Ok(RelayResponse::ok(with_warning(data, warning)));
    }

    Ok(RelayResponse::ok(data))
}

/// Required fields are a configuration decision
fn validate(market: &MarketConfig, query: &MarketQuery) -> Result<(), RelayError> {
    if market.require_credentials && query.credentials.is_none() {
        return Err(RelayError::InvalidRequest(
            "Missing username or password".to_string(),
        ));
    }
    if market.require_date_range && (query.from.is_none() || query.till.is_none()) {
        return Err(RelayError::InvalidRequest("Missing from or till".to_string()));
    }
    Ok(())
}

/// Log in at the passport. Always resolves: `None` means public access.
pub async fn authenticate(state: &AppState, credentials: &Credentials) -> Option<AuthCookie> {
    match request_cookie(state, credentials).await {
        Ok(Some(cookie)) => Some(cookie),
        Ok(None) => {
            logger::log_auth_fallback(&format!(
                "{} cookie not received",
                state.config.market.auth_cookie
            ));
            None
        }
        Err(e) => {
            logger::log_auth_fallback(&e.to_string());
            None
        }
    }
}

async fn request_cookie(
    state: &AppState,
    credentials: &Credentials,
) -> Result<Option<AuthCookie>, RelayError> {
    let response = state
        .auth_client
        .get(&state.config.upstream.passport_url)
        .basic_auth(&credentials.username, Some(&credentials.password))
        .send()
        .await?;

    // Redirects are not followed; the passport may set the cookie on a 3xx
    let status = response.status();
    if !status.is_success() && !status.is_redirection() {
        return Err(RelayError::UpstreamStatus {
            context: "MOEX authentication",
            status,
        });
    }

    let set_cookies = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok());
    Ok(extract_cookie(set_cookies, &state.config.market.auth_cookie).map(AuthCookie))
}

/// Find `name=value` for the named cookie among `Set-Cookie` values.
///
/// Each value carries one cookie: its first `;`-separated segment is the
/// pair, the rest are attributes (`Path`, `Expires`, ...) and are dropped.
/// Commas belong to the value, as in `Expires` dates.
pub fn extract_cookie<'a>(
    set_cookie_values: impl IntoIterator<Item = &'a str>,
    name: &str,
) -> Option<String> {
    set_cookie_values.into_iter().find_map(|header| {
        let pair = header.split(';').next()?;
        let (key, value) = pair.trim().split_once('=')?;
        let value = value.trim();
        (key.trim() == name && !value.is_empty()).then(|| format!("{name}={value}"))
    })
}

/// Fetch candles for the configured contract
pub async fn fetch_candles(
    state: &AppState,
    query: &MarketQuery,
    interval: u32,
    cookie: Option<&AuthCookie>,
) -> Result<Value, RelayError> {
    let url = format!(
        "{}/engines/futures/markets/forts/boards/forts/securities/{}/candles.json",
        state.config.upstream.iss_base_url, state.config.market.candles_security
    );

    let mut params: Vec<(&str, String)> = Vec::with_capacity(4);
    if let Some(from) = &query.from {
        params.push(("from", from.clone()));
    }
    if let Some(till) = &query.till {
        params.push(("till", till.clone()));
    }
    params.push(("interval", interval.to_string()));
    params.push(("iss.only", "candles".to_string()));

    let mut request = state.client.get(url).query(&params);
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie.as_str());
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(RelayError::UpstreamStatus {
            context: "MOEX data request",
            status,
        });
    }

    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Number of rows in `candles.data`; a missing block counts as empty
pub fn candle_row_count(data: &Value) -> usize {
    data.pointer("/candles/data")
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}

fn empty_candles_warning(
    security: &str,
    from: Option<&str>,
    till: Option<&str>,
    authenticated: bool,
) -> String {
    let mut warning = format!(
        "No candles returned for {security} between {} and {}. \
         The contract may be inactive or expired, or the date range may contain no trading days.",
        from.unwrap_or("(unset)"),
        till.unwrap_or("(unset)"),
    );
    if !authenticated {
        warning.push_str(" The request ran without MOEX authorization; delayed or restricted data may require a valid login.");
    }
    warning
}

fn with_warning(data: Value, warning: String) -> Value {
    match data {
        Value::Object(mut map) => {
            map.insert("warning".to_string(), Value::String(warning));
            Value::Object(map)
        }
        _ => json!({ "warning": warning }),
    }
}

/// Last-trade mode: best effort, any failure answers `{"price": null}`
pub async fn last_trade(state: &AppState) -> RelayResponse {
    match fetch_last_trade(state).await {
        Ok(trade) => {
            let mut body = json!({ "price": trade.price });
            if let Some(time) = trade.time {
                body["time"] = Value::String(time);
            }
            RelayResponse::ok(body)
        }
        Err(e) => {
            logger::log_soft_failure("last trade", &e);
            RelayResponse::ok(json!({ "price": null }))
        }
    }
}

pub async fn fetch_last_trade(state: &AppState) -> Result<LastTrade, RelayError> {
    let url = format!(
        "{}/engines/futures/markets/forts/securities/{}/trades.json",
        state.config.upstream.iss_base_url, state.config.market.trades_security
    );

    let response = state
        .client
        .get(url)
        .query(&[("reverse", "true"), ("limit", "1")])
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(RelayError::UpstreamStatus {
            context: "MOEX trades request",
            status,
        });
    }

    let bytes = response.bytes().await?;
    parse_last_trade(&serde_json::from_slice(&bytes)?)
}

/// Read the first row of an ISS `trades` block, locating columns by name
pub fn parse_last_trade(data: &Value) -> Result<LastTrade, RelayError> {
    let columns = data
        .pointer("/trades/columns")
        .and_then(Value::as_array)
        .ok_or_else(|| RelayError::Malformed("trades.columns missing".to_string()))?;
    let column = |name: &str| columns.iter().position(|c| c.as_str() == Some(name));

    let price_idx =
        column("price").ok_or_else(|| RelayError::Malformed("no price column".to_string()))?;
    let time_idx = column("tradetime");

    let row = data
        .pointer("/trades/data")
        .and_then(Value::as_array)
        .and_then(|rows| rows.first())
        .and_then(Value::as_array)
        .ok_or_else(|| RelayError::Malformed("no trade rows".to_string()))?;

    let price = match row.get(price_idx) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|p| p.is_finite())
    .ok_or_else(|| RelayError::Malformed("price is not a number".to_string()))?;

    let time = time_idx
        .and_then(|i| row.get(i))
        .and_then(Value::as_str)
        .map(ToString::to_string);

    Ok(LastTrade { price, time })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_cookie_strips_attributes() {
        let values = ["MicexPassportCert=abc; Path=/; HttpOnly"];
        assert_eq!(
            extract_cookie(values, "MicexPassportCert").as_deref(),
            Some("MicexPassportCert=abc")
        );
    }

    #[test]
    fn test_extract_cookie_searches_by_name() {
        let values = [
            "MicexTrackID=zzz; Path=/; Expires=Wed, 21 Oct 2026 07:28:00 GMT",
            "MicexPassportCert=tok-123; Domain=.moex.com; Path=/",
        ];
        assert_eq!(
            extract_cookie(values, "MicexPassportCert").as_deref(),
            Some("MicexPassportCert=tok-123")
        );
    }

    #[test]
    fn test_extract_cookie_keeps_commas_in_value() {
        let values = ["MicexPassportCert=a1,b2,c3; Expires=Wed, 21 Oct 2026 07:28:00 GMT; Path=/"];
        assert_eq!(
            extract_cookie(values, "MicexPassportCert").as_deref(),
            Some("MicexPassportCert=a1,b2,c3")
        );
        // an attribute named like the cookie is not the cookie
        assert_eq!(extract_cookie(["other=1; MicexPassportCert=x"], "MicexPassportCert"), None);
    }

    #[test]
    fn test_extract_cookie_missing_or_empty() {
        assert_eq!(extract_cookie(["a=1; Path=/"], "MicexPassportCert"), None);
        assert_eq!(extract_cookie(["MicexPassportCert=; Path=/"], "MicexPassportCert"), None);
        assert_eq!(extract_cookie(Vec::<&str>::new(), "MicexPassportCert"), None);
        // prefix of another name does not match
        assert_eq!(extract_cookie(["MicexPassportCertOld=x"], "MicexPassportCert"), None);
    }

    #[test]
    fn test_candle_row_count() {
        assert_eq!(candle_row_count(&json!({"candles": {"columns": [], "data": []}})), 0);
        assert_eq!(candle_row_count(&json!({})), 0);
        assert_eq!(
            candle_row_count(&json!({"candles": {"data": [[1, 2, 3], [4, 5, 6]]}})),
            2
        );
    }

    #[test]
    fn test_with_warning_keeps_data() {
        let data = json!({"candles": {"columns": ["open"], "data": []}});
        let annotated = with_warning(data, "empty".to_string());
        assert_eq!(annotated["warning"], "empty");
        assert_eq!(annotated["candles"]["columns"], json!(["open"]));

        assert_eq!(with_warning(json!([]), "empty".to_string()), json!({"warning": "empty"}));
    }

    #[test]
    fn test_warning_mentions_auth_only_when_public() {
        let public = empty_candles_warning("Si-3.26", Some("2025-01-01"), Some("2025-01-02"), false);
        assert!(public.contains("Si-3.26"));
        assert!(public.contains("authorization"));
        let authed = empty_candles_warning("Si-3.26", Some("2025-01-01"), Some("2025-01-02"), true);
        assert!(!authed.contains("authorization"));
    }

    #[test]
    fn test_parse_last_trade() {
        let data = json!({
            "trades": {
                "columns": ["tradeno", "tradetime", "price", "quantity"],
                "data": [[1001, "18:44:59", 92_345.0, 3]]
            }
        });
        let trade = parse_last_trade(&data).unwrap();
        assert!((trade.price - 92_345.0).abs() < f64::EPSILON);
        assert_eq!(trade.time.as_deref(), Some("18:44:59"));
    }

    #[test]
    fn test_parse_last_trade_string_price_without_time() {
        let data = json!({"trades": {"columns": ["price"], "data": [["81000.5"]]}});
        let trade = parse_last_trade(&data).unwrap();
        assert!((trade.price - 81_000.5).abs() < f64::EPSILON);
        assert!(trade.time.is_none());
    }

    #[test]
    fn test_parse_last_trade_failures() {
        let no_rows = json!({"trades": {"columns": ["tradetime", "price"], "data": []}});
        assert!(matches!(parse_last_trade(&no_rows), Err(RelayError::Malformed(_))));

        let no_price = json!({"trades": {"columns": ["tradetime"], "data": [["10:00:00"]]}});
        assert!(parse_last_trade(&no_price).is_err());

        assert!(parse_last_trade(&json!({"error": "oops"})).is_err());

        let bad_price = json!({"trades": {"columns": ["price"], "data": [[null]]}});
        assert!(parse_last_trade(&bad_price).is_err());
    }

    #[test]
    fn test_validate_uses_configuration() {
        let mut market = MarketConfig {
            candles_security: "Si-3.26".to_string(),
            trades_security: "SiH6".to_string(),
            default_interval: 60,
            auth_cookie: "MicexPassportCert".to_string(),
            require_date_range: true,
            require_credentials: false,
        };
        let query = MarketQuery::default();
        assert!(matches!(validate(&market, &query), Err(RelayError::InvalidRequest(_))));

        market.require_date_range = false;
        assert!(validate(&market, &query).is_ok());

        market.require_credentials = true;
        let err = validate(&market, &query).unwrap_err();
        assert_eq!(err.to_string(), "Missing username or password");
    }
}
