//! Response bodies of the Mi Fit endpoints

use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{AppToken, Details, Listing};

/// Read `token_info.app_token` from a login response.
pub(crate) fn app_token(body: &Value) -> Result<AppToken> {
    body.get("token_info")
        .and_then(|info| info.get("app_token"))
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(AppToken::new)
        .ok_or_else(|| {
            Error::Authentication(format!(
                "login response has no token_info.app_token{}",
                describe_failure(body)
            ))
        })
}

/// Read the listing from a history response.
pub(crate) fn listing(mut body: Value) -> Result<Listing> {
    let data = take_data(&mut body)?;
    if !data.get("summary").is_some_and(Value::is_array) {
        return Err(Error::RemoteFetch(
            "history response has no summary list".to_string(),
        ));
    }
    serde_json::from_value(data)
        .map_err(|e| Error::RemoteFetch(format!("failed to parse history response: {}", e)))
}

/// Read the track record from a detail response.
pub(crate) fn details(mut body: Value) -> Result<Details> {
    match take_data(&mut body)? {
        Value::Object(details) => Ok(details),
        other => Err(Error::RemoteFetch(format!(
            "detail response data is not an object: {}",
            other
        ))),
    }
}

fn take_data(body: &mut Value) -> Result<Value> {
    match body.get_mut("data").map(Value::take) {
        Some(Value::Null) | None => Err(Error::RemoteFetch(format!(
            "response has no data{}",
            describe_failure(body)
        ))),
        Some(data) => Ok(data),
    }
}

/// Format the `code`/`message` pair the API puts on failed calls.
fn describe_failure(body: &Value) -> String {
    let code = body.get("code").map(|c| c.to_string());
    let message = body.get("message").and_then(Value::as_str);
    match (code, message) {
        (Some(code), Some(message)) => format!(" (code {}: {})", code, message),
        (Some(code), None) => format!(" (code {})", code),
        (None, Some(message)) => format!(" ({})", message),
        (None, None) => String::new(),
    }
}
