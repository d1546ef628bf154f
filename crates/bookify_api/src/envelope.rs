// --- File: crates/bookify_api/src/envelope.rs ---
//! Response envelope normalization.
//!
//! The API wraps every payload as
//! `{success, data?, error?, errors?: [{msg}], message?, count?}`. Failures
//! collapse into [`BookifyError::Api`] carrying the most specific message the
//! body offers.

use bookify_common::{api_error, BookifyError, GENERIC_CONNECTION_ERROR};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A decoded HTTP exchange: status plus JSON body (`Null` when empty or not JSON).
#[derive(Debug, Clone)]
pub struct Exchange {
    pub status: StatusCode,
    pub body: Value,
}

impl Exchange {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// Parses a raw body. Error bodies that are not JSON degrade to `Null`.
    pub fn from_text(status: StatusCode, text: &str) -> Result<Self, BookifyError> {
        if text.trim().is_empty() {
            return Ok(Self::new(status, Value::Null));
        }
        match serde_json::from_str(text) {
            Ok(body) => Ok(Self::new(status, body)),
            Err(_) if !status.is_success() => Ok(Self::new(status, Value::Null)),
            Err(e) => Err(BookifyError::Parse(format!("response is not JSON: {}", e))),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success() && self.body.get("success").and_then(Value::as_bool) == Some(true)
    }

    pub fn has_count(&self) -> bool {
        self.body.get("count").is_some_and(|count| !count.is_null())
    }

    /// Fails with the normalized error unless the call succeeded.
    pub fn ensure_success(self) -> Result<Self, BookifyError> {
        if self.is_success() {
            return Ok(self);
        }
        Err(self.into_error())
    }

    /// Checks only the HTTP status; for endpoints that omit the `success` flag.
    pub fn ensure_status(self) -> Result<Self, BookifyError> {
        if self.status.is_success() && self.body.get("success").and_then(Value::as_bool) != Some(false) {
            return Ok(self);
        }
        Err(self.into_error())
    }

    pub fn into_error(self) -> BookifyError {
        api_error(
            Some(self.status.as_u16()),
            failure_message(&self.body).unwrap_or_else(|| GENERIC_CONNECTION_ERROR.to_string()),
        )
    }

    /// Deserializes the `data` member; a missing member reads as `null`.
    pub fn into_data<T: DeserializeOwned>(mut self) -> Result<T, BookifyError> {
        let data = self
            .body
            .get_mut("data")
            .map(Value::take)
            .unwrap_or(Value::Null);
        serde_json::from_value(data).map_err(BookifyError::from)
    }
}

/// Message precedence: first `errors[].msg`, then `error`, then `message`.
pub fn failure_message(body: &Value) -> Option<String> {
    let first_validation = body
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(|first| first.get("msg"))
        .and_then(non_empty_str);
    if first_validation.is_some() {
        return first_validation;
    }
    body.get("error")
        .and_then(non_empty_str)
        .or_else(|| body.get("message").and_then(non_empty_str))
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validation_errors_take_precedence() {
        let body = json!({
            "success": false,
            "errors": [{ "msg": "Email is invalid" }, { "msg": "Name is required" }],
            "error": "Bad request",
            "message": "Something"
        });
        assert_eq!(failure_message(&body).as_deref(), Some("Email is invalid"));
    }

    #[test]
    fn error_beats_message() {
        let body = json!({ "error": "Slot taken", "message": "ignored" });
        assert_eq!(failure_message(&body).as_deref(), Some("Slot taken"));
        let body = json!({ "message": "Only message" });
        assert_eq!(failure_message(&body).as_deref(), Some("Only message"));
    }

    #[test]
    fn empty_errors_array_falls_through() {
        let body = json!({ "errors": [], "error": "Fallback" });
        assert_eq!(failure_message(&body).as_deref(), Some("Fallback"));
    }

    #[test]
    fn body_without_message_uses_generic_text() {
        let err = Exchange::new(StatusCode::BAD_GATEWAY, Value::Null).into_error();
        assert_eq!(err.to_string(), GENERIC_CONNECTION_ERROR);
        assert_eq!(err.status_code(), Some(502));
    }

    #[test]
    fn ok_status_with_success_false_is_a_failure() {
        let exchange = Exchange::new(
            StatusCode::OK,
            json!({ "success": false, "error": "Event type not active" }),
        );
        let err = exchange.ensure_success().unwrap_err();
        assert_eq!(err.to_string(), "Event type not active");
        assert_eq!(err.status_code(), Some(200));
    }

    #[test]
    fn data_member_is_unwrapped() {
        let exchange = Exchange::new(StatusCode::OK, json!({ "success": true, "data": [1, 2] }));
        let data: Vec<u8> = exchange.ensure_success().unwrap().into_data().unwrap();
        assert_eq!(data, vec![1, 2]);
    }

    #[test]
    fn html_error_page_degrades_to_null_body() {
        let exchange = Exchange::from_text(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>").unwrap();
        assert_eq!(exchange.body, Value::Null);
        assert!(Exchange::from_text(StatusCode::OK, "<html>").is_err());
    }
}
