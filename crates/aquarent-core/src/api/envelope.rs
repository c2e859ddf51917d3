use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::constants::GENERIC_ERROR_MESSAGE;

pub const MALFORMED_RESPONSE_MESSAGE: &str = "Received a malformed response from the server";
pub const UNEXPECTED_FORMAT_MESSAGE: &str = "Unexpected response format";

/// Uniform result handed to callers for every backend call.
///
/// `success` is the only field callers need to branch on. On success `data`
/// holds the payload (the server's nested `data` field when present); on
/// failure `data` is `None` and `error` carries a displayable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// HTTP status of the final exchange, `None` when no response arrived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: Option<T>, message: Option<String>, status: Option<u16>) -> Self {
        Self {
            success: true,
            data,
            message,
            error: None,
            status,
        }
    }

    pub fn failure(error: impl Into<String>, status: Option<u16>) -> Self {
        let error = error.into();
        let error = if error.trim().is_empty() {
            GENERIC_ERROR_MESSAGE.to_string()
        } else {
            error
        };
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error),
            status,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        !self.success && self.status == Some(401)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            success: self.success,
            data: self.data.map(f),
            message: self.message,
            error: self.error,
            status: self.status,
        }
    }

    /// Error text for display, falling back to the generic message.
    #[must_use]
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or(GENERIC_ERROR_MESSAGE)
    }

    pub fn into_result(self) -> Result<Option<T>, String> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self.error.unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string()))
        }
    }
}

impl ApiResponse<Value> {
    /// Normalizes a completed HTTP exchange into an envelope.
    pub fn from_http(status: u16, body: &[u8]) -> Self {
        let payload = parse_body(body);
        if (200..300).contains(&status) {
            let Ok(payload) = payload else {
                return Self::failure(MALFORMED_RESPONSE_MESSAGE, Some(status));
            };
            return Self::from_success_payload(status, payload);
        }

        let server_message = payload.ok().as_ref().and_then(server_message);
        let error =
            server_message.unwrap_or_else(|| format!("Request failed with status code {status}"));
        Self::failure(error, Some(status))
    }

    /// Envelope for a call that never produced an HTTP response.
    pub fn from_transport_error(message: impl Into<String>) -> Self {
        Self::failure(message, None)
    }

    fn from_success_payload(status: u16, payload: Value) -> Self {
        if let Value::Object(map) = &payload {
            if map.get("success") == Some(&Value::Bool(false)) {
                let error = server_message(&payload)
                    .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());
                return Self::failure(error, Some(status));
            }
        }

        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);
        let data = match payload {
            Value::Object(mut map) if map.contains_key("data") => {
                map.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        };
        let data = if data.is_null() { None } else { Some(data) };
        Self::ok(data, message, Some(status))
    }

    /// Decodes `data` into a concrete type. A payload that does not match
    /// turns the envelope into a failure.
    pub fn decode<T: DeserializeOwned>(self) -> ApiResponse<T> {
        let Self {
            success,
            data,
            message,
            error,
            status,
        } = self;
        if !success {
            return ApiResponse {
                success,
                data: None,
                message,
                error,
                status,
            };
        }
        match data.map(serde_json::from_value::<T>).transpose() {
            Ok(data) => ApiResponse::ok(data, message, status),
            Err(err) => {
                warn!(event = "response_decode_failed", error = %err);
                ApiResponse::failure(UNEXPECTED_FORMAT_MESSAGE, status)
            }
        }
    }
}

fn parse_body(body: &[u8]) -> Result<Value, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body)
}

fn server_message(payload: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .filter_map(|key| payload.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).expect("encode body")
    }

    #[test]
    fn success_unwraps_nested_data_and_message() {
        let response = ApiResponse::from_http(
            200,
            &body(json!({"data": {"orders": [1, 2]}, "message": "fetched"})),
        );
        assert!(response.success);
        assert_eq!(response.data, Some(json!({"orders": [1, 2]})));
        assert_eq!(response.message.as_deref(), Some("fetched"));
        assert_eq!(response.error, None);
        assert_eq!(response.status, Some(200));
    }

    #[test]
    fn success_without_data_field_keeps_raw_payload() {
        let response = ApiResponse::from_http(201, &body(json!({"id": "p-1"})));
        assert!(response.success);
        assert_eq!(response.data, Some(json!({"id": "p-1"})));
        assert_eq!(response.message, None);

        let list = ApiResponse::from_http(200, &body(json!([1, 2, 3])));
        assert_eq!(list.data, Some(json!([1, 2, 3])));
    }

    #[test]
    fn empty_success_body_has_no_data() {
        let response = ApiResponse::from_http(204, b"");
        assert!(response.success);
        assert_eq!(response.data, None);
    }

    #[test]
    fn success_flag_false_is_application_failure() {
        let response = ApiResponse::from_http(
            200,
            &body(json!({"success": false, "message": "Pincode not serviceable"})),
        );
        assert!(!response.success);
        assert_eq!(response.data, None);
        assert_eq!(response.error.as_deref(), Some("Pincode not serviceable"));
        assert!(!response.is_unauthorized());
    }

    #[test]
    fn failure_prefers_server_message() {
        let response =
            ApiResponse::from_http(400, &body(json!({"message": "Invalid OTP"})));
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Invalid OTP"));
        assert_eq!(response.status, Some(400));
    }

    #[test]
    fn failure_without_server_message_uses_status_text() {
        let response = ApiResponse::from_http(502, b"<html>bad gateway</html>");
        assert_eq!(
            response.error.as_deref(),
            Some("Request failed with status code 502")
        );
        let blank = ApiResponse::from_http(500, &body(json!({"message": "  "})));
        assert_eq!(
            blank.error.as_deref(),
            Some("Request failed with status code 500")
        );
    }

    #[test]
    fn malformed_success_body_is_failure() {
        let response = ApiResponse::from_http(200, b"{not json");
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some(MALFORMED_RESPONSE_MESSAGE));
    }

    #[test]
    fn transport_error_falls_back_to_generic_message() {
        let response = ApiResponse::from_transport_error("");
        assert_eq!(response.error.as_deref(), Some(GENERIC_ERROR_MESSAGE));
        assert_eq!(response.status, None);
        let timeout = ApiResponse::from_transport_error("request timed out");
        assert_eq!(timeout.error_message(), "request timed out");
    }

    #[test]
    fn unauthorized_is_detected_by_status() {
        let response = ApiResponse::from_http(401, &body(json!({"message": "jwt expired"})));
        assert!(response.is_unauthorized());
        assert_eq!(response.error.as_deref(), Some("jwt expired"));
    }

    #[test]
    fn decode_maps_payload_into_type() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Orders {
            orders: Vec<u32>,
        }

        let decoded = ApiResponse::from_http(200, &body(json!({"data": {"orders": [7]}})))
            .decode::<Orders>();
        assert!(decoded.success);
        assert_eq!(decoded.data, Some(Orders { orders: vec![7] }));

        let mismatched =
            ApiResponse::from_http(200, &body(json!({"data": {"orders": "nope"}})))
                .decode::<Orders>();
        assert!(!mismatched.success);
        assert_eq!(mismatched.error.as_deref(), Some(UNEXPECTED_FORMAT_MESSAGE));
        assert_eq!(mismatched.status, Some(200));
    }

    #[test]
    fn into_result_splits_on_success() {
        let ok: ApiResponse<u32> = ApiResponse::ok(Some(3), None, Some(200));
        assert_eq!(ok.into_result(), Ok(Some(3)));
        let failed: ApiResponse<u32> = ApiResponse::failure("nope", Some(500));
        assert_eq!(failed.into_result(), Err("nope".to_string()));
    }
}
