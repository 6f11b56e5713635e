//! Uniform response shape returned by the API client

use serde_json::{json, Map, Value};

use crate::error::{Error, Result};

/// Failure produced either by the transport (status 0), by a non-2xx reply,
/// or by a 2xx body that flags itself as an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiFailure {
    /// HTTP status, 0 for network-level failures
    pub status: u16,

    /// The `detail` reported by the API, or the whole body when it has none
    pub detail: Value,

    /// The `message` field of the body, when present
    pub message: Option<String>,
}

impl ApiFailure {
    /// Failure for a request that never got an HTTP response
    pub fn transport<T: ToString>(err: T) -> Self {
        Self {
            status: 0,
            detail: Value::String(err.to_string()),
            message: None,
        }
    }

    /// Human-readable message: `detail` when it is a string, else `message`,
    /// else whatever `fallback` builds from the status.
    pub fn message_or_else<F: FnOnce(u16) -> String>(&self, fallback: F) -> String {
        if let Some(detail) = self.detail.as_str().filter(|s| !s.is_empty()) {
            return detail.to_string();
        }
        if let Some(message) = self.message.as_deref().filter(|s| !s.is_empty()) {
            return message.to_string();
        }
        fallback(self.status)
    }

    /// Human-readable message with the `Error HTTP {status}` fallback
    pub fn message(&self) -> String {
        self.message_or_else(|status| format!("Error HTTP {}", status))
    }

    /// The `{error: true, status, detail}` object
    pub fn to_value(&self) -> Value {
        json!({
            "error": true,
            "status": self.status,
            "detail": self.detail,
        })
    }

    pub(crate) fn into_error(self) -> Error {
        let message = self.message();
        Error::api(self.status, message)
    }
}

/// Result of one request: parsed JSON, raw text when the body is not JSON,
/// or a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Json(Value),
    Text(String),
    Failure(ApiFailure),
}

impl ApiResponse {
    /// Build a successful response from a raw body
    pub fn from_body(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => ApiResponse::Json(value),
            Err(_) => ApiResponse::Text(raw.to_string()),
        }
    }

    /// Build the failure for a non-2xx reply
    pub fn from_error_body(status: u16, raw: &str, reason: Option<&str>) -> Self {
        let (detail, message) = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(obj)) => {
                let message = obj.get("message").and_then(Value::as_str).map(str::to_string);
                let detail = obj
                    .get("detail")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(obj.clone()));
                (detail, message)
            }
            Ok(other) => (other, None),
            Err(_) if !raw.trim().is_empty() => (Value::String(raw.to_string()), None),
            Err(_) => (Value::String(reason.unwrap_or_default().to_string()), None),
        };
        ApiResponse::Failure(ApiFailure {
            status,
            detail,
            message,
        })
    }

    /// The failure carried by this response, if any.
    ///
    /// A JSON object with a truthy `error` or a `status >= 400` counts as a
    /// failure even when it arrived with a 2xx status.
    pub fn failure(&self) -> Option<ApiFailure> {
        match self {
            ApiResponse::Failure(failure) => Some(failure.clone()),
            ApiResponse::Json(Value::Object(obj)) => {
                let status = status_field(obj);
                if !is_truthy(obj.get("error")) && status < 400 {
                    return None;
                }
                Some(ApiFailure {
                    status,
                    detail: obj.get("detail").cloned().unwrap_or(Value::Null),
                    message: obj.get("message").and_then(Value::as_str).map(str::to_string),
                })
            }
            _ => None,
        }
    }

    /// Whether this response is error-shaped
    pub fn is_failure(&self) -> bool {
        self.failure().is_some()
    }

    /// Turn an error-shaped response into [`Error::Api`] with the default
    /// message chain.
    pub fn check(self) -> Result<Self> {
        match self.failure() {
            Some(failure) => Err(failure.into_error()),
            None => Ok(self),
        }
    }

    /// Like [`check`](Self::check), but falls back to `default` instead of
    /// `Error HTTP {status}` when the body carries no message.
    pub fn check_or(self, default: &str) -> Result<Self> {
        match self.failure() {
            Some(failure) => {
                let message = failure.message_or_else(|_| default.to_string());
                Err(Error::api(failure.status, message))
            }
            None => Ok(self),
        }
    }

    /// Success message: the text body when non-empty, else the first
    /// non-empty string among `keys`, else `default`.
    pub fn message(&self, keys: &[&str], default: &str) -> String {
        match self {
            ApiResponse::Text(text) if !text.is_empty() => text.clone(),
            ApiResponse::Json(Value::String(text)) if !text.is_empty() => text.clone(),
            ApiResponse::Json(Value::Object(obj)) => keys
                .iter()
                .filter_map(|key| obj.get(*key).and_then(Value::as_str))
                .find(|s| !s.is_empty())
                .unwrap_or(default)
                .to_string(),
            _ => default.to_string(),
        }
    }

    /// The JSON body, or `None` for text and failures
    pub fn json(&self) -> Option<&Value> {
        match self {
            ApiResponse::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Collapse into a single JSON value; failures become
    /// `{error: true, status, detail}`.
    pub fn into_value(self) -> Value {
        match self {
            ApiResponse::Json(value) => value,
            ApiResponse::Text(text) => Value::String(text),
            ApiResponse::Failure(failure) => failure.to_value(),
        }
    }
}

/// Python-style truthiness of a JSON value
pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

fn status_field(obj: &Map<String, Value>) -> u16 {
    let parsed = match obj.get("status") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .and_then(|status| u16::try_from(status).ok())
        .unwrap_or(200)
}
