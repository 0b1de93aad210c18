//! Error taxonomy for marketplace API calls.
//!
//! Server-originated failures (network, auth, validation) propagate to the
//! calling layer for display; local/storage failures are recovered inside the
//! stores and never surface here. A 401 anywhere is session-invalidating but
//! navigation stays a consumer concern.

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors that can occur when calling the marketplace API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response reached the client (DNS, connect, timeout, transport).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Authentication failed (401, or invalid credentials on login).
    #[error("Auth error: {0}")]
    Auth(String),

    /// The server rejected the payload with field-level messages.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Resource not found (404 on a detail fetch).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unexpected server response.
    #[error("Server error (HTTP {status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        message: String,
    },

    /// Response body failed to parse.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    /// True when this failure invalidates the local session.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

/// Field-level validation messages, keyed by input name.
///
/// The server's key/message mapping is preserved verbatim so the consumer
/// can attribute each message to the specific input that caused it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    /// Messages for a single field, if any.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    /// Iterate over all (field, messages) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// True when the server returned no usable field messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(no field details provided)");
        }
        let rendered = self
            .0
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(", ")))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{rendered}")
    }
}

/// Decode a non-success response body into the error taxonomy.
///
/// The API is a DRF-style backend:
/// - `{"detail": "..."}` carries a single human-readable message; on
///   400/401/403 that is an authentication/permission failure.
/// - Any other 400 object body is a field -> messages map (values are
///   strings or arrays of strings), surfaced verbatim.
/// - 404 maps to [`ApiError::NotFound`]; everything else is
///   [`ApiError::Server`] with a truncated body for diagnostics.
pub(crate) fn decode_error_body(status: u16, path: &str, body: &str) -> ApiError {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();

    if let Some(detail) = parsed
        .as_ref()
        .and_then(|v| v.get("detail"))
        .and_then(serde_json::Value::as_str)
        && matches!(status, 400 | 401 | 403)
    {
        return ApiError::Auth(detail.to_string());
    }

    match status {
        404 => ApiError::NotFound(path.to_string()),
        400 => {
            let fields = parsed
                .as_ref()
                .and_then(serde_json::Value::as_object)
                .map(|map| {
                    map.iter()
                        .map(|(field, value)| (field.clone(), value_to_messages(value)))
                        .collect::<BTreeMap<_, _>>()
                })
                .unwrap_or_default();
            ApiError::Validation(ValidationErrors(fields))
        }
        401 | 403 => ApiError::Auth("Authentication required".to_string()),
        _ => ApiError::Server {
            status,
            message: body.chars().take(200).collect(),
        },
    }
}

fn value_to_messages(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::String(s) => vec![s.clone()],
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        other => vec![other.to_string()],
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_on_400_is_auth() {
        let err = decode_error_body(400, "/accounts/login/", r#"{"detail":"Invalid credentials"}"#);
        assert!(matches!(&err, ApiError::Auth(msg) if msg == "Invalid credentials"));
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_field_map_on_400_is_validation() {
        let body = r#"{"email":["This field is required."],"password":["Too short.","Too common."]}"#;
        let err = decode_error_body(400, "/accounts/register/", body);
        let ApiError::Validation(fields) = err else {
            panic!("expected validation error, got {err}");
        };
        assert_eq!(
            fields.field("email").unwrap(),
            ["This field is required.".to_string()]
        );
        assert_eq!(fields.field("password").unwrap().len(), 2);
        assert_eq!(
            fields.to_string(),
            "email: This field is required.; password: Too short., Too common."
        );
    }

    #[test]
    fn test_bare_401_is_auth() {
        let err = decode_error_body(401, "/accounts/users/me/", "");
        assert!(matches!(&err, ApiError::Auth(msg) if msg == "Authentication required"));
    }

    #[test]
    fn test_404_is_not_found() {
        let err = decode_error_body(404, "/listings/materials/gone/", "{}");
        assert!(matches!(&err, ApiError::NotFound(path) if path == "/listings/materials/gone/"));
    }

    #[test]
    fn test_unexpected_status_truncates_body() {
        let body = "x".repeat(500);
        let err = decode_error_body(500, "/orders/", &body);
        let ApiError::Server { status, message } = err else {
            panic!("expected server error");
        };
        assert_eq!(status, 500);
        assert_eq!(message.len(), 200);
    }

    #[test]
    fn test_validation_errors_empty_display() {
        let errors = ValidationErrors::default();
        assert!(errors.is_empty());
        assert_eq!(errors.to_string(), "(no field details provided)");
    }
}
