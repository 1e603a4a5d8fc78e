//! Error type for API calls.

use serde_json::Value;

/// Failure taxonomy for the consumed API.
///
/// `Api` carries the server's status and diagnostic body; `Transport` means
/// no response arrived at all. Variants are cheap to clone so a single
/// failure can be shared with every reader joined on the same in-flight
/// fetch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        data: Option<Value>,
    },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Config error: {0}")]
    Config(String),
}

impl ApiError {
    /// Build the error for a non-2xx response from its status and body text.
    ///
    /// The body is JSON-parsed when possible; the message prefers the
    /// service's `detail`/`message` field, falls back to the raw text, and
    /// defaults to `HTTP <status>` for an empty body.
    pub fn from_response_parts(status: u16, body: &str) -> ApiError {
        if body.is_empty() {
            return ApiError::Api {
                status,
                message: format!("HTTP {}", status),
                data: None,
            };
        }
        match serde_json::from_str::<Value>(body) {
            Ok(value) => {
                let message = value
                    .get("detail")
                    .and_then(Value::as_str)
                    .or_else(|| value.get("message").and_then(Value::as_str))
                    .map(str::to_string)
                    .unwrap_or_else(|| match &value {
                        Value::String(s) => s.clone(),
                        _ => format!("HTTP {}", status),
                    });
                ApiError::Api {
                    status,
                    message,
                    data: Some(value),
                }
            }
            Err(_) => ApiError::Api {
                status,
                message: body.to_string(),
                data: Some(Value::String(body.to_string())),
            },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for the authorization failures that mean the session expired.
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Api { status: 401 | 403, .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_defaults_to_http_status() {
        let err = ApiError::from_response_parts(502, "");
        assert_eq!(
            err,
            ApiError::Api {
                status: 502,
                message: "HTTP 502".to_string(),
                data: None,
            }
        );
    }

    #[test]
    fn json_detail_becomes_the_message() {
        let err = ApiError::from_response_parts(422, r#"{"detail":"competencia invalida"}"#);
        match err {
            ApiError::Api {
                status,
                message,
                data,
            } => {
                assert_eq!(status, 422);
                assert_eq!(message, "competencia invalida");
                assert!(data.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn plain_text_body_is_kept_verbatim() {
        let err = ApiError::from_response_parts(500, "internal server error");
        match err {
            ApiError::Api { message, data, .. } => {
                assert_eq!(message, "internal server error");
                assert_eq!(data, Some(Value::String("internal server error".into())));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn auth_statuses_are_flagged() {
        assert!(ApiError::from_response_parts(401, "").is_auth());
        assert!(ApiError::from_response_parts(403, "").is_auth());
        assert!(!ApiError::from_response_parts(404, "").is_auth());
        assert!(!ApiError::Transport("timeout".into()).is_auth());
    }
}
