//! Shared types for the F5-TTS voice-cloning server and client.

use serde::{Deserialize, Serialize};

/// Error response body.
///
/// The wire format is a single `error` field; clients match on the HTTP
/// status code for the failure class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Server configuration constants.
pub mod config {
    /// Default server port.
    pub const DEFAULT_PORT: u16 = 8080;
    /// Server version.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    /// Error message returned when required request fields are absent.
    pub const MISSING_FIELDS_ERROR: &str = "Missing reference_audio or text";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_wire_format() {
        let body = ErrorResponse {
            error: config::MISSING_FIELDS_ERROR.to_string(),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"error":"Missing reference_audio or text"}"#);
    }

    #[test]
    fn test_health_response_omits_absent_model() {
        let health = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            model: None,
        };
        let json = serde_json::to_string(&health).unwrap();
        assert!(!json.contains("model"));
    }
}
