//! Envelope response format for all API responses.
//!
//! Success:
//! ```json
//! { "success": true, "data": { ... },
//!   "meta": { "request_id": "...", "timestamp": "...", "response_time_ms": 5 } }
//! ```
//! Failure:
//! ```json
//! { "success": false, "error": { "message": "...", "code": "NOT_FOUND" },
//!   "meta": { ... } }
//! ```

use serde::Serialize;

/// Envelope wrapping all API payloads.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,

    /// The main response payload (success only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// Error detail (failure only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorDetail>,

    /// Request metadata.
    pub meta: ApiMeta,
}

/// Metadata included in every response.
#[derive(Debug, Serialize)]
pub struct ApiMeta {
    /// Unique request identifier for tracing.
    pub request_id: String,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
    /// Response time in milliseconds.
    pub response_time_ms: u64,
}

/// Error detail carried in failure envelopes.
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    /// Human-readable error message.
    pub message: String,
    /// Machine-readable error code.
    pub code: String,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success envelope with data.
    pub fn success(data: T, request_id: String, response_time_ms: u64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: ApiMeta {
                request_id,
                timestamp: chrono::Utc::now().to_rfc3339(),
                response_time_ms,
            },
        }
    }
}

impl ApiResponse<()> {
    /// Create a failure envelope (no data).
    pub fn error(code: &str, message: &str, request_id: String, response_time_ms: u64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiErrorDetail {
                message: message.to_string(),
                code: code.to_string(),
            }),
            meta: ApiMeta {
                request_id,
                timestamp: chrono::Utc::now().to_rfc3339(),
                response_time_ms,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let resp = ApiResponse::success(serde_json::json!({"id": 1}), "req-1".to_string(), 7);
        let value = serde_json::to_value(&resp).unwrap();

        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["id"], 1);
        assert!(value.get("error").is_none());
        assert_eq!(value["meta"]["request_id"], "req-1");
        assert_eq!(value["meta"]["response_time_ms"], 7);
    }

    #[test]
    fn error_envelope_shape() {
        let resp = ApiResponse::error("NOT_FOUND", "workflow missing", "req-2".to_string(), 3);
        let value = serde_json::to_value(&resp).unwrap();

        assert_eq!(value["success"], false);
        assert!(value.get("data").is_none());
        assert_eq!(value["error"]["code"], "NOT_FOUND");
        assert_eq!(value["error"]["message"], "workflow missing");
    }
}
