//! API response wrapper types.
//!
//! Every JSON endpoint of the monitor answers with the same envelope.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Standard API response wrapper.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,

    /// Response data (present on success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// Error details (present on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    /// Response metadata.
    pub meta: ResponseMeta,
}

/// API error details.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// Error code for client handling (e.g., "NOT_READY").
    pub code: String,

    /// Human-readable error message.
    pub message: String,
}

/// Response metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResponseMeta {
    /// Response timestamp.
    pub timestamp: DateTime<Utc>,

    /// Service name that handled the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            service: None,
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response with data.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: ResponseMeta::default(),
        }
    }

    /// Creates a successful response tagged with the service name.
    pub fn ok_with_service(data: T, service: impl Into<String>) -> Self {
        Self::ok(data).with_service(service)
    }

    /// Sets the service name on the response.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.meta.service = Some(service.into());
        self
    }
}

impl ApiResponse<()> {
    /// Creates an error response.
    pub fn err(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
            meta: ResponseMeta::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_omits_error() {
        let json = serde_json::to_value(ApiResponse::ok_with_service(3, "mmtop")).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 3);
        assert_eq!(json["meta"]["service"], "mmtop");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_err_omits_data() {
        let json = serde_json::to_value(ApiResponse::err("NOT_READY", "wait")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "NOT_READY");
        assert!(json.get("data").is_none());
    }
}
