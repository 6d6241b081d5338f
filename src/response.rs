use std::collections::BTreeMap;

use axum::http::StatusCode;
use serde::Serialize;

use crate::extract::Json;

/// Uniform JSON envelope returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data: Some(data),
            error: None,
            errors: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(message: &str, errors: Option<BTreeMap<String, String>>) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            data: None,
            error: None,
            errors,
        }
    }
}

/// 200 with the standard envelope.
pub fn ok<T: Serialize>(data: T, message: &str) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::OK, Json(ApiResponse::success(data, message)))
}

/// 201 with the standard envelope.
pub fn created<T: Serialize>(data: T, message: &str) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data, message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_omits_error_fields() {
        let body = serde_json::to_value(ApiResponse::success(42, "Success")).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Success");
        assert_eq!(body["data"], 42);
        assert!(body.get("error").is_none());
        assert!(body.get("errors").is_none());
    }

    #[test]
    fn failure_envelope_carries_field_errors() {
        let mut errors = BTreeMap::new();
        errors.insert("email".to_string(), "Email is required".to_string());
        let body =
            serde_json::to_value(ApiResponse::failure("Validation error", Some(errors))).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"]["email"], "Email is required");
        assert!(body.get("data").is_none());
    }
}
