use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 统一响应包裹 `{success, data}` / `{success, error}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    #[schema(example = "NOT_FOUND")]
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: String, message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError { code, message }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let json = serde_json::to_value(ApiResponse::success(serde_json::json!({"message": "ok"})))
            .unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["message"], "ok");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_error_envelope() {
        let json = serde_json::to_value(ApiResponse::<()>::error(
            "NOT_FOUND".into(),
            "Lottery not found".into(),
        ))
        .unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert!(json.get("data").is_none());
    }
}
