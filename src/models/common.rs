use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 错误响应: {"success": false, "error": {code, message}}
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}
