use axum::Json;

use crate::response::ApiResponse;

/// GET /api/health
pub async fn health_handler() -> Json<ApiResponse<()>> {
    Json(ApiResponse::<()>::message("Pool API is running"))
}

/// GET /api
pub async fn root_handler() -> Json<ApiResponse<()>> {
    Json(ApiResponse::<()>::message("Pool API - Use /api routes"))
}
