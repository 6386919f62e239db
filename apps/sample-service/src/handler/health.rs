//! # ヘルスチェックハンドラ

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

/// ヘルスチェックの応答
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// 稼働状態（常に `"healthy"`）
    pub status:  String,
    pub version: String,
}

/// Liveness Check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "サーバー稼働中", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status:  "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
