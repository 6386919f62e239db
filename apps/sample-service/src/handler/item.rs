//! # 商品ハンドラ
//!
//! リクエストごとに DI コンテナから [`ItemService`] を組み立てて呼び出す。
//! 登録・削除の権限チェックはルーター側のミドルウェアで行う。

use axum::{
    Json,
    extract::{Path, Query, State},
};
use strata_services::{ServiceArgs, ServiceError, ServiceProvider};
use strata_shared::{ApiResponse, PaginationRequest, PaginationResult, SortDirection};
use strata_web::{ApiError, RequestInfo, ValidatedJson};

use crate::{
    item::{CreateItemRequest, ItemDto},
    service::ItemService,
    store::ItemStore,
};

/// 商品ハンドラの State
#[derive(Clone)]
pub struct ItemState {
    pub provider: ServiceProvider,
}

impl ItemState {
    fn service(&self, info: &RequestInfo) -> Result<ItemService, ServiceError> {
        let args = ServiceArgs::resolve(&self.provider, Some(info.to_context()))?;
        let store = self.provider.require::<ItemStore>()?;
        Ok(ItemService::new(args, store))
    }
}

/// 商品一覧
#[utoipa::path(
    get,
    path = "/api/items",
    tag = "items",
    responses(
        (status = 200, description = "商品一覧（0 件なら Info メッセージ付き）", body = ApiResponse<Vec<ItemDto>>)
    )
)]
pub async fn list_items(
    State(state): State<ItemState>,
    info: RequestInfo,
) -> Result<Json<ApiResponse<Vec<ItemDto>>>, ApiError> {
    let mut service = state.service(&info)?;
    Ok(Json(service.list().await?))
}

/// 商品一覧（ページ単位）
#[utoipa::path(
    get,
    path = "/api/items/page",
    tag = "items",
    params(
        ("PageNumber" = Option<u32>, Query, description = "ページ番号（1 始まり）"),
        ("PageSize" = Option<u32>, Query, description = "1 ページの件数"),
        ("SortKey" = Option<String>, Query, description = "並べ替えに使うフィールド名"),
        ("SortDirection" = Option<SortDirection>, Query, description = "並べ替えの方向"),
    ),
    responses(
        (status = 200, description = "ページネーション結果", body = ApiResponse<PaginationResult<ItemDto>>)
    )
)]
pub async fn paginate_items(
    State(state): State<ItemState>,
    info: RequestInfo,
    Query(request): Query<PaginationRequest>,
) -> Result<Json<ApiResponse<PaginationResult<ItemDto>>>, ApiError> {
    let mut service = state.service(&info)?;
    Ok(Json(service.paginate(&request).await?))
}

/// 商品取得
#[utoipa::path(
    get,
    path = "/api/items/{id}",
    tag = "items",
    params(("id" = u32, Path, description = "商品 ID")),
    responses(
        (status = 200, description = "商品（見つからなければ Success = false）", body = ApiResponse<ItemDto>)
    )
)]
pub async fn get_item(
    State(state): State<ItemState>,
    info: RequestInfo,
    Path(id): Path<u32>,
) -> Result<Json<ApiResponse<ItemDto>>, ApiError> {
    let mut service = state.service(&info)?;
    Ok(Json(service.find(id).await?))
}

/// 商品登録（`AddItem` 権限が必要）
#[utoipa::path(
    post,
    path = "/api/items",
    tag = "items",
    request_body = CreateItemRequest,
    responses(
        (status = 200, description = "登録結果。検証エラーも Success = false で返す", body = ApiResponse<ItemDto>),
        (status = 401, description = "権限なし")
    )
)]
pub async fn create_item(
    State(state): State<ItemState>,
    info: RequestInfo,
    ValidatedJson(request): ValidatedJson<CreateItemRequest>,
) -> Result<Json<ApiResponse<ItemDto>>, ApiError> {
    let mut service = state.service(&info)?;
    Ok(Json(service.create(request).await?))
}

/// 商品削除（`DeleteItem` 権限が必要）
#[utoipa::path(
    delete,
    path = "/api/items/{id}",
    tag = "items",
    params(("id" = u32, Path, description = "商品 ID")),
    responses(
        (status = 200, description = "削除結果", body = ApiResponse<ItemDto>),
        (status = 401, description = "権限なし")
    )
)]
pub async fn delete_item(
    State(state): State<ItemState>,
    info: RequestInfo,
    Path(id): Path<u32>,
) -> Result<Json<ApiResponse<ItemDto>>, ApiError> {
    let mut service = state.service(&info)?;
    Ok(Json(service.delete(id).await?))
}
