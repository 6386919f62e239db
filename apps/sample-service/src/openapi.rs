//! # OpenAPI 仕様定義
//!
//! `ApiDoc::openapi()` で OpenAPI ドキュメントを取得できる。
//! タイトルとバージョンは起動時に Swagger 設定で上書きされる。

use utoipa::OpenApi;

use crate::{
    handler::{health, item},
    item::{CreateItemRequest, ItemDto},
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Strata Sample API",
        version = "0.1.0",
        description = "Strata のサンプル商品 API"
    ),
    paths(
        health::health_check,
        item::list_items,
        item::paginate_items,
        item::get_item,
        item::create_item,
        item::delete_item,
    ),
    components(schemas(ItemDto, CreateItemRequest, health::HealthResponse)),
    tags(
        (name = "health", description = "ヘルスチェック"),
        (name = "items", description = "商品"),
    )
)]
pub struct ApiDoc;
