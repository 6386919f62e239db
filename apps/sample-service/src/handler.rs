//! # HTTP リクエストハンドラ
//!
//! ハンドラは薄く保ち、業務処理は [`ItemService`](crate::service::ItemService) に委譲する。
//!
//! - `health`: ヘルスチェック
//! - `item`: 商品の参照・登録・削除

pub mod health;
pub mod item;

pub use health::{HealthResponse, health_check};
pub use item::{ItemState, create_item, delete_item, get_item, list_items, paginate_items};
