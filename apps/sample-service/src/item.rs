//! # 商品
//!
//! ストアに保存するエンティティ、応答用の DTO、登録リクエストを定義する。

use serde::{Deserialize, Serialize};
use strata_services::{Entity, PgEntity, PgQuery, PgQueryAs};
use utoipa::ToSchema;
use validator::Validate;

/// 商品エンティティ
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct Item {
    #[sqlx(try_from = "i64")]
    pub id:            u32,
    pub name:          String,
    pub price:         f64,
    /// 内部管理用のメモ。応答には含めない
    pub internal_memo: Option<String>,
}

impl Entity for Item {
    type Key = u32;

    fn key(&self) -> Self::Key {
        self.id
    }
}

impl PgEntity for Item {
    const SELECT_ALL: &'static str =
        "SELECT id, name, price, internal_memo FROM items ORDER BY id";

    fn select_by_key(key: &u32) -> PgQueryAs<Self> {
        sqlx::query_as("SELECT id, name, price, internal_memo FROM items WHERE id = $1")
            .bind(i64::from(*key))
    }

    fn insert_query(&self) -> PgQuery {
        sqlx::query("INSERT INTO items (id, name, price, internal_memo) VALUES ($1, $2, $3, $4)")
            .bind(i64::from(self.id))
            .bind(self.name.clone())
            .bind(self.price)
            .bind(self.internal_memo.clone())
    }

    fn update_query(&self) -> PgQuery {
        sqlx::query("UPDATE items SET name = $2, price = $3, internal_memo = $4 WHERE id = $1")
            .bind(i64::from(self.id))
            .bind(self.name.clone())
            .bind(self.price)
            .bind(self.internal_memo.clone())
    }

    fn delete_query(&self) -> PgQuery {
        sqlx::query("DELETE FROM items WHERE id = $1").bind(i64::from(self.id))
    }
}

/// 商品の応答形式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct ItemDto {
    pub id:    u32,
    pub name:  String,
    pub price: f64,
}

impl From<Item> for ItemDto {
    fn from(item: Item) -> Self {
        Self {
            id:    item.id,
            name:  item.name,
            price: item.price,
        }
    }
}

/// 商品登録リクエスト
#[derive(Debug, Clone, PartialEq, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name:  String,
    #[validate(range(exclusive_min = 0.0, message = "Price must be positive"))]
    pub price: f64,
}

impl CreateItemRequest {
    pub fn into_item(self, id: u32) -> Item {
        Item {
            id,
            name: self.name.trim().to_string(),
            price: self.price,
            internal_memo: None,
        }
    }
}

/// 起動時にストアへ投入する商品
pub fn seed_items() -> Vec<Item> {
    [("Keyboard", 49.5), ("Mouse", 19.9), ("Monitor", 219.0)]
        .into_iter()
        .zip(1..)
        .map(|((name, price), id)| Item {
            id,
            name: name.to_string(),
            price,
            internal_memo: None,
        })
        .collect()
}
