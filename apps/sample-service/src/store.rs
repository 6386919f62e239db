//! # 商品ストア
//!
//! サービス種別に応じて商品の保存先を切り替える。
//!
//! | 種別 | 保存先 | ID の採番 |
//! |------|--------|-----------|
//! | `ServiceEF`（接続プールあり） | PostgreSQL の `items` テーブル | シーケンス `items_id_seq` |
//! | それ以外 | メモリ | ストアで共有するカウンタ |
//!
//! テーブル定義は `schema.sql` を参照。

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use async_trait::async_trait;
use sqlx::PgPool;
use strata_services::{DataContext, InMemoryDataContext, PgDataContext, ServiceError};

use crate::item::Item;

/// 商品の保存先
///
/// クローンは同じ保存先と採番を共有する。
#[derive(Debug, Clone)]
pub enum ItemStore {
    Memory {
        context:  InMemoryDataContext<Item>,
        sequence: Arc<AtomicU32>,
    },
    Postgres(PgDataContext<Item>),
}

impl ItemStore {
    /// メモリ上のストアを作成する。採番は `items` の最大 ID の次から
    pub fn in_memory(items: Vec<Item>) -> Self {
        let last_id = items.iter().map(|item| item.id).max().unwrap_or(0);
        Self::Memory {
            context:  InMemoryDataContext::with_entities(items),
            sequence: Arc::new(AtomicU32::new(last_id)),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self::Postgres(PgDataContext::new(pool))
    }

    pub fn is_postgres(&self) -> bool {
        matches!(self, Self::Postgres(_))
    }

    /// 確定済みの商品（ID 順）
    pub async fn all(&self) -> Result<Vec<Item>, ServiceError> {
        match self {
            Self::Memory { context, .. } => Ok(context.snapshot().await),
            Self::Postgres(context) => context.all().await,
        }
    }

    pub async fn find(&self, id: u32) -> Result<Option<Item>, ServiceError> {
        match self {
            Self::Memory { context, .. } => Ok(context.find(&id).await),
            Self::Postgres(context) => context.find(&id).await,
        }
    }

    /// 次の商品 ID を採番する
    ///
    /// 同時に呼ばれても同じ ID は返さない。
    pub async fn next_id(&self) -> Result<u32, ServiceError> {
        match self {
            Self::Memory { sequence, .. } => Ok(sequence.fetch_add(1, Ordering::SeqCst) + 1),
            Self::Postgres(context) => {
                let id: i64 = sqlx::query_scalar("SELECT nextval('items_id_seq')")
                    .fetch_one(context.pool())
                    .await?;
                u32::try_from(id)
                    .map_err(|_| ServiceError::Data(format!("商品 ID が範囲外です: {id}")))
            }
        }
    }
}

#[async_trait]
impl DataContext<Item> for ItemStore {
    fn add(&mut self, entity: Item) {
        match self {
            Self::Memory { context, .. } => context.add(entity),
            Self::Postgres(context) => context.add(entity),
        }
    }

    fn update(&mut self, entity: Item) {
        match self {
            Self::Memory { context, .. } => context.update(entity),
            Self::Postgres(context) => context.update(entity),
        }
    }

    fn remove(&mut self, entity: Item) {
        match self {
            Self::Memory { context, .. } => context.remove(entity),
            Self::Postgres(context) => context.remove(entity),
        }
    }

    fn discard_changes(&mut self) {
        match self {
            Self::Memory { context, .. } => context.discard_changes(),
            Self::Postgres(context) => context.discard_changes(),
        }
    }

    async fn save_changes(&mut self) -> Result<usize, ServiceError> {
        match self {
            Self::Memory { context, .. } => context.save_changes().await,
            Self::Postgres(context) => context.save_changes().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::item::seed_items;

    #[tokio::test]
    async fn test_メモリのストアは初期データの次から採番する() {
        let store = ItemStore::in_memory(seed_items());

        assert_eq!(store.next_id().await.unwrap(), 4);
        assert_eq!(store.next_id().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_クローンは採番を共有する() {
        let store = ItemStore::in_memory(Vec::new());
        let cloned = store.clone();

        assert_eq!(store.next_id().await.unwrap(), 1);
        assert_eq!(cloned.next_id().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_確定した変更はallとfindに反映される() {
        let mut store = ItemStore::in_memory(seed_items());
        let removed = store.find(2).await.unwrap().unwrap();

        store.remove(removed);
        store.save_changes().await.unwrap();

        let ids: Vec<u32> = store.all().await.unwrap().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(store.find(2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_接続プールからpostgresのストアを作れる() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/items")
            .unwrap();

        let store = ItemStore::postgres(pool);

        assert!(store.is_postgres());
    }
}
