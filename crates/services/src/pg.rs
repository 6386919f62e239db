//! # PostgreSQL データコンテキスト
//!
//! データベース種別（[`ServiceType::Database`](crate::ServiceType::Database)）向けの
//! [`DataContext`] 実装。`check_sql_server` で登録した接続プールを使う。
//!
//! 積んだ変更は [`DataContext::save_changes`] で 1 トランザクションにまとめて実行し、
//! 1 件でも失敗すればロールバックする。
//!
//! SQL はエンティティごとに [`PgEntity`] で定義する:
//!
//! ```ignore
//! impl PgEntity for Item {
//!     const SELECT_ALL: &'static str = "SELECT id, name FROM items ORDER BY id";
//!
//!     fn select_by_key(key: &i64) -> PgQueryAs<Self> {
//!         sqlx::query_as("SELECT id, name FROM items WHERE id = $1").bind(*key)
//!     }
//!
//!     fn insert_query(&self) -> PgQuery {
//!         sqlx::query("INSERT INTO items (id, name) VALUES ($1, $2)")
//!             .bind(self.id)
//!             .bind(self.name.clone())
//!     }
//!     // update_query / delete_query も同様
//! }
//! ```

use async_trait::async_trait;
use sqlx::{
    FromRow, PgPool, Postgres,
    postgres::{PgArguments, PgRow},
    query::{Query, QueryAs},
};

use crate::{
    data::{Change, DataContext, Entity},
    error::ServiceError,
};

/// 変更系の SQL
pub type PgQuery = Query<'static, Postgres, PgArguments>;

/// エンティティを返す SQL
pub type PgQueryAs<E> = QueryAs<'static, Postgres, E, PgArguments>;

/// PostgreSQL に保存できるエンティティ
pub trait PgEntity: Entity + for<'r> FromRow<'r, PgRow> + Unpin {
    /// 全件取得の SELECT 文
    const SELECT_ALL: &'static str;

    /// キーで 1 件取得する
    fn select_by_key(key: &Self::Key) -> PgQueryAs<Self>;

    fn insert_query(&self) -> PgQuery;

    fn update_query(&self) -> PgQuery;

    fn delete_query(&self) -> PgQuery;
}

/// PostgreSQL のデータコンテキスト
///
/// クローンしたコンテキストは同じ接続プールを使い、積んだ変更は引き継がない。
#[derive(Debug)]
pub struct PgDataContext<E> {
    pool:    PgPool,
    pending: Vec<Change<E>>,
}

impl<E> Clone for PgDataContext<E> {
    fn clone(&self) -> Self {
        Self {
            pool:    self.pool.clone(),
            pending: Vec::new(),
        }
    }
}

impl<E: PgEntity> PgDataContext<E> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            pending: Vec::new(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// 確定済みのエンティティを全件返す
    #[tracing::instrument(skip_all, level = "debug")]
    pub async fn all(&self) -> Result<Vec<E>, ServiceError> {
        let entities = sqlx::query_as::<_, E>(E::SELECT_ALL)
            .fetch_all(&self.pool)
            .await?;
        Ok(entities)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(key = ?key))]
    pub async fn find(&self, key: &E::Key) -> Result<Option<E>, ServiceError> {
        let entity = E::select_by_key(key).fetch_optional(&self.pool).await?;
        Ok(entity)
    }
}

#[async_trait]
impl<E: PgEntity> DataContext<E> for PgDataContext<E> {
    fn add(&mut self, entity: E) {
        self.pending.push(Change::Add(entity));
    }

    fn update(&mut self, entity: E) {
        self.pending.push(Change::Update(entity));
    }

    fn remove(&mut self, entity: E) {
        self.pending.push(Change::Remove(entity));
    }

    fn discard_changes(&mut self) {
        self.pending.clear();
    }

    async fn save_changes(&mut self) -> Result<usize, ServiceError> {
        let changes = std::mem::take(&mut self.pending);
        if changes.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut affected = 0_u64;
        for change in &changes {
            let query = match change {
                Change::Add(entity) => entity.insert_query(),
                Change::Update(entity) => entity.update_query(),
                Change::Remove(entity) => entity.delete_query(),
            };
            affected += query.execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;

        Ok(usize::try_from(affected).unwrap_or(usize::MAX))
    }
}
