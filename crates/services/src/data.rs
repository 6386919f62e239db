//! # データコンテキスト
//!
//! 操作種別に応じてエンティティの変更を積み、まとめて確定する。
//!
//! - [`DataContext`]: 変更の登録と確定を行う抽象
//! - [`InMemoryDataContext`]: モック種別向けのメモリ上のストア
//! - [`PgDataContext`](crate::pg::PgDataContext): データベース種別向けのストア
//! - [`PaginatedQuery`]: ページ単位でデータを返すクエリ
//! - [`save_async`]: 操作種別から登録方法を選び、必要なら確定する

use std::{cmp::Ordering, fmt, hash::Hash, sync::Arc};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use strata_shared::{ApiOperationType, PaginationRequest, PaginationResult, SortDirection};
use tokio::sync::RwLock;

use crate::error::ServiceError;

/// 変更を積んで確定するデータコンテキスト
#[async_trait]
pub trait DataContext<E: Send>: Send {
    fn add(&mut self, entity: E);

    fn update(&mut self, entity: E);

    fn remove(&mut self, entity: E);

    /// 積んだ変更を破棄する
    fn discard_changes(&mut self);

    /// 積んだ変更を確定し、反映した件数を返す
    async fn save_changes(&mut self) -> Result<usize, ServiceError>;
}

/// 操作種別に応じてエンティティを登録し、`commit` なら確定する
///
/// | 操作 | 登録 |
/// |------|------|
/// | `Insert` / `BulkInsert` | `add` |
/// | `Update` / `BulkUpdate` | `update` |
/// | `Delete` / `BulkDelete` | `remove` |
/// | `Read` | なし（確定もしない） |
pub async fn save_async<E, C>(
    context: &mut C,
    operation: ApiOperationType,
    entities: impl IntoIterator<Item = E>,
    commit: bool,
) -> Result<(), ServiceError>
where
    E: Send,
    C: DataContext<E> + ?Sized,
{
    for entity in entities {
        match operation {
            ApiOperationType::Insert | ApiOperationType::BulkInsert => context.add(entity),
            ApiOperationType::Update | ApiOperationType::BulkUpdate => context.update(entity),
            ApiOperationType::Delete | ApiOperationType::BulkDelete => context.remove(entity),
            ApiOperationType::Read => {}
        }
    }

    if commit && operation.is_write() {
        let affected = context.save_changes().await?;
        tracing::debug!(operation = %operation, affected, "変更を確定しました");
    }
    Ok(())
}

/// キーで識別できるエンティティ
pub trait Entity: Clone + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + fmt::Debug + Send + Sync;

    fn key(&self) -> Self::Key;
}

#[derive(Debug, Clone)]
pub(crate) enum Change<E> {
    Add(E),
    Update(E),
    Remove(E),
}

/// メモリ上のデータコンテキスト
///
/// ストアは `Arc` で共有され、クローンしたコンテキストは同じストアを見る。
/// 積んだ変更はコンテキストごとに持つ。確定はすべて成功した場合のみ反映する。
#[derive(Debug)]
pub struct InMemoryDataContext<E: Entity> {
    store:   Arc<RwLock<Vec<E>>>,
    pending: Vec<Change<E>>,
}

impl<E: Entity> Default for InMemoryDataContext<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Clone for InMemoryDataContext<E> {
    /// ストアを共有し、積んだ変更は引き継がない
    fn clone(&self) -> Self {
        Self {
            store:   Arc::clone(&self.store),
            pending: Vec::new(),
        }
    }
}

impl<E: Entity> InMemoryDataContext<E> {
    pub fn new() -> Self {
        Self::with_entities(Vec::new())
    }

    pub fn with_entities(entities: Vec<E>) -> Self {
        Self {
            store:   Arc::new(RwLock::new(entities)),
            pending: Vec::new(),
        }
    }

    /// 確定済みのエンティティ（登録順）
    pub async fn snapshot(&self) -> Vec<E> {
        self.store.read().await.clone()
    }

    pub async fn find(&self, key: &E::Key) -> Option<E> {
        self.store
            .read()
            .await
            .iter()
            .find(|entity| &entity.key() == key)
            .cloned()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn apply<E: Entity>(store: &mut Vec<E>, change: Change<E>) -> Result<(), ServiceError> {
    let position = |store: &Vec<E>, key: &E::Key| store.iter().position(|e| &e.key() == key);

    match change {
        Change::Add(entity) => {
            if position(store, &entity.key()).is_some() {
                return Err(ServiceError::Data(format!(
                    "キーが重複しています: {:?}",
                    entity.key()
                )));
            }
            store.push(entity);
        }
        Change::Update(entity) => {
            let index = position(store, &entity.key()).ok_or_else(|| {
                ServiceError::Data(format!("更新対象が見つかりません: {:?}", entity.key()))
            })?;
            store[index] = entity;
        }
        Change::Remove(entity) => {
            let index = position(store, &entity.key()).ok_or_else(|| {
                ServiceError::Data(format!("削除対象が見つかりません: {:?}", entity.key()))
            })?;
            store.remove(index);
        }
    }
    Ok(())
}

#[async_trait]
impl<E: Entity> DataContext<E> for InMemoryDataContext<E> {
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
        let affected = changes.len();

        let mut store = self.store.write().await;
        let mut staged = store.clone();
        for change in changes {
            apply(&mut staged, change)?;
        }
        *store = staged;

        Ok(affected)
    }
}

/// ページ単位でデータを返すクエリ
#[async_trait]
pub trait PaginatedQuery<S>: Send + Sync {
    async fn paginate(
        &self,
        request: &PaginationRequest,
    ) -> Result<PaginationResult<S>, ServiceError>;
}

/// メモリ上の要素列に対するページネーション
///
/// `sort_key` が指定されていれば、要素をシリアライズしたオブジェクトの
/// 同名フィールド（大文字小文字を区別しない）で並べ替える。
#[async_trait]
impl<S> PaginatedQuery<S> for Vec<S>
where
    S: Clone + Serialize + Send + Sync,
{
    async fn paginate(
        &self,
        request: &PaginationRequest,
    ) -> Result<PaginationResult<S>, ServiceError> {
        let request = request.normalized();
        let mut items = self.clone();

        if let Some(sort_key) = request.sort_key.as_deref() {
            let mut keyed = items
                .into_iter()
                .map(|item| {
                    let value = serde_json::to_value(&item)
                        .map_err(|e| ServiceError::Data(e.to_string()))?;
                    Ok((sort_value(&value, sort_key), item))
                })
                .collect::<Result<Vec<_>, ServiceError>>()?;

            keyed.sort_by(|(a, _), (b, _)| {
                let ordering = compare_values(a, b);
                match request.sort_direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
            items = keyed.into_iter().map(|(_, item)| item).collect();
        }

        let record_count = items.len() as u64;
        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let page = items
            .into_iter()
            .skip(offset)
            .take(request.page_size as usize)
            .collect();

        Ok(PaginationResult::new(&request, page, record_count))
    }
}

fn sort_value(value: &Value, key: &str) -> Value {
    match value {
        Value::Object(map) => map
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.clone())
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
