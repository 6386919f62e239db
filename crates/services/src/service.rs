//! # サービス基盤
//!
//! 業務サービスが共通で使う依存（設定・ローカライザ・マッパー・バリデータ・
//! リクエストコンテキスト）と、統一レスポンスを組み立てるヘルパーを提供する。
//!
//! ## レスポンスの組み立て規則
//!
//! | メソッド | Message / MessageType | Success |
//! |----------|----------------------|---------|
//! | [`ApiService::ok`] | メッセージが空でなければ `Success` | `true` |
//! | [`ApiService::ok_for`] `Read` + 空コレクション | 「該当なし」/ `Info` | `true` |
//! | [`ApiService::ok_for`] `Read` + それ以外 | なし | `true` |
//! | [`ApiService::ok_for`] 書き込み系 | 操作ごとの完了メッセージ / `Success` | `true` |
//! | [`ApiService::error`] | 指定メッセージ / `Error` | `false` |
//! | [`ApiService::paginate`] 0 件 | 「該当なし」/ `Info` | `true` |
//!
//! ## 使用例
//!
//! ```ignore
//! pub async fn list(&mut self) -> Result<ApiResponse<Vec<ItemDto>>, ServiceError> {
//!     self.start_log(caller!());
//!     let items = self.store.snapshot().await;
//!     let response = self.base.ok_for::<Vec<Item>, Vec<ItemDto>>(items, ApiOperationType::Read);
//!     self.end_log(caller!(), None);
//!     response
//! }
//! ```

use std::{
    fmt::Display,
    sync::Arc,
    time::{Duration, Instant},
};

use serde::Serialize;
use sqlx::PgPool;
use strata_shared::{
    ApiOperationType, ApiResponse, Localizer, MessageType, PaginationRequest, PaginationResult,
    ResourceCatalog, UntypedResponse, resources::keys,
};

use crate::{
    collection::is_empty_collection,
    config_source::ConfigSource,
    container::ServiceProvider,
    data::{DataContext, PaginatedQuery, save_async},
    error::ServiceError,
    mapper::ObjectMapper,
    pg::{PgDataContext, PgEntity},
    validation::ValidatorRegistry,
};

/// 呼び出し元の関数名を返す
///
/// `async fn` の中でも外側の関数名を返す。
#[macro_export]
macro_rules! caller {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        let name = name.strip_suffix("::f").unwrap_or(name);
        name.rsplit("::")
            .find(|segment| *segment != "{{closure}}")
            .unwrap_or(name)
    }};
}

/// 現在のリクエストの情報
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: Option<String>,
    pub method:     Option<String>,
    pub path:       Option<String>,
    pub user_id:    Option<String>,
}

/// サービスが使う依存の束
#[derive(Clone)]
pub struct ServiceArgs {
    pub provider:   ServiceProvider,
    pub config:     Arc<dyn ConfigSource>,
    pub localizer:  Arc<dyn Localizer>,
    pub mapper:     Arc<ObjectMapper>,
    pub validators: Arc<ValidatorRegistry>,
    pub pool:       Option<PgPool>,
    pub context:    Option<RequestContext>,
}

impl std::fmt::Debug for ServiceArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceArgs")
            .field("mapper", &self.mapper)
            .field("validators", &self.validators)
            .field("pool", &self.pool.is_some())
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl ServiceArgs {
    /// プロバイダから依存を解決する
    ///
    /// 設定ストアは必須。ローカライザ・マッパー・バリデータは未登録なら
    /// 既定値（組み込みの英語テーブル・空のマッパー・空のレジストリ）を使う。
    /// 接続プールはデータベース種別で登録されている場合のみ持つ。
    ///
    /// # Errors
    ///
    /// 設定ストアが登録されていない場合は [`ServiceError::MissingArgument`]
    pub fn resolve(
        provider: &ServiceProvider,
        context: Option<RequestContext>,
    ) -> Result<Self, ServiceError> {
        let config = provider
            .get::<Arc<dyn ConfigSource>>()
            .ok_or(ServiceError::MissingArgument("config"))?;

        Ok(Self {
            provider: provider.clone(),
            config,
            localizer: provider
                .get::<Arc<dyn Localizer>>()
                .unwrap_or_else(|| Arc::new(ResourceCatalog::default())),
            mapper: provider.get::<Arc<ObjectMapper>>().unwrap_or_default(),
            validators: provider.get::<Arc<ValidatorRegistry>>().unwrap_or_default(),
            pool: provider.get::<PgPool>(),
            context,
        })
    }

    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    /// 接続プールを使うデータコンテキストを作成する
    ///
    /// # Errors
    ///
    /// 接続プールが登録されていない場合は [`ServiceError::MissingArgument`]
    pub fn pg_context<E: PgEntity>(&self) -> Result<PgDataContext<E>, ServiceError> {
        self.pool
            .clone()
            .map(PgDataContext::new)
            .ok_or(ServiceError::MissingArgument("pool"))
    }
}

/// 一時停止できる経過時間計測
#[derive(Debug, Clone, Copy, Default)]
struct Stopwatch {
    elapsed: Duration,
    started: Option<Instant>,
}

impl Stopwatch {
    fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            self.elapsed += started.elapsed();
        }
    }

    fn elapsed(&self) -> Duration {
        self.elapsed + self.started.map(|s| s.elapsed()).unwrap_or_default()
    }
}

/// 業務サービスの基盤
///
/// リクエストごとに作成し、処理の終了時に破棄する。
/// 破棄後にヘルパーを呼ぶと [`ServiceError::Disposed`] になる。
pub struct ApiService {
    name:      &'static str,
    args:      Option<ServiceArgs>,
    stopwatch: Stopwatch,
}

impl std::fmt::Debug for ApiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiService")
            .field("name", &self.name)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

impl ApiService {
    /// `name` は破棄時のログに出すサービス名
    pub fn new(name: &'static str, args: ServiceArgs) -> Self {
        Self {
            name,
            args: Some(args),
            stopwatch: Stopwatch::default(),
        }
    }

    fn args(&self) -> Result<&ServiceArgs, ServiceError> {
        self.args.as_ref().ok_or(ServiceError::Disposed)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_disposed(&self) -> bool {
        self.args.is_none()
    }

    pub fn provider(&self) -> Result<&ServiceProvider, ServiceError> {
        Ok(&self.args()?.provider)
    }

    pub fn config(&self) -> Result<&dyn ConfigSource, ServiceError> {
        Ok(self.args()?.config.as_ref())
    }

    pub fn localizer(&self) -> Result<&dyn Localizer, ServiceError> {
        Ok(self.args()?.localizer.as_ref())
    }

    pub fn mapper(&self) -> Result<&ObjectMapper, ServiceError> {
        Ok(self.args()?.mapper.as_ref())
    }

    pub fn context(&self) -> Option<&RequestContext> {
        self.args.as_ref().and_then(|args| args.context.as_ref())
    }

    fn resource(&self, name: &str, args: &[&dyn Display]) -> String {
        match &self.args {
            Some(service_args) => service_args.localizer.get_with(name, args),
            None => ResourceCatalog::default().get_with(name, args),
        }
    }

    /// 処理の開始を記録し、計測を始める
    pub fn start_log(&mut self, caller: &str) {
        self.stopwatch.start();
        tracing::debug!(caller, "{}", self.resource(keys::START_LOG_START, &[&caller]));
    }

    /// 処理の終了を記録し、計測を止める
    ///
    /// 経過秒数は `start_log` からの累計。`message` が空でなければ追加で出力する。
    pub fn end_log(&mut self, caller: &str, message: Option<&str>) {
        self.stopwatch.stop();
        let total_seconds = self.elapsed().as_secs_f64();

        tracing::debug!(caller, "{}", self.resource(keys::END_LOG_END, &[&caller]));
        tracing::debug!(
            caller,
            total_seconds,
            "{}",
            self.resource(keys::END_LOG_TOTAL_SECONDS, &[&total_seconds])
        );
        if let Some(message) = message.filter(|m| !m.is_empty()) {
            tracing::debug!(caller, "{message}");
        }
    }

    /// 累計の計測時間
    pub fn elapsed(&self) -> Duration {
        self.stopwatch.elapsed()
    }

    /// ペイロードを検証する
    ///
    /// # Errors
    ///
    /// - ペイロードがない: 「引数は必須」メッセージの [`ServiceError::Validation`]
    /// - 業務ルール違反: 最初のエラーメッセージの [`ServiceError::Validation`]
    /// - バリデータ未登録: [`ServiceError::ValidatorNotRegistered`]
    pub fn validate<T: 'static>(&self, payload: Option<&T>) -> Result<(), ServiceError> {
        let args = self.args()?;
        let Some(payload) = payload else {
            return Err(ServiceError::Validation(
                args.localizer
                    .get_with(keys::ARGUMENT_CAN_NOT_BE_NULL, &[&"payload"]),
            ));
        };

        match args.validators.first_error(payload)? {
            Some(message) => Err(ServiceError::Validation(message)),
            None => Ok(()),
        }
    }

    /// `data` を `T` に変換した成功レスポンスを返す
    ///
    /// `message` が空でなければ `MessageType = Success` を付ける。
    pub fn ok<S: 'static, T: 'static>(
        &self,
        data: S,
        message: Option<&str>,
    ) -> Result<ApiResponse<T>, ServiceError> {
        let mapped = self.args()?.mapper.map::<S, T>(data)?;
        let response = ApiResponse::new(mapped);

        Ok(match message.filter(|m| !m.is_empty()) {
            Some(message) => response
                .with_message(message)
                .with_message_type(MessageType::Success),
            None => response,
        })
    }

    /// 操作種別に応じたメッセージを付けた成功レスポンスを返す
    ///
    /// `Read` で変換後のデータが空のシーケンス・マップの場合は
    /// 「該当なし」の `Info` を付ける。
    pub fn ok_for<S: 'static, T: Serialize + 'static>(
        &self,
        data: S,
        operation: ApiOperationType,
    ) -> Result<ApiResponse<T>, ServiceError> {
        let args = self.args()?;
        let mapped = args.mapper.map::<S, T>(data)?;

        let message = match operation {
            ApiOperationType::Read => is_empty_collection(&mapped)
                .then_some((keys::NO_RECORDS_FOUND, MessageType::Info)),
            ApiOperationType::Insert => Some((keys::RESPONSE_INSERT, MessageType::Success)),
            ApiOperationType::BulkInsert => Some((keys::RESPONSE_BULK_INSERT, MessageType::Success)),
            ApiOperationType::Update => Some((keys::RESPONSE_UPDATE, MessageType::Success)),
            ApiOperationType::BulkUpdate => Some((keys::RESPONSE_BULK_UPDATE, MessageType::Success)),
            ApiOperationType::Delete => Some((keys::RESPONSE_DELETE, MessageType::Success)),
            ApiOperationType::BulkDelete => Some((keys::RESPONSE_BULK_DELETE, MessageType::Success)),
        };

        let response = ApiResponse::new(mapped);
        Ok(match message {
            Some((name, message_type)) => response
                .with_message(args.localizer.get(name))
                .with_message_type(message_type),
            None => response,
        })
    }

    /// エラーレスポンスを返す
    pub fn error(message: impl Into<String>) -> UntypedResponse {
        UntypedResponse::error(message)
    }

    /// クエリをページ単位で実行し、要素を `T` に変換して返す
    ///
    /// 総件数が 0 の場合は「該当なし」の `Info` を付ける。
    pub async fn paginate<Q, S, T>(
        &self,
        query: &Q,
        request: &PaginationRequest,
    ) -> Result<ApiResponse<PaginationResult<T>>, ServiceError>
    where
        Q: PaginatedQuery<S> + ?Sized,
        S: 'static,
        T: 'static,
    {
        let pagination = query.paginate(request).await?;
        let args = self.args()?;
        let mapped = pagination.try_map_items(|item| args.mapper.map::<S, T>(item))?;

        if mapped.record_count == 0 {
            return Ok(ApiResponse::new(mapped)
                .with_message(args.localizer.get(keys::NO_RECORDS_FOUND))
                .with_message_type(MessageType::Info));
        }
        self.ok::<PaginationResult<T>, PaginationResult<T>>(mapped, None)
    }

    /// 操作種別に応じてエンティティをデータコンテキストに反映する
    pub async fn save_async<E, C>(
        &self,
        context: &mut C,
        operation: ApiOperationType,
        entities: impl IntoIterator<Item = E>,
        commit: bool,
    ) -> Result<(), ServiceError>
    where
        E: Send,
        C: DataContext<E> + ?Sized,
    {
        self.args()?;
        save_async(context, operation, entities, commit).await
    }

    /// 依存を解放する。2 回目以降は何もしない
    pub fn dispose(&mut self) {
        let Some(args) = self.args.take() else {
            return;
        };
        tracing::debug!(
            service = self.name,
            "{}",
            args.localizer.get_with(keys::DISPOSE_DISPOSING, &[&self.name])
        );
        self.stopwatch = Stopwatch::default();
    }
}

impl Drop for ApiService {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// ページネーション結果のレスポンスから先頭要素を取り出す
pub trait FirstOrDefault<T> {
    /// 総件数が 0 またはデータがなければ `None`
    fn first_or_default(&self) -> Option<&T>;
}

impl<T> FirstOrDefault<T> for ApiResponse<PaginationResult<T>> {
    fn first_or_default(&self) -> Option<&T> {
        self.data.as_ref().and_then(PaginationResult::first)
    }
}
