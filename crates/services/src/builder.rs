//! # API ビルダー
//!
//! 起動時に DI コンテナを段階的に構成する。
//!
//! ## ステップ
//!
//! ```text
//! add_localization → set_configuration → add_logging → check_sql_server
//!     → add_mapper → add_validators → add_business_services
//! ```
//!
//! 各ステップは 1 つのビルダーにつき 1 回だけ実行できる。実行済みの
//! ステップを記録する台帳を持ち、2 回目の呼び出しは
//! [`BuilderError::AlreadyInvoked`] になる。
//!
//! `add_localization` で登録したローカライザは、`set_configuration` で
//! `resources_path` が変わった場合に読み込み直す。
//!
//! `check_sql_server` は接続文字列キーが未設定の場合、またはサービス種別が
//! [`ServiceType::Database`] でない場合は何もせず、台帳にも記録しない。
//!
//! ## 使用例
//!
//! ```no_run
//! use strata_services::{ApiBuilder, MemoryConfig};
//!
//! # fn main() -> Result<(), strata_services::BuilderError> {
//! let config = MemoryConfig::new().with("ServiceType", "ServiceMock");
//! let provider = ApiBuilder::new("sample", config)
//!     .add_core_services(|_, api| api.connection_string_key = None)?
//!     .add_mapper(|_| {})?
//!     .add_validators(|_| {})?
//!     .add_business_services(|_, _| {})?
//!     .finish();
//! # let _ = provider;
//! # Ok(())
//! # }
//! ```

use std::{fmt, sync::Arc};

use sqlx::{PgPool, postgres::PgPoolOptions};
use strata_shared::{
    Localizer, ResourceCatalog,
    observability::{TracingConfig, try_init_tracing},
    resources::DEFAULT_LOCALE,
};
use strum::IntoStaticStr;

use crate::{
    api_config::ApiConfig,
    config_source::{ConfigSource, EnvConfig},
    container::{ServiceCollection, ServiceProvider},
    error::{BuilderError, ConfigError},
    mapper::ObjectMapper,
    service_type::{ServiceType, service_type},
    validation::ValidatorRegistry,
};

/// ビルダーのステップ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, strum::Display)]
pub enum BuilderStep {
    AddLocalization,
    SetConfiguration,
    AddLogging,
    CheckSqlServer,
    AddMapper,
    AddValidators,
    AddBusinessServices,
}

/// DI コンテナを段階的に構成するビルダー
pub struct ApiBuilder {
    service_name: String,
    services:     ServiceCollection,
    config:       Arc<dyn ConfigSource>,
    environment:  Arc<dyn ConfigSource>,
    api_config:   ApiConfig,
    locale:       String,
    invoked:      Vec<BuilderStep>,
}

impl fmt::Debug for ApiBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiBuilder")
            .field("service_name", &self.service_name)
            .field("api_config", &self.api_config)
            .field("locale", &self.locale)
            .field("invoked", &self.invoked)
            .finish_non_exhaustive()
    }
}

impl ApiBuilder {
    /// 新しいビルダーを作成する
    ///
    /// 接続文字列の間接参照には環境変数（[`EnvConfig`]）を使う。
    pub fn new(service_name: impl Into<String>, config: impl ConfigSource + 'static) -> Self {
        let config: Arc<dyn ConfigSource> = Arc::new(config);
        let mut services = ServiceCollection::new();
        services.add_singleton(Arc::clone(&config));

        Self {
            service_name: service_name.into(),
            services,
            config,
            environment: Arc::new(EnvConfig::new()),
            api_config: ApiConfig::default(),
            locale: DEFAULT_LOCALE.to_string(),
            invoked: Vec::new(),
        }
    }

    /// 接続文字列の間接参照に使う環境を差し替える
    pub fn with_environment(mut self, environment: impl ConfigSource + 'static) -> Self {
        self.environment = Arc::new(environment);
        self
    }

    /// ローカライズに使うロケールを指定する（既定は `en`）
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// 設定からサービス種別を読み取る
    pub fn service_type(&self) -> Result<ServiceType, ConfigError> {
        service_type(self.config.as_ref())
    }

    pub fn api_config(&self) -> &ApiConfig {
        &self.api_config
    }

    pub fn services(&self) -> &ServiceCollection {
        &self.services
    }

    /// ステップが実行済みか
    pub fn is_invoked(&self, step: BuilderStep) -> bool {
        self.invoked.contains(&step)
    }

    /// 実行済みのステップ（実行順）
    pub fn invoked_steps(&self) -> &[BuilderStep] {
        &self.invoked
    }

    fn ensure_not_invoked(&self, step: BuilderStep) -> Result<(), BuilderError> {
        if self.is_invoked(step) {
            return Err(BuilderError::AlreadyInvoked(step));
        }
        Ok(())
    }

    fn complete(mut self, step: BuilderStep) -> Self {
        tracing::debug!(step = %step, "ビルダーステップ完了");
        self.invoked.push(step);
        self
    }

    /// 文字列リソースを登録する
    ///
    /// `<resources_path>/<locale>.json` があれば組み込みテーブルに重ねる。
    pub fn add_localization(mut self) -> Result<Self, BuilderError> {
        self.ensure_not_invoked(BuilderStep::AddLocalization)?;

        self.register_localizer()?;

        Ok(self.complete(BuilderStep::AddLocalization))
    }

    fn register_localizer(&mut self) -> Result<(), BuilderError> {
        let catalog = ResourceCatalog::load(&self.api_config.resources_path, &self.locale)?;
        let localizer: Arc<dyn Localizer> = Arc::new(catalog);
        self.services.add_singleton(localizer);
        Ok(())
    }

    /// 設定ストアの値で [`ApiConfig`] を上書きする
    ///
    /// ローカライズ登録済みで `resources_path` が変わった場合は読み込み直す。
    pub fn set_configuration(
        mut self,
        configure: impl FnOnce(&dyn ConfigSource, &mut ApiConfig),
    ) -> Result<Self, BuilderError> {
        self.ensure_not_invoked(BuilderStep::SetConfiguration)?;

        let resources_path = self.api_config.resources_path.clone();
        configure(self.config.as_ref(), &mut self.api_config);

        if self.is_invoked(BuilderStep::AddLocalization)
            && self.api_config.resources_path != resources_path
        {
            self.register_localizer()?;
        }

        Ok(self.complete(BuilderStep::SetConfiguration))
    }

    /// トレーシングを初期化する
    ///
    /// グローバルサブスクライバーが設定済みの場合は何もしない。
    pub fn add_logging(self) -> Result<Self, BuilderError> {
        self.ensure_not_invoked(BuilderStep::AddLogging)?;

        let mut tracing_config = TracingConfig::from_env(self.service_name.clone());
        tracing_config.timestamp_format = self.api_config.logging_timestamp_format.clone();

        if !try_init_tracing(&tracing_config) {
            tracing::debug!("トレーシングは初期化済みのため再設定しません");
        }

        Ok(self.complete(BuilderStep::AddLogging))
    }

    /// データベース接続プールを登録する
    ///
    /// 接続文字列キーの値を接続文字列名として読み、その名前で環境・設定の
    /// 順に接続文字列を探す。プールは最初の使用時に接続する。
    ///
    /// # Errors
    ///
    /// - サービス種別の読み取りに失敗: [`BuilderError::Config`]
    /// - 接続文字列が見つからない: [`ConfigError::ConnectionStringNotFound`]
    /// - 接続文字列が不正: [`BuilderError::Database`]
    pub fn check_sql_server(mut self) -> Result<Self, BuilderError> {
        self.ensure_not_invoked(BuilderStep::CheckSqlServer)?;

        let Some(key) = self.api_config.connection_string_key.clone() else {
            return Ok(self);
        };
        if self.service_type()? != ServiceType::Database {
            return Ok(self);
        }

        if let Some(name) = self.config.get(&key) {
            let connection_string = self
                .environment
                .get_non_empty(&name)
                .or_else(|| self.config.get_non_empty(&name))
                .ok_or_else(|| ConfigError::ConnectionStringNotFound { name: name.clone() })?;

            let pool = PgPoolOptions::new().connect_lazy(&connection_string)?;
            self.services.add_singleton(pool);
            tracing::info!(connection_string_name = %name, "データベース接続プールを登録しました");
        }

        Ok(self.complete(BuilderStep::CheckSqlServer))
    }

    /// オブジェクトマッパーを構成して登録する
    pub fn add_mapper(
        mut self,
        configure: impl FnOnce(&mut ObjectMapper),
    ) -> Result<Self, BuilderError> {
        self.ensure_not_invoked(BuilderStep::AddMapper)?;

        let mut mapper = ObjectMapper::new();
        configure(&mut mapper);
        self.services.add_singleton(Arc::new(mapper));

        Ok(self.complete(BuilderStep::AddMapper))
    }

    /// ペイロードバリデータを構成して登録する
    pub fn add_validators(
        mut self,
        configure: impl FnOnce(&mut ValidatorRegistry),
    ) -> Result<Self, BuilderError> {
        self.ensure_not_invoked(BuilderStep::AddValidators)?;

        let mut registry = ValidatorRegistry::new();
        configure(&mut registry);
        self.services.add_singleton(Arc::new(registry));

        Ok(self.complete(BuilderStep::AddValidators))
    }

    /// 業務サービスを登録する
    ///
    /// サービス種別を登録してから `configure` を呼ぶ。
    /// [`ServiceType::Database`] の場合、`check_sql_server` で登録した
    /// 接続プールは `configure` の中で [`ServiceCollection::get`] から、
    /// リクエスト時には [`ServiceArgs::pool`](crate::ServiceArgs::pool) から参照できる。
    pub fn add_business_services(
        mut self,
        configure: impl FnOnce(ServiceType, &mut ServiceCollection),
    ) -> Result<Self, BuilderError> {
        self.ensure_not_invoked(BuilderStep::AddBusinessServices)?;

        let service_type = self.service_type()?;
        if service_type == ServiceType::Database && !self.services.contains::<PgPool>() {
            tracing::warn!("データベース種別ですが接続プールが登録されていません");
        }
        self.services.add_singleton(service_type);
        configure(service_type, &mut self.services);

        Ok(self.complete(BuilderStep::AddBusinessServices))
    }

    /// ローカライズ・設定・ログ・データベースをまとめて構成する
    pub fn add_core_services(
        self,
        configure: impl FnOnce(&dyn ConfigSource, &mut ApiConfig),
    ) -> Result<Self, BuilderError> {
        self.add_localization()?
            .set_configuration(configure)?
            .add_logging()?
            .check_sql_server()
    }

    /// データベースを使わない構成（`check_sql_server` を実行しない）
    pub fn add_core_services_without_database(
        self,
        configure: impl FnOnce(&dyn ConfigSource, &mut ApiConfig),
    ) -> Result<Self, BuilderError> {
        self.add_localization()?
            .set_configuration(configure)?
            .add_logging()
    }

    /// 構成を確定してプロバイダを返す
    pub fn finish(mut self) -> ServiceProvider {
        self.services.add_singleton(self.api_config.clone());
        tracing::debug!(
            steps = ?self.invoked,
            registered = self.services.registered().len(),
            "サービスコンテナを構築しました"
        );
        self.services.build()
    }
}
