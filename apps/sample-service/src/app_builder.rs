//! # アプリケーション構築
//!
//! DI コンテナの構成とルーター構築を担当する。
//! `main.rs` は設定の読み込みとサーバー起動に集中する。
//!
//! ## ルート
//!
//! | メソッド | パス | 権限 |
//! |----------|------|------|
//! | GET | `/health` | - |
//! | GET | `/api/items` | - |
//! | POST | `/api/items` | `AddItem` |
//! | GET | `/api/items/page` | - |
//! | GET | `/api/items/{id}` | - |
//! | DELETE | `/api/items/{id}` | `DeleteItem` |

use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use sqlx::PgPool;
use strata_services::{
    ApiBuilder, BuilderError, ConfigError, ConfigSource, ServiceError, ServiceProvider,
    ServiceType,
};
use strata_shared::Localizer;
use strata_web::{PermissionState, UserDataState, WebPipeline, load_user_data, require_permission};
use utoipa::OpenApi;

use crate::{
    handler::{
        ItemState, create_item, delete_item, get_item, health_check, list_items, paginate_items,
    },
    item::{CreateItemRequest, Item, ItemDto, seed_items},
    openapi::ApiDoc,
    store::ItemStore,
    user_data::ConfigUserDataLoader,
};

/// サービス名（ログ・トレーシングに使う）
pub const SERVICE_NAME: &str = "strata-sample";

/// 起動時のエラー
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Builder(#[from] BuilderError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// 設定ストアから DI コンテナを構成する
///
/// 設定キー:
///
/// - `Strata:ResourcesPath`: ローカライズ用リソースのディレクトリ
/// - `Strata:LoggingTimestampFormat`: ログのタイムスタンプ書式
/// - `Strata:ConnectionStringKey`: 接続文字列名を値に持つ設定キー
///
/// 商品ストアは `ServiceEF` で接続プールがあれば PostgreSQL、それ以外はメモリを使う。
pub fn build_provider(
    settings: impl ConfigSource + 'static,
    locale: &str,
) -> Result<ServiceProvider, BuilderError> {
    let provider = ApiBuilder::new(SERVICE_NAME, settings)
        .with_locale(locale)
        .add_core_services(|config, api| {
            if let Some(path) = config.get_non_empty("Strata:ResourcesPath") {
                api.resources_path = path;
            }
            if let Some(format) = config.get_non_empty("Strata:LoggingTimestampFormat") {
                api.logging_timestamp_format = Some(format);
            }
            if let Some(key) = config.get_non_empty("Strata:ConnectionStringKey") {
                api.connection_string_key = Some(key);
            }
        })?
        .add_mapper(|mapper| {
            mapper.register_from::<Item, ItemDto>();
        })?
        .add_validators(|validators| {
            validators.register_derived::<CreateItemRequest>();
        })?
        .add_business_services(|service_type, services| {
            let store = match (service_type, services.get::<PgPool>()) {
                (ServiceType::Database, Some(pool)) => ItemStore::postgres(pool),
                (ServiceType::Mock, _) => ItemStore::in_memory(seed_items()),
                (service_type, _) => {
                    tracing::warn!(
                        service_type = %service_type,
                        "商品ストアの実装がないためメモリ上のストアで動作します"
                    );
                    ItemStore::in_memory(seed_items())
                }
            };
            services.add_singleton(store);
        })?
        .finish();

    Ok(provider)
}

/// DI コンテナと Web パイプラインからルーターを構築する
pub fn build_router(provider: ServiceProvider, pipeline: WebPipeline) -> Result<Router, ServiceError> {
    let localizer = provider.require::<Arc<dyn Localizer>>()?;
    let config = provider.require::<Arc<dyn ConfigSource>>()?;

    let user_data_state = UserDataState {
        loader: Arc::new(ConfigUserDataLoader::new(config)),
    };
    let add_item = PermissionState::new(Arc::clone(&localizer), ["AddItem"]);
    let delete_item_permission = PermissionState::new(localizer, ["DeleteItem"]);

    let routes = Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/items",
            get(list_items).merge(
                post(create_item).layer(from_fn_with_state(add_item, require_permission)),
            ),
        )
        .route("/api/items/page", get(paginate_items))
        .route(
            "/api/items/{id}",
            get(get_item).merge(
                delete(delete_item)
                    .layer(from_fn_with_state(delete_item_permission, require_permission)),
            ),
        )
        .layer(from_fn_with_state(user_data_state, load_user_data))
        .with_state(ItemState { provider });

    Ok(pipeline.apply(routes, ApiDoc::openapi()))
}

/// 設定ストアからアプリケーション全体を構築する
pub fn build_app(settings: Arc<dyn ConfigSource>, locale: &str) -> Result<Router, StartupError> {
    let provider = build_provider(Arc::clone(&settings), locale)?;
    let localizer = provider.require::<Arc<dyn Localizer>>()?;
    let pipeline = WebPipeline::from_config(settings.as_ref(), localizer)?;

    build_router(provider, pipeline).map_err(StartupError::from)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use strata_services::MemoryConfig;

    use super::*;

    #[tokio::test]
    async fn test_service_efで接続文字列があればpostgresのストアを使う() {
        let settings = MemoryConfig::new()
            .with("ServiceType", "ServiceEF")
            .with("SqlServerConnectionString", "ItemsDb")
            .with("ItemsDb", "postgres://localhost/items");

        let provider = build_provider(settings, "en").unwrap();

        assert!(provider.get::<PgPool>().is_some());
        assert!(provider.require::<ItemStore>().unwrap().is_postgres());
    }

    #[tokio::test]
    async fn test_service_mockではメモリのストアに初期データを入れる() {
        let settings = MemoryConfig::new().with("ServiceType", "ServiceMock");

        let provider = build_provider(settings, "en").unwrap();

        let store = provider.require::<ItemStore>().unwrap();
        assert!(!store.is_postgres());
        assert_eq!(store.all().await.unwrap().len(), 3);
    }
}
