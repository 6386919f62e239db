//! # Strata サービス層
//!
//! 業務サービスを組み立てるための基盤を提供する。
//!
//! - [`ApiBuilder`]: 起動時に DI コンテナを段階的に構成する
//! - [`ApiService`]: 業務サービスの共通ヘルパー（レスポンス生成・検証・計測）
//! - [`ConfigSource`]: `Section:Key` 形式の設定ストア
//! - [`ObjectMapper`] / [`ValidatorRegistry`]: 型ごとの変換・検証の登録
//! - [`DataContext`]: 操作種別に応じた永続化（メモリ上 / PostgreSQL）

pub mod api_config;
pub mod builder;
mod collection;
pub mod config_source;
pub mod container;
pub mod data;
pub mod error;
pub mod mapper;
pub mod pg;
pub mod service;
pub mod service_type;
pub mod validation;

pub use api_config::ApiConfig;
pub use builder::{ApiBuilder, BuilderStep};
pub use config_source::{ConfigSource, EnvConfig, FileConfig, LayeredConfig, MemoryConfig};
pub use container::{ServiceCollection, ServiceProvider};
pub use data::{DataContext, Entity, InMemoryDataContext, PaginatedQuery, save_async};
pub use error::{BuilderError, ConfigError, ServiceError};
pub use mapper::ObjectMapper;
pub use pg::{PgDataContext, PgEntity, PgQuery, PgQueryAs};
pub use service::{ApiService, FirstOrDefault, RequestContext, ServiceArgs};
pub use service_type::{SERVICE_TYPE_KEY, ServiceType, service_type};
pub use validation::{PayloadValidator, ValidatorRegistry};
