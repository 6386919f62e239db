//! # Strata Web 層
//!
//! axum アプリケーションに横断的関心事を差し込むためのミドルウェア群。
//!
//! | モジュール | 役割 |
//! |------------|------|
//! | [`cors`] | CORS 設定の読み取り・プリフライト応答・`CorsLayer` 構築 |
//! | [`swagger`] | Swagger 設定の読み取り・OpenAPI ドキュメント配信 |
//! | [`exception`] | 未処理エラー・panic を 500 のエラーエンベロープに変換 |
//! | [`validation`] | リクエストボディの検証（失敗時は 200 のエラーエンベロープ） |
//! | [`permission`] | ユーザーデータの読み込みと権限チェック |
//! | [`http_logger`] | リクエスト情報付きの構造化ログ |
//! | [`request_log`] | リクエストの開始・終了ログ |
//! | [`pipeline`] | 上記を 1 つのルーターにまとめる |

pub mod cors;
pub mod exception;
pub mod http_logger;
pub mod permission;
pub mod pipeline;
pub mod request_id;
pub mod request_log;
pub mod swagger;
pub mod validation;

pub use cors::{CorsConfig, CorsPolicy, cors_config, cors_layer, cors_preflight};
pub use exception::{
    ApiError, ExceptionState, UnhandledException, catch_panic_layer, current_localizer,
    handle_exceptions,
};
pub use http_logger::{HttpLogRecord, RequestInfo};
pub use permission::{PermissionState, UserData, UserDataLoader, UserDataState, load_user_data, require_permission};
pub use pipeline::WebPipeline;
pub use request_log::RequestLogLayer;
pub use swagger::{AuthorizationHeader, SwaggerConfig, forward_x_authorization, swagger_config};
pub use validation::ValidatedJson;
