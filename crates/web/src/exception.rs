//! # 例外ハンドリング
//!
//! ハンドラーのエラーと panic を、統一されたエラーエンベロープに変換する。
//!
//! | 発生源 | ステータス | 本文 |
//! |--------|-----------|------|
//! | 検証失敗（[`ServiceError::Validation`]） | 200 | 検証メッセージ |
//! | その他の [`ApiError`] | 500 | 汎用エラーメッセージ |
//! | panic（[`catch_panic_layer`]） | 500 | 汎用エラーメッセージ |
//!
//! 500 の応答には [`UnhandledException`] が extensions として付く。
//! [`handle_exceptions`] ミドルウェアはこれを見つけると詳細をエラーログに出し、
//! 本文をローカライズ済みのメッセージに差し替える。
//!
//! [`handle_exceptions`] は注入されたローカライザを task-local に置く。
//! 内側の処理は [`current_localizer`] でそれを参照する。

use std::{any::Any, sync::Arc};

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use strata_services::{ConfigError, ServiceError};
use strata_shared::{Localizer, ResourceCatalog, UntypedResponse, resources::keys};
use tower_http::catch_panic::CatchPanicLayer;

use crate::http_logger::{self, HttpLogRecord, RequestInfo};

tokio::task_local! {
    static LOCALIZER: Arc<dyn Localizer>;
}

/// 現在のリクエストのローカライザを取得する
///
/// [`handle_exceptions`] のスコープ外では組み込みの英語テーブルを返す。
pub fn current_localizer() -> Arc<dyn Localizer> {
    LOCALIZER
        .try_with(Arc::clone)
        .unwrap_or_else(|_| Arc::new(ResourceCatalog::default()))
}

/// エラーエンベロープの応答を作成する
///
/// 本文は `{"Data":null,"Message":<message>,"MessageType":"error","Success":false}`。
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(UntypedResponse::error(message).into_typed::<()>())).into_response()
}

/// 未処理エラーの詳細
///
/// 500 応答の extensions に載せ、外側のミドルウェアへ伝える。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhandledException(pub String);

/// ハンドラーが返すエラー
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Service(e) if e.is_validation())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Service(ServiceError::Validation(message)) => {
                error_response(StatusCode::OK, message)
            }
            other => {
                let message = current_localizer().get(keys::GLOBAL_EXCEPTION_MSG);
                let mut response = error_response(StatusCode::INTERNAL_SERVER_ERROR, message);
                response
                    .extensions_mut()
                    .insert(UnhandledException(format!("{other}\n{other:?}")));
                response
            }
        }
    }
}

/// 例外ハンドリングミドルウェアの状態
#[derive(Clone)]
pub struct ExceptionState {
    pub localizer: Arc<dyn Localizer>,
}

/// 未処理エラーを記録し、ローカライズ済みのエラーエンベロープに差し替える
pub async fn handle_exceptions(
    State(state): State<ExceptionState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let info = RequestInfo::from_request(&request);
    let response = LOCALIZER
        .scope(Arc::clone(&state.localizer), next.run(request))
        .await;

    let Some(unhandled) = response.extensions().get::<UnhandledException>().cloned() else {
        return response;
    };

    http_logger::log_error(
        Some(&info),
        &HttpLogRecord::new(state.localizer.get(keys::INTERNAL_SERVER_ERROR))
            .with_correlation_id()
            .with_request_info()
            .with_unhandled_exception(true)
            .with_details(unhandled.0.replace('\n', "\n\t")),
    );

    let mut localized = error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        state.localizer.get(keys::GLOBAL_EXCEPTION_MSG),
    );
    localized.extensions_mut().insert(unhandled);
    localized
}

/// panic を 500 のエラーエンベロープに変換する
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "panic".to_string()
    };

    ApiError::Internal(format!("panic: {details}")).into_response()
}

type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response;

/// [`handle_panic`] を使う `CatchPanicLayer`
pub fn catch_panic_layer() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(handle_panic as PanicHandler)
}
