//! # Request ID の保持
//!
//! `SetRequestIdLayer` が採番した Request ID を task-local に保存し、
//! ハンドラーやサービスから相関 ID として参照できるようにする。
//!
//! ## 仕組み
//!
//! 1. [`store_request_id`] ミドルウェアがリクエスト extensions の
//!    [`RequestId`](tower_http::request_id::RequestId) を task-local に保存する
//! 2. [`current_request_id`] が task-local から Request ID を取得する
//!
//! HTTP ログの相関 ID と [`RequestContext`](strata_services::RequestContext) の
//! `request_id` はどちらもこの値を使う。

use axum::{
    body::Body,
    http::{Extensions, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use strata_shared::observability::REQUEST_ID_HEADER;
use tower_http::request_id::RequestId;

tokio::task_local! {
    static REQUEST_ID: String;
}

/// 現在のリクエストの Request ID を取得する
///
/// task-local スコープ外（テスト等）では `None` を返す。
pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(|id| id.clone()).ok()
}

/// リクエストから Request ID を読み取る
///
/// extensions の `RequestId` を優先し、なければ `X-Request-Id` ヘッダーを見る。
pub fn request_id_of<B>(request: &Request<B>) -> Option<String> {
    request_id_from(request.extensions(), request.headers())
}

pub(crate) fn request_id_from(extensions: &Extensions, headers: &HeaderMap) -> Option<String> {
    extensions
        .get::<RequestId>()
        .map(RequestId::header_value)
        .or_else(|| headers.get(REQUEST_ID_HEADER))
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Request ID を task-local に保存するミドルウェア
pub async fn store_request_id(request: Request<Body>, next: Next) -> Response {
    let request_id = request_id_of(&request).unwrap_or_else(|| "-".to_string());

    REQUEST_ID.scope(request_id, next.run(request)).await
}

#[cfg(test)]
mod tests {
    use axum::{Router, middleware::from_fn, routing::get};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;

    async fn echo_request_id() -> String {
        current_request_id().unwrap_or_default()
    }

    #[test]
    fn test_current_request_id_task_localスコープ外でnoneを返す() {
        assert_eq!(current_request_id(), None);
    }

    #[tokio::test]
    async fn test_store_request_id_ヘッダーの値をハンドラーから参照できる() {
        let sut = Router::new()
            .route("/test", get(echo_request_id))
            .layer(from_fn(store_request_id));

        let request = Request::builder()
            .uri("/test")
            .header(REQUEST_ID_HEADER, "req-123")
            .body(Body::empty())
            .unwrap();

        let response = sut.oneshot(request).await.unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        assert_eq!(body.as_ref(), b"req-123");
    }

    #[tokio::test]
    async fn test_store_request_id_ヘッダーがなければハイフンを保存する() {
        let sut = Router::new()
            .route("/test", get(echo_request_id))
            .layer(from_fn(store_request_id));

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = sut.oneshot(request).await.unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        assert_eq!(body.as_ref(), b"-");
    }
}
