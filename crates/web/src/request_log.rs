//! # リクエストログ
//!
//! リクエストの開始時に `"<path> Start"`、終了時に `"<path> End"` を INFO で出力する tower Layer。
//!
//! - 開始ログ: リクエスト情報（メソッド・パス・クエリ・オリジン・ユーザー）を添える
//! - 終了ログ: ステータスコードと未処理エラーの有無、レイテンシを添える
//!
//! 未処理エラーは 5xx 応答または [`UnhandledException`] の付いた応答を指す。
//! ヘルスチェックパスは出力対象外。
//!
//! ## レイヤー配置
//!
//! TraceLayer の内側に配置し、スパンフィールドを活用する:
//!
//! ```text
//! TraceLayer → handle_exceptions → RequestLogLayer → CatchPanicLayer → handler
//! ```

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use http::{Request, Response};
use tower::{Layer, Service};

use crate::{
    exception::UnhandledException,
    http_logger::{self, HttpLogRecord, RequestInfo},
};

/// ヘルスチェックパスかどうかを判定する
fn is_health_check_path(path: &str) -> bool {
    path.starts_with("/health")
}

/// リクエストログを出力する Layer
#[derive(Clone, Debug, Default)]
pub struct RequestLogLayer;

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogService { inner }
    }
}

/// [`RequestLogLayer`] が生成する Service 実装
#[derive(Clone, Debug)]
pub struct RequestLogService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestLogService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Display + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;
    type Response = S::Response;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // clone-swap パターン: poll_ready で得た readiness を保持する inner を使う
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if is_health_check_path(req.uri().path()) {
            return Box::pin(async move { inner.call(req).await });
        }

        let info = RequestInfo::from_request(&req);
        http_logger::log_info(
            Some(&info),
            &HttpLogRecord::new(format!("{} Start", info.path)).with_request_info(),
        );

        let start = Instant::now();

        Box::pin(async move {
            let result = inner.call(req).await;
            let latency_ms = start.elapsed().as_millis() as u64;
            let end = HttpLogRecord::new(format!("{} End", info.path))
                .with_details(format!("latency_ms={latency_ms}"));

            match &result {
                Ok(response) => {
                    let unhandled = response.status().is_server_error()
                        || response.extensions().get::<UnhandledException>().is_some();
                    http_logger::log_info(
                        Some(&info),
                        &end.with_response_status(response.status())
                            .with_unhandled_exception(unhandled),
                    );
                }
                Err(err) => {
                    http_logger::log_error(
                        Some(&info),
                        &end.with_unhandled_exception(true)
                            .with_details(format!("latency_ms={latency_ms} error={err}")),
                    );
                }
            }

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::http_logger::test_support::setup_capture;

    // テスト用のダミー Service
    #[derive(Clone)]
    struct DummyService {
        status:    http::StatusCode,
        unhandled: bool,
    }

    impl Service<Request<()>> for DummyService {
        type Error = Infallible;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;
        type Response = Response<()>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: Request<()>) -> Self::Future {
            let status = self.status;
            let unhandled = self.unhandled;
            Box::pin(async move {
                let mut response = Response::builder().status(status).body(()).unwrap();
                if unhandled {
                    response
                        .extensions_mut()
                        .insert(UnhandledException("boom".to_string()));
                }
                Ok(response)
            })
        }
    }

    // テスト用のエラーを返す Service
    #[derive(Clone)]
    struct ErrorService;

    impl Service<Request<()>> for ErrorService {
        type Error = String;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;
        type Response = Response<()>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: Request<()>) -> Self::Future {
            Box::pin(async { Err("internal service error".to_string()) })
        }
    }

    fn build_request(path: &str) -> Request<()> {
        Request::builder().uri(path).body(()).unwrap()
    }

    fn ok_service() -> DummyService {
        DummyService {
            status:    http::StatusCode::OK,
            unhandled: false,
        }
    }

    #[test]
    fn test_is_health_check_path_healthでtrueを返す() {
        assert!(is_health_check_path("/health"));
        assert!(!is_health_check_path("/api/items"));
    }

    #[tokio::test]
    async fn test_開始と終了のログがinfoレベルで出力される() {
        let (_guard, events) = setup_capture();

        let mut sut = RequestLogLayer.layer(ok_service());

        let response = sut.call(build_request("/api/items")).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);

        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0].level, tracing::Level::INFO);
        assert_eq!(captured[0].message, "/api/items Start");
        assert_eq!(captured[0].field("http.method"), Some("GET"));
        assert_eq!(captured[1].level, tracing::Level::INFO);
        assert_eq!(captured[1].message, "/api/items End");
        assert_eq!(captured[1].field("http.status_code"), Some("200"));
        assert_eq!(captured[1].field("unhandled_exception"), Some("false"));
    }

    #[tokio::test]
    async fn test_未処理エラーの応答はunhandled_exceptionがtrueになる() {
        let (_guard, events) = setup_capture();

        let mut sut = RequestLogLayer.layer(DummyService {
            status:    http::StatusCode::INTERNAL_SERVER_ERROR,
            unhandled: true,
        });

        sut.call(build_request("/api/items")).await.unwrap();

        let captured = events.lock().unwrap();
        assert_eq!(captured[1].field("unhandled_exception"), Some("true"));
        assert_eq!(captured[1].field("http.status_code"), Some("500"));
    }

    #[tokio::test]
    async fn test_healthパスではログが出力されない() {
        let (_guard, events) = setup_capture();

        let mut sut = RequestLogLayer.layer(ok_service());

        sut.call(build_request("/health")).await.unwrap();

        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_serviceエラー時にerrorレベルで出力される() {
        let (_guard, events) = setup_capture();

        let mut sut = RequestLogLayer.layer(ErrorService);

        let result = sut.call(build_request("/api/items")).await;
        assert!(result.is_err());

        let captured = events.lock().unwrap();
        assert_eq!(captured[1].level, tracing::Level::ERROR);
        assert!(
            captured[1]
                .field("details")
                .is_some_and(|d| d.contains("internal service error"))
        );
    }
}
