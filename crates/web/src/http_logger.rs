//! # HTTP コンテキストロガー
//!
//! リクエストの情報を構造化フィールドとして添えてログを出力する。
//!
//! ## 出力フィールド
//!
//! | フィールド | 条件 |
//! |------------|------|
//! | `request_id` | `include_correlation_id` |
//! | `http.method`, `http.path`, `http.scheme`, `http.query`, `http.origin`, `user.id` | `include_request_info` |
//! | `http.status_code` | `include_response_info`（未処理エラー時は常に 500） |
//! | `unhandled_exception` | 常に出力 |
//! | `details` | 詳細が設定されているとき |
//!
//! 値がないフィールドは出力しない。ログ出力は失敗しない。

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use http::{Extensions, HeaderMap, Method, Request, StatusCode, Uri, header, request::Parts};
use strata_services::RequestContext;
use tracing::Level;

use crate::{
    permission::UserData,
    request_id::{current_request_id, request_id_from, request_id_of},
};

/// ログに添えるリクエスト情報
///
/// リクエスト本体はハンドラーに渡ってしまうため、必要な値だけ先に写し取っておく。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    pub request_id: Option<String>,
    pub method:     String,
    pub path:       String,
    pub scheme:     Option<String>,
    pub query:      Option<String>,
    pub origin:     Option<String>,
    pub user_id:    Option<String>,
}

impl RequestInfo {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self::collect(
            request.method(),
            request.uri(),
            request.headers(),
            request.extensions(),
        )
        .with_request_id(request_id_of(request))
    }

    fn collect(method: &Method, uri: &Uri, headers: &HeaderMap, extensions: &Extensions) -> Self {
        Self {
            request_id: current_request_id(),
            method:     method.to_string(),
            path:       uri.path().to_string(),
            scheme:     uri.scheme_str().map(str::to_string),
            query:      uri.query().map(str::to_string),
            origin:     headers
                .get(header::ORIGIN)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            user_id:    extensions
                .get::<UserData>()
                .map(|user| user.user_id.clone()),
        }
    }

    /// リクエスト自身が持つ ID を task-local の値より優先する
    fn with_request_id(mut self, request_id: Option<String>) -> Self {
        if request_id.is_some() {
            self.request_id = request_id;
        }
        self
    }

    /// サービス層に渡すリクエストコンテキストに変換する
    pub fn to_context(&self) -> RequestContext {
        RequestContext {
            request_id: self.request_id.clone(),
            method:     Some(self.method.clone()),
            path:       Some(self.path.clone()),
            user_id:    self.user_id.clone(),
        }
    }
}

/// ハンドラーでリクエスト情報を受け取るための抽出
impl<S: Send + Sync> FromRequestParts<S> for RequestInfo {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = request_id_from(&parts.extensions, &parts.headers);

        Ok(
            Self::collect(&parts.method, &parts.uri, &parts.headers, &parts.extensions)
                .with_request_id(request_id),
        )
    }
}

/// 1 件のログの内容と、添える情報の選択
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpLogRecord {
    pub message:                String,
    pub include_correlation_id: bool,
    pub include_request_info:   bool,
    pub include_response_info:  bool,
    pub is_unhandled_exception: bool,
    pub status:                 Option<StatusCode>,
    pub details:                Option<String>,
}

impl HttpLogRecord {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_correlation_id(mut self) -> Self {
        self.include_correlation_id = true;
        self
    }

    pub fn with_request_info(mut self) -> Self {
        self.include_request_info = true;
        self
    }

    /// レスポンスのステータスコードを添える
    pub fn with_response_status(mut self, status: StatusCode) -> Self {
        self.include_response_info = true;
        self.status = Some(status);
        self
    }

    pub fn with_unhandled_exception(mut self, unhandled: bool) -> Self {
        self.is_unhandled_exception = unhandled;
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// 出力するステータスコード
    ///
    /// 未処理エラーは応答内容によらず 500 として記録する。
    fn status_code(&self) -> Option<u16> {
        if self.is_unhandled_exception {
            Some(StatusCode::INTERNAL_SERVER_ERROR.as_u16())
        } else if self.include_response_info {
            self.status.map(|s| s.as_u16())
        } else {
            None
        }
    }
}

macro_rules! http_event {
    ($level:expr, $request:expr, $record:expr) => {{
        let request: Option<&RequestInfo> = $request;
        let record: &HttpLogRecord = $record;
        let info = request.filter(|_| record.include_request_info);
        let request_id = if record.include_correlation_id {
            request
                .and_then(|r| r.request_id.clone())
                .or_else(current_request_id)
        } else {
            None
        };
        tracing::event!(
            $level,
            request_id = request_id.as_deref(),
            http.method = info.map(|r| r.method.as_str()),
            http.path = info.map(|r| r.path.as_str()),
            http.scheme = info.and_then(|r| r.scheme.as_deref()),
            http.query = info.and_then(|r| r.query.as_deref()),
            http.origin = info.and_then(|r| r.origin.as_deref()),
            user.id = info.and_then(|r| r.user_id.as_deref()),
            http.status_code = record.status_code(),
            unhandled_exception = record.is_unhandled_exception,
            details = record.details.as_deref(),
            "{}",
            record.message
        );
    }};
}

/// 指定レベルでログを出力する
pub fn log(level: Level, request: Option<&RequestInfo>, record: &HttpLogRecord) {
    match level {
        Level::TRACE => http_event!(Level::TRACE, request, record),
        Level::DEBUG => http_event!(Level::DEBUG, request, record),
        Level::INFO => http_event!(Level::INFO, request, record),
        Level::WARN => http_event!(Level::WARN, request, record),
        _ => http_event!(Level::ERROR, request, record),
    }
}

pub fn log_debug(request: Option<&RequestInfo>, record: &HttpLogRecord) {
    log(Level::DEBUG, request, record);
}

pub fn log_info(request: Option<&RequestInfo>, record: &HttpLogRecord) {
    log(Level::INFO, request, record);
}

pub fn log_warn(request: Option<&RequestInfo>, record: &HttpLogRecord) {
    log(Level::WARN, request, record);
}

pub fn log_error(request: Option<&RequestInfo>, record: &HttpLogRecord) {
    log(Level::ERROR, request, record);
}


#[cfg(test)]
mod tests {
    use axum::body::Body;
    use pretty_assertions::assert_eq;

    use super::{test_support::setup_capture, *};

    fn request_info() -> RequestInfo {
        let mut request = Request::builder()
            .method("POST")
            .uri("http://localhost/api/items?page=2")
            .header("x-request-id", "req-1")
            .header(header::ORIGIN, "https://app.example.com")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(UserData {
            user_id:     "42".to_string(),
            permissions: vec![],
        });
        RequestInfo::from_request(&request)
    }

    #[test]
    fn test_from_requestでリクエスト情報を写し取る() {
        let info = request_info();

        assert_eq!(
            info,
            RequestInfo {
                request_id: Some("req-1".to_string()),
                method:     "POST".to_string(),
                path:       "/api/items".to_string(),
                scheme:     Some("http".to_string()),
                query:      Some("page=2".to_string()),
                origin:     Some("https://app.example.com".to_string()),
                user_id:    Some("42".to_string()),
            }
        );
    }

    #[test]
    fn test_to_contextでリクエストコンテキストに変換する() {
        let context = request_info().to_context();

        assert_eq!(context.request_id.as_deref(), Some("req-1"));
        assert_eq!(context.path.as_deref(), Some("/api/items"));
        assert_eq!(context.user_id.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_ハンドラーの引数としてリクエスト情報を受け取れる() {
        let (mut parts, _) = Request::builder()
            .method("DELETE")
            .uri("/api/items/3")
            .header("x-request-id", "req-9")
            .body(())
            .unwrap()
            .into_parts();

        let info = RequestInfo::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(info.request_id.as_deref(), Some("req-9"));
        assert_eq!(info.method, "DELETE");
        assert_eq!(info.path, "/api/items/3");
        assert_eq!(info.user_id, None);
    }

    #[test]
    fn test_リクエスト情報を含めない場合はメッセージのみ出力する() {
        let (_guard, events) = setup_capture();

        log_info(Some(&request_info()), &HttpLogRecord::new("hello"));

        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].level, Level::INFO);
        assert_eq!(captured[0].message, "hello");
        assert_eq!(captured[0].field("http.path"), None);
        assert_eq!(captured[0].field("request_id"), None);
    }

    #[test]
    fn test_相関idとリクエスト情報を含めて出力する() {
        let (_guard, events) = setup_capture();

        log_warn(
            Some(&request_info()),
            &HttpLogRecord::new("ModelState is invalid")
                .with_correlation_id()
                .with_request_info()
                .with_details("name: required"),
        );

        let captured = events.lock().unwrap();
        assert_eq!(captured[0].level, Level::WARN);
        assert_eq!(captured[0].field("request_id"), Some("req-1"));
        assert_eq!(captured[0].field("http.method"), Some("POST"));
        assert_eq!(captured[0].field("http.path"), Some("/api/items"));
        assert_eq!(captured[0].field("user.id"), Some("42"));
        assert_eq!(captured[0].field("details"), Some("name: required"));
    }

    #[test]
    fn test_未処理エラーはステータス500として記録する() {
        let record = HttpLogRecord::new("x")
            .with_response_status(StatusCode::OK)
            .with_unhandled_exception(true);

        assert_eq!(record.status_code(), Some(500));
    }

    #[test]
    fn test_レスポンス情報を含めない場合はステータスを記録しない() {
        let record = HttpLogRecord {
            status: Some(StatusCode::OK),
            ..HttpLogRecord::new("x")
        };

        assert_eq!(record.status_code(), None);
    }

    #[test]
    fn test_リクエスト情報がなくても出力できる() {
        let (_guard, events) = setup_capture();

        log_error(None, &HttpLogRecord::new("boom").with_request_info());

        let captured = events.lock().unwrap();
        assert_eq!(captured[0].level, Level::ERROR);
        assert_eq!(captured[0].message, "boom");
    }
}
