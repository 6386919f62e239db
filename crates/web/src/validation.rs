//! # リクエストボディの検証
//!
//! [`ValidatedJson`] は JSON ボディをデシリアライズし、`validator::Validate` で検証する。
//! デシリアライズ・検証のどちらかに失敗した場合はハンドラーを実行せず、
//! 最初のエラーメッセージを載せたエラーエンベロープを HTTP 200 で返す。
//! 全エラーは警告ログに出力する。ログのメッセージは
//! [`current_localizer`] のロケールを使う。
//!
//! ```rust,ignore
//! async fn create_item(ValidatedJson(payload): ValidatedJson<CreateItem>) -> Json<...> {
//!     // payload は検証済み
//! }
//! ```

use axum::{
    Json,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use derive_more::Deref;
use serde::de::DeserializeOwned;
use strata_services::validation::validation_messages;
use strata_shared::resources::keys;
use validator::Validate;

use crate::{
    exception::{current_localizer, error_response},
    http_logger::{self, HttpLogRecord, RequestInfo},
};

/// 検証済みの JSON ボディ
#[derive(Debug, Clone, Copy, Default, Deref)]
pub struct ValidatedJson<T>(pub T);

/// [`ValidatedJson`] の拒否理由
#[derive(Debug)]
pub struct ModelStateRejection {
    request: RequestInfo,
    errors:  Vec<String>,
}

impl ModelStateRejection {
    /// 最初のエラーメッセージ
    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

impl IntoResponse for ModelStateRejection {
    fn into_response(self) -> Response {
        let details = serde_json::to_string(&self.errors).unwrap_or_default();
        http_logger::log_warn(
            Some(&self.request),
            &HttpLogRecord::new(current_localizer().get(keys::MODEL_STATE_INVALID))
                .with_correlation_id()
                .with_request_info()
                .with_details(details),
        );

        let message = self.errors.into_iter().next().unwrap_or_default();
        error_response(StatusCode::OK, message)
    }
}

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = ModelStateRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let request = RequestInfo::from_request(&req);

        let Json(payload) = match Json::<T>::from_request(req, state).await {
            Ok(json) => json,
            Err(rejection) => {
                return Err(ModelStateRejection {
                    request,
                    errors: vec![rejection.body_text()],
                });
            }
        };

        if let Err(errors) = payload.validate() {
            let mut messages = validation_messages(&errors);
            if messages.is_empty() {
                messages.push(errors.to_string());
            }
            return Err(ModelStateRejection {
                request,
                errors: messages,
            });
        }

        Ok(Self(payload))
    }
}

#[cfg(test)]
mod tests {
    use axum::{Router, body::Body, routing::post};
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::http_logger::test_support::setup_capture;

    #[derive(Debug, Deserialize, Validate)]
    struct CreateItem {
        #[validate(length(min = 1, message = "Name is required"))]
        name:  String,
        #[validate(range(min = 1, message = "Price must be positive"))]
        price: i64,
    }

    async fn create_item(ValidatedJson(payload): ValidatedJson<CreateItem>) -> String {
        format!("{}:{}", payload.name, payload.price)
    }

    fn create_test_app() -> Router {
        Router::new().route("/items", post(create_item))
    }

    fn post_json(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/items")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_検証を通過したボディはハンドラーに渡る() {
        let sut = create_test_app();

        let response = sut
            .oneshot(post_json(r#"{"name":"pen","price":120}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"pen:120".to_vec());
    }

    #[tokio::test]
    async fn test_検証エラーは最初のメッセージを200のエラーエンベロープで返す() {
        let sut = create_test_app();

        let response = sut
            .oneshot(post_json(r#"{"name":"","price":0}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(
            body,
            json!({
                "Data": null,
                "Message": "Name is required",
                "MessageType": "error",
                "Success": false
            })
        );
    }

    #[tokio::test]
    async fn test_不正なjsonもエラーエンベロープで返す() {
        let sut = create_test_app();

        let response = sut.oneshot(post_json(r#"{"name":"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["Success"], false);
        assert_eq!(body["MessageType"], "error");
        assert!(body["Message"].as_str().is_some_and(|m| !m.is_empty()));
    }

    #[tokio::test]
    async fn test_警告ログは注入されたロケールで出力する() {
        use std::sync::Arc;

        use axum::middleware::from_fn_with_state;
        use strata_shared::ResourceCatalog;

        use crate::exception::{ExceptionState, handle_exceptions};

        let (_guard, events) = setup_capture();
        let sut = create_test_app().layer(from_fn_with_state(
            ExceptionState {
                localizer: Arc::new(ResourceCatalog::new("ja")),
            },
            handle_exceptions,
        ));

        sut.oneshot(post_json(r#"{"name":"","price":0}"#))
            .await
            .unwrap();

        let captured = events.lock().unwrap();
        let warn = captured
            .iter()
            .find(|e| e.level == tracing::Level::WARN)
            .expect("警告ログが出力されること");
        assert_eq!(warn.message, "入力値が不正です");
    }

    #[test]
    fn test_検証済みボディは中身を参照できる() {
        let json = ValidatedJson(String::from("pen"));

        assert_eq!(json.len(), 3);
    }

    #[tokio::test]
    async fn test_検証エラーは全件を警告ログに出力する() {
        let (_guard, events) = setup_capture();
        let sut = create_test_app();

        sut.oneshot(post_json(r#"{"name":"","price":0}"#))
            .await
            .unwrap();

        let captured = events.lock().unwrap();
        let warn = captured
            .iter()
            .find(|e| e.level == tracing::Level::WARN)
            .expect("警告ログが出力されること");
        assert_eq!(warn.message, "ModelState is invalid");
        assert_eq!(
            warn.field("details"),
            Some(r#"["Name is required","Price must be positive"]"#)
        );
        assert_eq!(warn.field("http.path"), Some("/items"));
    }
}
