//! # Web パイプラインの統合テスト
//!
//! [`WebPipeline::apply`] で共通ミドルウェアを積んだルーターを、
//! 実際のリクエストで検証する。
//!
//! - Request ID の採番と伝播
//! - CORS プリフライト応答
//! - Swagger ドキュメントの配信と `X-Authorization` の追加
//! - 未処理エラー・panic のエラーエンベロープ化
//! - `X-Authorization` 転送 → ユーザーデータ読み込み → 権限チェック

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use http::{Method, Request, StatusCode, header};
use serde::Deserialize;
use serde_json::Value;
use strata_services::{MemoryConfig, ServiceError};
use strata_shared::{Localizer, ResourceCatalog};
use strata_web::{
    ApiError,
    PermissionState,
    UserData,
    UserDataLoader,
    UserDataState,
    ValidatedJson,
    WebPipeline,
    load_user_data,
    require_permission,
};
use tower::ServiceExt;
use utoipa::OpenApi;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
struct CreateNote {
    #[validate(length(min = 1, message = "Title is required"))]
    title: String,
}

/// ノート一覧
#[utoipa::path(get, path = "/notes", responses((status = 200, description = "ノート一覧")))]
async fn list_notes() -> &'static str {
    "notes"
}

/// ノート作成
#[utoipa::path(post, path = "/notes", responses((status = 200, description = "作成結果")))]
async fn create_note(ValidatedJson(payload): ValidatedJson<CreateNote>) -> String {
    payload.title
}

async fn failing() -> Result<&'static str, ApiError> {
    Err(ApiError::Internal("storage unavailable".to_string()))
}

async fn panicking() -> &'static str {
    panic!("unexpected state")
}

#[derive(OpenApi)]
#[openapi(paths(list_notes, create_note))]
struct TestApiDoc;

/// トークン `admin` のみ `AddNote` 権限を持つスタブ
struct StubUserDataLoader;

#[async_trait]
impl UserDataLoader for StubUserDataLoader {
    async fn load(&self, token: &str) -> Result<Option<UserData>, ServiceError> {
        Ok((token == "admin").then(|| UserData {
            user_id:     "1".to_string(),
            permissions: vec!["AddNote".to_string()],
        }))
    }
}

fn test_config() -> MemoryConfig {
    MemoryConfig::new()
        .with("Cors:PolicyName", "AllowSpecificOrigins")
        .with("Cors:Origins", "https://app.example.com")
        .with("Swagger:IsEnabled", "true")
        .with("Swagger:ApiVersion", "v1")
        .with("Swagger:ApiName", "Notes API")
        .with("Swagger:JsonEndpoint", "/swagger/v1/swagger.json")
        .with("SwaggerConfig:AddAuthorizationHeader", "true")
        .with("SwaggerConfig:BearerToken", "Bearer admin")
}

fn test_app() -> Router {
    let localizer: Arc<dyn Localizer> = Arc::new(ResourceCatalog::default());
    let pipeline = WebPipeline::from_config(&test_config(), localizer.clone()).unwrap();

    let routes = Router::new()
        .route(
            "/notes",
            get(list_notes).merge(post(create_note).layer(from_fn_with_state(
                PermissionState::new(localizer, ["AddNote"]),
                require_permission,
            ))),
        )
        .route("/failing", get(failing))
        .route("/panic", get(panicking))
        .layer(from_fn_with_state(
            UserDataState {
                loader: Arc::new(StubUserDataLoader),
            },
            load_user_data,
        ));

    pipeline.apply(routes, TestApiDoc::openapi())
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_note(title: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/notes")
        .header(header::CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder
        .body(Body::from(format!(r#"{{"title":"{title}"}}"#)))
        .unwrap()
}

#[tokio::test]
async fn test_レスポンスにuuid_v7のx_request_idが含まれる() {
    let response = test_app().oneshot(get_request("/notes")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let request_id = response.headers()["x-request-id"].to_str().unwrap();
    let uuid = uuid::Uuid::parse_str(request_id).unwrap();
    assert_eq!(uuid.get_version(), Some(uuid::Version::SortRand));
}

#[tokio::test]
async fn test_optionsリクエストにcorsヘッダー付きで200を返す() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/notes")
                .header(header::ORIGIN, "https://app.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://app.example.com"
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
        "DELETE, GET, OPTIONS, PATCH, POST, PUT"
    );
}

#[tokio::test]
async fn test_swaggerドキュメントに設定値とx_authorizationが反映される() {
    let response = test_app()
        .oneshot(get_request("/swagger/v1/swagger.json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["info"]["title"], "Notes API");
    assert_eq!(body["info"]["version"], "v1");
    let parameters = body["paths"]["/notes"]["get"]["parameters"]
        .as_array()
        .unwrap();
    assert_eq!(parameters[0]["name"], "X-Authorization");
    assert_eq!(parameters[0]["in"], "header");
}

#[tokio::test]
async fn test_未処理エラーは500の汎用エラーエンベロープになる() {
    let response = test_app().oneshot(get_request("/failing")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(
        body["Message"],
        "An unexpected error occurred, please try again later"
    );
    assert_eq!(body["MessageType"], "error");
    assert_eq!(body["Success"], false);
}

#[tokio::test]
async fn test_panicは500の汎用エラーエンベロープになる() {
    let response = test_app().oneshot(get_request("/panic")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["Success"], false);
}

#[tokio::test]
async fn test_x_authorizationで権限のあるユーザーとして作成できる() {
    let response = test_app()
        .oneshot(post_note("hello", &[("X-Authorization", "Bearer admin")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), b"hello");
}

#[tokio::test]
async fn test_権限のないユーザーは401を返す() {
    let response = test_app()
        .oneshot(post_note("hello", &[(header::AUTHORIZATION.as_str(), "Bearer guest")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["Message"],
        "You are not authorized to perform this operation"
    );
}

#[tokio::test]
async fn test_権限チェックを通過した後の検証エラーは200のエラーエンベロープになる() {
    let response = test_app()
        .oneshot(post_note("", &[("X-Authorization", "Bearer admin")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["Message"], "Title is required");
    assert_eq!(body["Success"], false);
}
