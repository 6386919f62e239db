//! # CORS
//!
//! 設定キー `Cors:PolicyName` / `Cors:Origins` から CORS ポリシーを読み取り、
//! プリフライト応答ミドルウェアと `CorsLayer` を構築する。
//!
//! | ポリシー | 許可するオリジン |
//! |----------|------------------|
//! | `Disabled`（既定） | なし。レイヤーを追加しない |
//! | `AllowSpecificOrigins` | `Cors:Origins` に列挙した URL |
//! | `AllowAnyOrigin` | リクエストのオリジンをそのまま返す |
//!
//! どちらのポリシーでも任意のメソッド・ヘッダーと資格情報を許可する。

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use strata_services::{ConfigError, ConfigSource};
use strum::{EnumString, IntoStaticStr};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use url::Url;

use crate::http_logger::{self, HttpLogRecord, RequestInfo};

pub const POLICY_NAME_KEY: &str = "Cors:PolicyName";
pub const ORIGINS_KEY: &str = "Cors:Origins";

/// プリフライト応答で許可するヘッダー
pub const PREFLIGHT_ALLOW_HEADERS: &str =
    "Origin, X-Requested-With, Content-Type, Accept, Authorization";

/// プリフライト応答で許可するメソッド
pub const PREFLIGHT_ALLOW_METHODS: &str = "DELETE, GET, OPTIONS, PATCH, POST, PUT";

/// CORS ポリシー
///
/// 設定ファイル上の名前はバリアント名と同じ（大文字小文字を区別する）。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, IntoStaticStr, EnumString, strum::Display,
)]
pub enum CorsPolicy {
    #[default]
    Disabled,
    AllowSpecificOrigins,
    AllowAnyOrigin,
}

impl CorsPolicy {
    pub fn is_enabled(&self) -> bool {
        *self != Self::Disabled
    }
}

/// CORS 設定
///
/// `AllowSpecificOrigins` のとき `origins` は空でなく、全要素が URL として正しい。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsConfig {
    pub policy:  CorsPolicy,
    pub origins: Vec<String>,
}

/// オリジンとして受け付ける URL か
fn is_valid_origin(origin: &str) -> bool {
    Url::parse(origin)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}

/// 設定から CORS 設定を読み取る
///
/// # Errors
///
/// - ポリシー名が未知: [`ConfigError::Invalid`]
/// - `AllowSpecificOrigins` でオリジンがない: [`ConfigError::Missing`]
/// - `AllowSpecificOrigins` で URL として不正なオリジンがある: [`ConfigError::Invalid`]（値全体を含む）
pub fn cors_config(config: &dyn ConfigSource) -> Result<CorsConfig, ConfigError> {
    let policy = match config.get_non_empty(POLICY_NAME_KEY) {
        Some(name) => name
            .parse::<CorsPolicy>()
            .map_err(|_| ConfigError::invalid(POLICY_NAME_KEY, name))?,
        None => CorsPolicy::Disabled,
    };

    let raw_origins = config.get(ORIGINS_KEY);
    let origins: Vec<String> = raw_origins
        .as_deref()
        .map(|value| value.split(',').map(|o| o.trim().to_string()).collect())
        .unwrap_or_default();

    if policy == CorsPolicy::AllowSpecificOrigins {
        let Some(raw) = raw_origins.filter(|v| !v.is_empty()) else {
            return Err(ConfigError::missing(ORIGINS_KEY));
        };
        if !origins.iter().all(|origin| is_valid_origin(origin)) {
            return Err(ConfigError::invalid(ORIGINS_KEY, raw));
        }
    }

    Ok(CorsConfig { policy, origins })
}

/// CORS 設定に応じた `CorsLayer` を構築する
///
/// `Disabled` のときは `None`。
pub fn cors_layer(config: &CorsConfig) -> Option<CorsLayer> {
    let allow_origin = match config.policy {
        CorsPolicy::Disabled => return None,
        CorsPolicy::AllowAnyOrigin => AllowOrigin::mirror_request(),
        CorsPolicy::AllowSpecificOrigins => AllowOrigin::list(
            config
                .origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o.trim_end_matches('/')).ok()),
        ),
    };

    Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true),
    )
}

/// OPTIONS リクエストに直接応答するミドルウェア
///
/// ポリシーが有効なとき、リクエストの `Origin` をそのまま許可オリジンとして返し、
/// 固定のヘッダー・メソッドを許可して 200 `OK` を返す。
/// それ以外のリクエストは次の処理へ渡す。
///
/// ```rust,ignore
/// router.layer(from_fn_with_state(cors.policy, cors_preflight))
/// ```
pub async fn cors_preflight(
    State(policy): State<CorsPolicy>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !policy.is_enabled() || request.method() != Method::OPTIONS {
        return next.run(request).await;
    }

    let info = RequestInfo::from_request(&request);
    http_logger::log_debug(
        Some(&info),
        &HttpLogRecord::new("Processing an OPTIONS request, adding response headers"),
    );

    let mut response = (StatusCode::OK, "OK").into_response();
    let headers = response.headers_mut();
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(PREFLIGHT_ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(PREFLIGHT_ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    response
}
