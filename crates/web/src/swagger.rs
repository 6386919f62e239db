//! # Swagger
//!
//! 設定キー `Swagger:*` から OpenAPI ドキュメントの配信設定を読み取る。
//! 有効なときは `Swagger:JsonEndpoint` で JSON を返すルートを追加する。
//!
//! `SwaggerConfig:AddAuthorizationHeader` が `true` のときは、全オペレーションに
//! 任意の `X-Authorization` ヘッダーパラメータを追加し、
//! [`forward_x_authorization`] でその値を `Authorization` に写す。
//! ドキュメント画面から `Authorization` を直接送れない場合の迂回路になる。

use axum::{
    Json,
    Router,
    body::Body,
    http::{HeaderName, Request, header},
    middleware::Next,
    response::Response,
    routing::get,
};
use strata_services::{ConfigError, ConfigSource};
use utoipa::{
    Modify,
    openapi::{
        OpenApi,
        RefOr,
        Required,
        Schema,
        path::{Parameter, ParameterBuilder, ParameterIn},
        schema::{ObjectBuilder, Type},
    },
};

pub const IS_ENABLED_KEY: &str = "Swagger:IsEnabled";
pub const API_VERSION_KEY: &str = "Swagger:ApiVersion";
pub const API_NAME_KEY: &str = "Swagger:ApiName";
pub const JSON_ENDPOINT_KEY: &str = "Swagger:JsonEndpoint";
pub const ADD_AUTHORIZATION_HEADER_KEY: &str = "SwaggerConfig:AddAuthorizationHeader";
pub const BEARER_TOKEN_KEY: &str = "SwaggerConfig:BearerToken";

/// ドキュメント画面から送る認可ヘッダー
pub static X_AUTHORIZATION: HeaderName = HeaderName::from_static("x-authorization");

/// Swagger 設定
///
/// `is_enabled` のとき、3 つの文字列はすべて空でない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwaggerConfig {
    pub is_enabled:    bool,
    pub api_version:   Option<String>,
    pub api_name:      Option<String>,
    pub json_endpoint: Option<String>,
}

/// 真偽値リテラルとして解釈する（前後の空白と大文字小文字は無視する）
fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// 設定から Swagger 設定を読み取る
///
/// # Errors
///
/// - `Swagger:IsEnabled` が空でなく真偽値でない: [`ConfigError::Invalid`]
/// - 有効なのに `ApiVersion` / `ApiName` / `JsonEndpoint` のいずれかが空: 該当キーの [`ConfigError::Missing`]
pub fn swagger_config(config: &dyn ConfigSource) -> Result<SwaggerConfig, ConfigError> {
    let is_enabled = match config.get_non_empty(IS_ENABLED_KEY) {
        Some(value) => {
            parse_bool(&value).ok_or_else(|| ConfigError::invalid(IS_ENABLED_KEY, value))?
        }
        None => false,
    };

    let swagger = SwaggerConfig {
        is_enabled,
        api_version: config.get_non_empty(API_VERSION_KEY),
        api_name: config.get_non_empty(API_NAME_KEY),
        json_endpoint: config.get_non_empty(JSON_ENDPOINT_KEY),
    };

    if swagger.is_enabled {
        for (key, value) in [
            (API_VERSION_KEY, &swagger.api_version),
            (API_NAME_KEY, &swagger.api_name),
            (JSON_ENDPOINT_KEY, &swagger.json_endpoint),
        ] {
            if value.is_none() {
                return Err(ConfigError::missing(key));
            }
        }
    }

    Ok(swagger)
}

impl SwaggerConfig {
    /// タイトルとバージョンを設定に合わせた OpenAPI ドキュメントを返す
    pub fn document(&self, mut openapi: OpenApi) -> OpenApi {
        if let Some(name) = &self.api_name {
            openapi.info.title = name.clone();
        }
        if let Some(version) = &self.api_version {
            openapi.info.version = version.clone();
        }
        openapi
    }

    /// OpenAPI ドキュメントを配信するルーター
    ///
    /// 無効なときは何もルートを持たない。
    pub fn router<S>(&self, openapi: OpenApi) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let (true, Some(endpoint)) = (self.is_enabled, self.json_endpoint.as_deref()) else {
            return Router::new();
        };

        let endpoint = if endpoint.starts_with('/') {
            endpoint.to_string()
        } else {
            format!("/{endpoint}")
        };
        let document = self.document(openapi);
        Router::new().route(
            &endpoint,
            get(move || {
                let document = document.clone();
                async move { Json(document) }
            }),
        )
    }
}

/// 全オペレーションに `X-Authorization` ヘッダーパラメータを追加する
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationHeader {
    /// ドキュメント上の例に載せるトークン
    pub bearer_token: Option<String>,
}

impl AuthorizationHeader {
    /// `SwaggerConfig:AddAuthorizationHeader` が `true` のときだけ返す
    pub fn from_config(config: &dyn ConfigSource) -> Option<Self> {
        let enabled = config
            .get(ADD_AUTHORIZATION_HEADER_KEY)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        enabled.then(|| Self {
            bearer_token: config.get(BEARER_TOKEN_KEY),
        })
    }

    fn parameter(&self) -> Parameter {
        ParameterBuilder::new()
            .name("X-Authorization")
            .parameter_in(ParameterIn::Header)
            .required(Required::False)
            .schema(Some(RefOr::T(Schema::Object(
                ObjectBuilder::new().schema_type(Type::String).build(),
            ))))
            .example(self.bearer_token.clone().map(serde_json::Value::String))
            .build()
    }
}

impl Modify for AuthorizationHeader {
    fn modify(&self, openapi: &mut OpenApi) {
        let parameter = self.parameter();
        for item in openapi.paths.paths.values_mut() {
            let operations = [
                &mut item.get,
                &mut item.put,
                &mut item.post,
                &mut item.delete,
                &mut item.options,
                &mut item.head,
                &mut item.patch,
                &mut item.trace,
            ];
            for operation in operations.into_iter().flatten() {
                operation
                    .parameters
                    .get_or_insert_with(Vec::new)
                    .push(parameter.clone());
            }
        }
    }
}

/// `X-Authorization` ヘッダーの値を `Authorization` ヘッダーに写すミドルウェア
pub async fn forward_x_authorization(mut request: Request<Body>, next: Next) -> Response {
    if let Some(value) = request.headers().get(&X_AUTHORIZATION).cloned() {
        request.headers_mut().insert(header::AUTHORIZATION, value);
    }
    next.run(request).await
}
