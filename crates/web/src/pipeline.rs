//! # Web パイプライン
//!
//! 設定から CORS・Swagger・認可ヘッダー転送を読み取り、
//! アプリケーションのルーターに共通ミドルウェアを積む。
//!
//! ## レイヤー順序（外側から）
//!
//! 1. `SetRequestIdLayer`: UUID v7 の Request ID を採番（クライアント提供値があればそれを使う）
//! 2. `TraceLayer`: request_id を含むスパンを作成
//! 3. `PropagateRequestIdLayer`: レスポンスヘッダーに `X-Request-Id` をコピー
//! 4. `store_request_id`: task-local に保存
//! 5. `cors_preflight`: OPTIONS に直接応答（CORS 有効時）
//! 6. `CorsLayer`: CORS ヘッダーを付与（CORS 有効時）
//! 7. `handle_exceptions`: 未処理エラーを記録し、ローカライズ済みエンベロープに差し替え
//! 8. `RequestLogLayer`: 開始・終了ログ
//! 9. `CatchPanicLayer`: panic を 500 応答に変換
//! 10. `forward_x_authorization`: `X-Authorization` を `Authorization` に写す（有効時）
//!
//! ルート単位のミドルウェア（[`load_user_data`](crate::permission::load_user_data)、
//! [`require_permission`](crate::permission::require_permission)）はアプリケーション側で積む。

use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
};
use strata_services::{ConfigError, ConfigSource};
use strata_shared::{
    Localizer,
    observability::{MakeRequestUuidV7, make_request_span},
};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{Modify, openapi::OpenApi};

use crate::{
    cors::{CorsConfig, cors_config, cors_layer, cors_preflight},
    exception::{ExceptionState, catch_panic_layer, handle_exceptions},
    request_id::store_request_id,
    request_log::RequestLogLayer,
    swagger::{AuthorizationHeader, SwaggerConfig, forward_x_authorization, swagger_config},
};

/// 共通ミドルウェアの構成
#[derive(Clone)]
pub struct WebPipeline {
    cors:                 CorsConfig,
    swagger:              SwaggerConfig,
    authorization_header: Option<AuthorizationHeader>,
    localizer:            Arc<dyn Localizer>,
}

impl WebPipeline {
    /// 設定を読み取って構成する
    ///
    /// # Errors
    ///
    /// CORS・Swagger 設定が不正な場合は [`ConfigError`]
    pub fn from_config(
        config: &dyn ConfigSource,
        localizer: Arc<dyn Localizer>,
    ) -> Result<Self, ConfigError> {
        tracing::info!("CORS 設定を読み込みます");
        let cors = cors_config(config)?;
        if cors.policy.is_enabled() {
            tracing::info!(policy = %cors.policy, "CORS ポリシーを適用します");
        } else {
            tracing::info!("CORS は無効です");
        }

        tracing::info!("Swagger 設定を読み込みます");
        let swagger = swagger_config(config)?;
        if !swagger.is_enabled {
            tracing::info!("Swagger は無効です");
        }

        Ok(Self {
            cors,
            swagger,
            authorization_header: AuthorizationHeader::from_config(config),
            localizer,
        })
    }

    pub fn cors(&self) -> &CorsConfig {
        &self.cors
    }

    pub fn swagger(&self) -> &SwaggerConfig {
        &self.swagger
    }

    pub fn authorization_header(&self) -> Option<&AuthorizationHeader> {
        self.authorization_header.as_ref()
    }

    /// OpenAPI ドキュメントに設定を反映する
    ///
    /// タイトル・バージョンを Swagger 設定に合わせ、認可ヘッダーが有効なら
    /// 全オペレーションに `X-Authorization` を追加する。
    pub fn document(&self, openapi: OpenApi) -> OpenApi {
        let mut document = self.swagger.document(openapi);
        if let Some(header) = &self.authorization_header {
            header.modify(&mut document);
        }
        document
    }

    /// ルーターに共通ミドルウェアと Swagger ルートを積む
    pub fn apply(self, router: Router, openapi: OpenApi) -> Router {
        let document = self.document(openapi);
        let mut app = router.merge(self.swagger.router(document));

        if self.authorization_header.is_some() {
            tracing::info!("X-Authorization ヘッダーの転送を有効にします");
            app = app.layer(from_fn(forward_x_authorization));
        }

        app = app
            .layer(catch_panic_layer())
            .layer(RequestLogLayer)
            .layer(from_fn_with_state(
                ExceptionState {
                    localizer: self.localizer.clone(),
                },
                handle_exceptions,
            ));

        if let Some(cors) = cors_layer(&self.cors) {
            app = app
                .layer(cors)
                .layer(from_fn_with_state(self.cors.policy, cors_preflight));
        }

        // レイヤー順序が重要: 下に書いたものが外側
        app.layer(from_fn(store_request_id))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
    }
}
