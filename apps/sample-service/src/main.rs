//! # Strata サンプルサービス サーバー
//!
//! 商品 API を提供するマイクロサービスのエントリーポイント。
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境（カレントディレクトリの appsettings.json を読む）
//! cargo run -p strata-sample
//!
//! # 設定ファイルとポートを指定
//! SAMPLE_SETTINGS=/etc/strata/appsettings.json SAMPLE_PORT=8080 cargo run -p strata-sample --release
//! ```
//!
//! ## 設定ファイルの例
//!
//! ```json
//! {
//!   "ServiceType": "ServiceMock",
//!   "Cors": { "PolicyName": "AllowSpecificOrigins", "Origins": "http://localhost:3000" },
//!   "Swagger": {
//!     "IsEnabled": "true",
//!     "ApiVersion": "v1",
//!     "ApiName": "Strata Sample API",
//!     "JsonEndpoint": "/swagger/v1/swagger.json"
//!   },
//!   "SwaggerConfig": { "AddAuthorizationHeader": "true", "BearerToken": "Bearer admin-token" },
//!   "Users": { "admin-token": { "UserId": "1", "Permissions": "AddItem,DeleteItem" } }
//! }
//! ```

use std::{net::SocketAddr, sync::Arc};

use strata_sample::{
    app_builder::{SERVICE_NAME, build_app},
    config::{SampleConfig, load_settings},
};
use strata_services::ConfigSource;
use tokio::net::TcpListener;

/// サーバーのエントリーポイント
///
/// 以下の順序で初期化を行う:
///
/// 1. 環境変数の読み込み（.env ファイル）
/// 2. サーバー設定と設定ストアの読み込み
/// 3. DI コンテナ・Web パイプラインの構築（トレーシングの初期化を含む）
/// 4. HTTP サーバーの起動
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    let config = SampleConfig::from_env()?;
    let settings: Arc<dyn ConfigSource> = Arc::new(load_settings(&config.settings_path)?);

    let app = build_app(settings, &config.locale)?;
    let _tracing_guard = tracing::info_span!("app", service = SERVICE_NAME).entered();

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("サンプルサービスを起動します: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
