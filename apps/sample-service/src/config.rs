//! # サンプルサービス設定
//!
//! サーバーのバインド先は環境変数から、業務設定（CORS・Swagger・サービス種別など）は
//! 設定ファイルと環境変数を重ねた設定ストアから読み込む。
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `SAMPLE_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `SAMPLE_PORT` | No | ポート番号（デフォルト: `5000`） |
//! | `SAMPLE_SETTINGS` | No | 設定ファイルのパス（デフォルト: `appsettings.json`） |
//! | `SAMPLE_LOCALE` | No | メッセージのロケール（デフォルト: `en`） |
//!
//! 設定ファイルの値は `Cors__PolicyName` のような環境変数で上書きできる。

use std::{env, num::ParseIntError, path::Path};

use strata_services::{EnvConfig, FileConfig, LayeredConfig};
use strata_shared::resources::DEFAULT_LOCALE;

/// 既定のポート番号
pub const DEFAULT_PORT: u16 = 5000;

/// 既定の設定ファイル
pub const DEFAULT_SETTINGS_PATH: &str = "appsettings.json";

/// サンプルサービスのサーバー設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleConfig {
    /// バインドアドレス
    pub host:          String,
    /// ポート番号
    pub port:          u16,
    /// 設定ファイルのパス
    pub settings_path: String,
    pub locale:        String,
}

impl SampleConfig {
    /// 環境変数から設定を読み込む
    ///
    /// # Errors
    ///
    /// `SAMPLE_PORT` がポート番号として解釈できない場合
    pub fn from_env() -> Result<Self, ParseIntError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ParseIntError> {
        let port = match lookup("SAMPLE_PORT") {
            Some(port) => port.trim().parse()?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: lookup("SAMPLE_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            settings_path: lookup("SAMPLE_SETTINGS")
                .unwrap_or_else(|| DEFAULT_SETTINGS_PATH.to_string()),
            locale: lookup("SAMPLE_LOCALE").unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
        })
    }
}

/// 設定ファイルと環境変数を重ねた設定ストアを作る
///
/// ファイルがなければ環境変数のみを使う。環境変数はファイルより優先する。
///
/// # Errors
///
/// ファイルが存在するが読み込めない場合
pub fn load_settings(path: impl AsRef<Path>) -> Result<LayeredConfig, config::ConfigError> {
    let path = path.as_ref();
    let mut settings = LayeredConfig::new();

    if path.exists() {
        settings = settings.add(FileConfig::load(path)?);
        tracing::info!(path = %path.display(), "設定ファイルを読み込みました");
    } else {
        tracing::info!(path = %path.display(), "設定ファイルがないため環境変数のみを使います");
    }

    Ok(settings.add(EnvConfig::new()))
}
