//! # サービス種別
//!
//! 設定キー `ServiceType` で選ぶバックエンド実装の種別。

use strum::{EnumString, IntoStaticStr};

use crate::{config_source::ConfigSource, error::ConfigError};

/// サービス種別を指定する設定キー
pub const SERVICE_TYPE_KEY: &str = "ServiceType";

/// バックエンド実装の種別
///
/// 設定ファイル上のタグは大文字小文字を区別する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, EnumString, strum::Display)]
pub enum ServiceType {
    /// データベースを使う実装
    #[strum(serialize = "ServiceEF")]
    Database,
    /// 外部 HTTP サービスを呼ぶ実装
    #[strum(serialize = "ServiceHttp")]
    Http,
    /// インメモリのモック実装
    #[strum(serialize = "ServiceMock")]
    Mock,
}

/// 設定からサービス種別を読み取る
///
/// # Errors
///
/// - 値がない・空文字列: [`ConfigError::Missing`]
/// - 未知のタグ: [`ConfigError::Invalid`]
pub fn service_type(config: &dyn ConfigSource) -> Result<ServiceType, ConfigError> {
    let value = config
        .get_non_empty(SERVICE_TYPE_KEY)
        .ok_or_else(|| ConfigError::missing(SERVICE_TYPE_KEY))?;
    value
        .parse()
        .map_err(|_| ConfigError::invalid(SERVICE_TYPE_KEY, value))
}
