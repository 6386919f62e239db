//! # API 設定
//!
//! ビルダーが起動時に参照する設定。`set_configuration` ステップで
//! 設定ストアの値から上書きできる。

/// ビルダーが参照する設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// ローカライズ用リソースファイルのディレクトリ
    pub resources_path:           String,
    /// ログのタイムスタンプ書式（`[yyyy-MM-dd HH:mm:ss]` 形式）
    pub logging_timestamp_format: Option<String>,
    /// 接続文字列名を値に持つ設定キー。`None` ならデータベースを使わない
    pub connection_string_key:    Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            resources_path:           "Resources".to_string(),
            logging_timestamp_format: Some("[yyyy-MM-dd HH:mm:ss]".to_string()),
            connection_string_key:    Some("SqlServerConnectionString".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_既定値() {
        let config = ApiConfig::default();

        assert_eq!(config.resources_path, "Resources");
        assert_eq!(
            config.logging_timestamp_format.as_deref(),
            Some("[yyyy-MM-dd HH:mm:ss]")
        );
        assert_eq!(
            config.connection_string_key.as_deref(),
            Some("SqlServerConnectionString")
        );
    }
}
