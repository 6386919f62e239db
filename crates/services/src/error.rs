//! # サービス層のエラー定義
//!
//! | 型 | 分類 | 扱い |
//! |----|------|------|
//! | [`ConfigError`] | 設定値の欠落・不正 | 起動処理・要求元の処理を中断する |
//! | [`BuilderError`] | ビルダーステップの再実行など | 起動処理を中断する |
//! | [`ServiceError`] | 引数欠落・検証失敗・登録漏れ・データ操作失敗 | 検証失敗のみ Web 層でエンベロープに変換する |

use strata_shared::{
    Localizer,
    resources::{ResourceError, keys},
};

use crate::builder::BuilderStep;

/// 設定値の欠落・不正
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// 必須の値がない（空文字列を含む）
    #[error("Missing '{key}' value")]
    Missing { key: String },

    /// 値が不正
    #[error("Invalid '{key}': '{value}'")]
    Invalid { key: String, value: String },

    /// 接続文字列名が指す値が環境変数・設定のどちらにもない
    #[error("Environment variable not found: '{name}'")]
    ConnectionStringNotFound { name: String },
}

impl ConfigError {
    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing { key: key.into() }
    }

    pub fn invalid(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Invalid {
            key:   key.into(),
            value: value.into(),
        }
    }

    /// ローカライズ済みのメッセージを返す
    pub fn localized(&self, localizer: &dyn Localizer) -> String {
        match self {
            Self::Missing { key } => localizer.get_with(keys::MISSING_VALUE, &[key]),
            Self::Invalid { key, value } => {
                localizer.get_with(keys::INVALID_VALUE, &[key, value])
            }
            Self::ConnectionStringNotFound { name } => {
                localizer.get_with(keys::ENVIRONMENT_VARIABLE_NOT_FOUND, &[name])
            }
        }
    }
}

/// ビルダーのエラー
#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    /// 同じステップが 2 回呼ばれた
    #[error("The method '{0}' was already called")]
    AlreadyInvoked(BuilderStep),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resources(#[from] ResourceError),

    #[error("データベース接続プールの作成に失敗しました")]
    Database(#[from] sqlx::Error),
}

/// サービス操作のエラー
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// 必須の引数・依存がない
    #[error("The argument '{0}' can not be null")]
    MissingArgument(&'static str),

    /// ペイロードが業務ルールを満たさない
    #[error("{0}")]
    Validation(String),

    /// ペイロード型に対するバリデータが登録されていない
    #[error("バリデータが登録されていません: {0}")]
    ValidatorNotRegistered(&'static str),

    /// 型の組み合わせに対するマッピングが登録されていない
    #[error("マッピングが登録されていません: {from} -> {to}")]
    MappingNotRegistered {
        from: &'static str,
        to:   &'static str,
    },

    /// サービスプロバイダに依存が登録されていない
    #[error("サービスが登録されていません: {0}")]
    NotRegistered(&'static str),

    /// 破棄済みのサービスを使った
    #[error("サービスは既に破棄されています")]
    Disposed,

    #[error("データ操作に失敗しました: {0}")]
    Data(String),

    #[error("データベースエラー: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    /// ユーザー向けに返してよいエラーか
    ///
    /// 検証失敗のみが該当する。それ以外は内部エラーとして扱う。
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use strata_shared::ResourceCatalog;

    use super::*;

    #[test]
    fn test_config_errorのメッセージはキーを含む() {
        assert_eq!(
            ConfigError::missing("Cors:Origins").to_string(),
            "Missing 'Cors:Origins' value"
        );
        assert_eq!(
            ConfigError::invalid("Cors:PolicyName", "Foo").to_string(),
            "Invalid 'Cors:PolicyName': 'Foo'"
        );
    }

    #[test]
    fn test_localizedはロケールのテーブルを使う() {
        let ja = ResourceCatalog::new("ja");

        assert_eq!(
            ConfigError::missing("ServiceType").localized(&ja),
            "'ServiceType' の値がありません"
        );
    }

    #[test]
    fn test_英語のlocalizedはdisplayと一致する() {
        let en = ResourceCatalog::new("en");
        let errors = [
            ConfigError::missing("A"),
            ConfigError::invalid("B", "x"),
            ConfigError::ConnectionStringNotFound { name: "Db".into() },
        ];

        for error in errors {
            assert_eq!(error.localized(&en), error.to_string());
        }
    }

    #[test]
    fn test_is_validationは検証失敗のみtrue() {
        assert!(ServiceError::Validation("x".into()).is_validation());
        assert!(!ServiceError::MissingArgument("payload").is_validation());
        assert!(!ServiceError::Disposed.is_validation());
    }
}
