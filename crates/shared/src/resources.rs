//! # ローカライズ済み文字列リソース
//!
//! サービス層・Web 層が出力するメッセージ（レスポンスメッセージ、
//! ログメッセージ、エラーメッセージ）を名前で引くための仕組み。
//!
//! グローバルなキャッシュは持たない。[`Localizer`] を実装した値を
//! 構築時に明示的に渡す。
//!
//! ## 解決規則
//!
//! - 名前に対応する値がなければ名前そのものを返す
//! - `{0}`, `{1}`, … は [`Localizer::get_with`] の引数で置換する
//!
//! ## 上書きファイル
//!
//! [`ResourceCatalog::load`] は組み込みテーブルの上に
//! `<resources_path>/<locale>.json`（`{"名前": "値"}` 形式）を重ねる。

use std::{collections::HashMap, fmt::Display, path::Path};

/// リソース名の定数
pub mod keys {
    pub const ARGUMENT_CAN_NOT_BE_NULL: &str = "Common.ArgumentCanNotBeNull";
    pub const NO_RECORDS_FOUND: &str = "Common.NoRecordsFound";
    pub const MISSING_VALUE: &str = "Common.MissingValue";
    pub const INVALID_VALUE: &str = "Common.InvalidValue";
    pub const ENVIRONMENT_VARIABLE_NOT_FOUND: &str = "Common.EnvironmentVariableNotFound";

    pub const METHOD_ALREADY_CALLED: &str = "ApiBuilder.MethodAlreadyCalled";

    pub const RESPONSE_INSERT: &str = "ApiService.Response.Insert";
    pub const RESPONSE_BULK_INSERT: &str = "ApiService.Response.BulkInsert";
    pub const RESPONSE_UPDATE: &str = "ApiService.Response.Update";
    pub const RESPONSE_BULK_UPDATE: &str = "ApiService.Response.BulkUpdate";
    pub const RESPONSE_DELETE: &str = "ApiService.Response.Delete";
    pub const RESPONSE_BULK_DELETE: &str = "ApiService.Response.BulkDelete";

    pub const START_LOG_START: &str = "ApiService.StartLog.Start";
    pub const END_LOG_END: &str = "ApiService.EndLog.End";
    pub const END_LOG_TOTAL_SECONDS: &str = "ApiService.EndLog.TotalSeconds";
    pub const DISPOSE_DISPOSING: &str = "ApiService.Dispose.Disposing";

    pub const GLOBAL_EXCEPTION_MSG: &str = "ExceptionsHandler.GlobalExceptionMsg";
    pub const INTERNAL_SERVER_ERROR: &str = "ExceptionsHandler.InternalServerError";
    pub const MODEL_STATE_INVALID: &str = "ValidateModelState.Invalid";
    pub const PERMISSION_UNAUTHORIZED: &str = "Permission.Unauthorized";
}

const EN: &[(&str, &str)] = &[
    (keys::ARGUMENT_CAN_NOT_BE_NULL, "The argument '{0}' can not be null"),
    (keys::NO_RECORDS_FOUND, "No records found"),
    (keys::MISSING_VALUE, "Missing '{0}' value"),
    (keys::INVALID_VALUE, "Invalid '{0}': '{1}'"),
    (keys::ENVIRONMENT_VARIABLE_NOT_FOUND, "Environment variable not found: '{0}'"),
    (keys::METHOD_ALREADY_CALLED, "The method '{0}' was already called"),
    (keys::RESPONSE_INSERT, "The record was successfully created"),
    (keys::RESPONSE_BULK_INSERT, "The records were successfully created"),
    (keys::RESPONSE_UPDATE, "The record was successfully updated"),
    (keys::RESPONSE_BULK_UPDATE, "The records were successfully updated"),
    (keys::RESPONSE_DELETE, "The record was successfully deleted"),
    (keys::RESPONSE_BULK_DELETE, "The records were successfully deleted"),
    (keys::START_LOG_START, "{0} Start"),
    (keys::END_LOG_END, "{0} End"),
    (keys::END_LOG_TOTAL_SECONDS, "Total seconds: {0}"),
    (keys::DISPOSE_DISPOSING, "Disposing {0}"),
    (
        keys::GLOBAL_EXCEPTION_MSG,
        "An unexpected error occurred, please try again later",
    ),
    (keys::INTERNAL_SERVER_ERROR, "Internal Server Error"),
    (keys::MODEL_STATE_INVALID, "ModelState is invalid"),
    (
        keys::PERMISSION_UNAUTHORIZED,
        "You are not authorized to perform this operation",
    ),
];

const JA: &[(&str, &str)] = &[
    (keys::ARGUMENT_CAN_NOT_BE_NULL, "引数 '{0}' は必須です"),
    (keys::NO_RECORDS_FOUND, "該当するデータがありません"),
    (keys::MISSING_VALUE, "'{0}' の値がありません"),
    (keys::INVALID_VALUE, "'{0}' の値が不正です: '{1}'"),
    (keys::ENVIRONMENT_VARIABLE_NOT_FOUND, "環境変数が見つかりません: '{0}'"),
    (keys::METHOD_ALREADY_CALLED, "'{0}' は既に呼び出されています"),
    (keys::RESPONSE_INSERT, "登録しました"),
    (keys::RESPONSE_BULK_INSERT, "一括登録しました"),
    (keys::RESPONSE_UPDATE, "更新しました"),
    (keys::RESPONSE_BULK_UPDATE, "一括更新しました"),
    (keys::RESPONSE_DELETE, "削除しました"),
    (keys::RESPONSE_BULK_DELETE, "一括削除しました"),
    (keys::START_LOG_START, "{0} 開始"),
    (keys::END_LOG_END, "{0} 終了"),
    (keys::END_LOG_TOTAL_SECONDS, "所要時間（秒）: {0}"),
    (keys::DISPOSE_DISPOSING, "{0} を破棄します"),
    (
        keys::GLOBAL_EXCEPTION_MSG,
        "予期しないエラーが発生しました。時間をおいて再度お試しください",
    ),
    (keys::INTERNAL_SERVER_ERROR, "内部サーバーエラー"),
    (keys::MODEL_STATE_INVALID, "入力値が不正です"),
    (keys::PERMISSION_UNAUTHORIZED, "この操作を行う権限がありません"),
];

/// 組み込みテーブルを持つロケール
pub const SUPPORTED_LOCALES: [&str; 2] = ["en", "ja"];

/// 既定ロケール
pub const DEFAULT_LOCALE: &str = "en";

/// 名前から文字列リソースを引く
pub trait Localizer: Send + Sync {
    /// 名前に対応する文字列を返す。見つからなければ名前そのものを返す
    fn get(&self, name: &str) -> String;

    /// 名前に対応する文字列の `{0}`, `{1}`, … を引数で置換して返す
    fn get_with(&self, name: &str, args: &[&dyn Display]) -> String {
        format_resource(&self.get(name), args)
    }
}

/// `{0}`, `{1}`, … を引数で置換する
///
/// 引数より大きい番号のプレースホルダーはそのまま残す。
pub fn format_resource(template: &str, args: &[&dyn Display]) -> String {
    args.iter()
        .enumerate()
        .fold(template.to_string(), |acc, (index, arg)| {
            acc.replace(&format!("{{{index}}}"), &arg.to_string())
        })
}

/// リソースファイル読み込みエラー
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("リソースファイルの読み込みに失敗しました: {path}")]
    Io {
        path:   String,
        #[source]
        source: std::io::Error,
    },

    #[error("リソースファイルの形式が不正です: {path}")]
    Json {
        path:   String,
        #[source]
        source: serde_json::Error,
    },
}

/// ロケールごとの文字列テーブル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceCatalog {
    locale:  String,
    entries: HashMap<String, String>,
}

impl Default for ResourceCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_LOCALE)
    }
}

impl ResourceCatalog {
    /// 組み込みテーブルから作成する
    ///
    /// 未対応のロケールは英語テーブルを使う。
    pub fn new(locale: &str) -> Self {
        let table = match locale {
            "ja" => JA,
            _ => EN,
        };
        Self {
            locale:  locale.to_string(),
            entries: table
                .iter()
                .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
                .collect(),
        }
    }

    /// 組み込みテーブルに `<resources_path>/<locale>.json` を重ねて作成する
    ///
    /// ファイルが存在しない場合は組み込みテーブルのみを使う。
    pub fn load(resources_path: impl AsRef<Path>, locale: &str) -> Result<Self, ResourceError> {
        let mut catalog = Self::new(locale);
        let path = resources_path.as_ref().join(format!("{locale}.json"));

        if !path.exists() {
            return Ok(catalog);
        }

        let display = path.display().to_string();
        let content = std::fs::read_to_string(&path).map_err(|source| ResourceError::Io {
            path: display.clone(),
            source,
        })?;
        let overrides: HashMap<String, String> =
            serde_json::from_str(&content).map_err(|source| ResourceError::Json {
                path: display,
                source,
            })?;

        catalog.entries.extend(overrides);
        Ok(catalog)
    }

    /// エントリを追加・上書きする
    pub fn with_entry(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }
}

impl Localizer for ResourceCatalog {
    fn get(&self, name: &str) -> String {
        self.entries
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}
