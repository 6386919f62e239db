//! # API レスポンスエンベロープ
//!
//! すべてのサービス操作が返す統一レスポンス形式を提供する。
//!
//! ## JSON 形式
//!
//! フィールド順は固定:
//!
//! ```json
//! { "Data": null, "Message": null, "MessageType": null, "Success": true }
//! ```
//!
//! `MessageType` は小文字のタグ（`info` / `success` / `warning` / `error`）
//! または `null` としてシリアライズされる。

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

/// レスポンスに付与するメッセージの種別
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    EnumString,
    strum::Display,
)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageType {
    /// 処理は成功し、補足情報を伝える
    Info,
    /// 処理が成功した
    Success,
    /// 処理は成功したが警告がある
    Warning,
    /// 処理中にエラーが発生した
    Error,
}

fn default_success() -> bool {
    true
}

/// 全サービス共通のレスポンス型
///
/// 生成直後は `Success = true`、`Message` / `MessageType` は未設定。
/// フィールドは公開しているが、通常はビルダースタイルの
/// `with_*` メソッドで組み立てる。
///
/// ## 使用例
///
/// ```
/// use strata_shared::{ApiResponse, MessageType};
///
/// let response = ApiResponse::new(15).with_message_type(MessageType::Info);
/// assert_eq!(
///     response.to_string(),
///     r#"{"Data":15,"Message":null,"MessageType":"info","Success":true}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "PascalCase")]
pub struct ApiResponse<T> {
    pub data:         Option<T>,
    pub message:      Option<String>,
    pub message_type: Option<MessageType>,
    #[serde(default = "default_success")]
    pub success:      bool,
}

impl<T> ApiResponse<T> {
    /// ペイロードを持つ成功レスポンスを作成する
    pub fn new(data: T) -> Self {
        Self {
            data:         Some(data),
            message:      None,
            message_type: None,
            success:      true,
        }
    }

    /// ペイロードを持たない成功レスポンスを作成する
    pub fn empty() -> Self {
        Self {
            data:         None,
            message:      None,
            message_type: None,
            success:      true,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_message_type(mut self, message_type: MessageType) -> Self {
        self.message_type = Some(message_type);
        self
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    /// 型なしレスポンスから変換する
    ///
    /// `Message` / `MessageType` / `Success` を引き継ぎ、`Data` は `None` になる。
    pub fn from_untyped(response: UntypedResponse) -> Self {
        Self {
            data:         None,
            message:      response.message,
            message_type: response.message_type,
            success:      response.success,
        }
    }

    /// `Data` を別の型に写像する
    pub fn map_data<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            data:         self.data.map(f),
            message:      self.message,
            message_type: self.message_type,
            success:      self.success,
        }
    }
}

impl<T> Default for ApiResponse<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Serialize> fmt::Display for ApiResponse<T> {
    /// JSON 文字列として出力する
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// ペイロードを持たないレスポンス
///
/// エラー応答を型に依存せず組み立てるために使う。
/// 返却時は [`ApiResponse::from_untyped`] または
/// [`UntypedResponse::into_typed`] で明示的に変換する。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "PascalCase")]
pub struct UntypedResponse {
    pub message:      Option<String>,
    pub message_type: Option<MessageType>,
    pub success:      bool,
}

impl UntypedResponse {
    /// エラーレスポンスを作成する
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message:      Some(message.into()),
            message_type: Some(MessageType::Error),
            success:      false,
        }
    }

    pub fn into_typed<T>(self) -> ApiResponse<T> {
        ApiResponse::from_untyped(self)
    }
}

impl fmt::Display for UntypedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn test_デフォルトのレスポンスはsuccessがtrueでそれ以外はnull() {
        let response = ApiResponse::<Value>::default();

        assert_eq!(
            response.to_string(),
            r#"{"Data":null,"Message":null,"MessageType":null,"Success":true}"#
        );
    }

    #[test]
    fn test_message_typeは小文字タグでシリアライズされる() {
        let response = ApiResponse::<Value>::empty().with_message_type(MessageType::Info);

        assert_eq!(
            response.to_string(),
            r#"{"Data":null,"Message":null,"MessageType":"info","Success":true}"#
        );
    }

    #[test]
    fn test_newで作成したレスポンスはメッセージを持たない() {
        let response = ApiResponse::new(vec![1, 2, 3]);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(
            json,
            json!({ "Data": [1, 2, 3], "Message": null, "MessageType": null, "Success": true })
        );
    }

    #[test]
    fn test_キーの順序はdata_message_message_type_successで固定() {
        let response = ApiResponse::new("x")
            .with_message("hello")
            .with_message_type(MessageType::Warning)
            .with_success(false);

        assert_eq!(
            response.to_string(),
            r#"{"Data":"x","Message":"hello","MessageType":"warning","Success":false}"#
        );
    }

    #[test]
    fn test_from_untypedはメタ情報を引き継ぎdataをnoneにする() {
        let untyped = UntypedResponse::error("失敗しました");

        let typed = ApiResponse::<i32>::from_untyped(untyped);

        assert_eq!(typed.data, None);
        assert_eq!(typed.message.as_deref(), Some("失敗しました"));
        assert_eq!(typed.message_type, Some(MessageType::Error));
        assert!(!typed.success);
    }

    #[test]
    fn test_untypedのerrorはsuccessがfalse() {
        let response = UntypedResponse::error("boom");

        assert_eq!(
            response.to_string(),
            r#"{"Message":"boom","MessageType":"error","Success":false}"#
        );
    }

    #[test]
    fn test_デシリアライズでsuccess省略時はtrueになる() {
        let response: ApiResponse<i32> = serde_json::from_str(r#"{"Data":3}"#).unwrap();

        assert_eq!(response.data, Some(3));
        assert!(response.success);
    }

    #[rstest]
    #[case(MessageType::Info, "info")]
    #[case(MessageType::Success, "success")]
    #[case(MessageType::Warning, "warning")]
    #[case(MessageType::Error, "error")]
    fn test_message_typeのタグは表示名とfrom_strで一致する(
        #[case] message_type: MessageType,
        #[case] tag: &str,
    ) {
        assert_eq!(<&'static str>::from(message_type), tag);
        assert_eq!(message_type.to_string(), tag);
        assert_eq!(tag.parse::<MessageType>().unwrap(), message_type);
    }

    #[test]
    fn test_不正なタグはパースに失敗する() {
        assert!("Info".parse::<MessageType>().is_err());
        assert!("".parse::<MessageType>().is_err());
    }

    #[test]
    fn test_map_dataはメタ情報を保持する() {
        let response = ApiResponse::new(2).with_message("ok").map_data(|n| n * 10);

        assert_eq!(response.data, Some(20));
        assert_eq!(response.message.as_deref(), Some("ok"));
    }
}

#[cfg(all(test, feature = "openapi"))]
mod openapi_tests {
    use utoipa::PartialSchema;

    use super::*;

    #[test]
    fn test_api_responseにtoschemaが実装されている() {
        let schema = ApiResponse::<String>::schema();
        let utoipa::openapi::RefOr::T(schema) = schema else {
            panic!("expected inline schema, got ref");
        };
        let utoipa::openapi::Schema::Object(obj) = schema else {
            panic!("expected object schema");
        };
        assert!(obj.properties.contains_key("Data"));
        assert!(obj.properties.contains_key("MessageType"));
    }
}
