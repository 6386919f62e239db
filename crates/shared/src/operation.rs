//! # 操作種別
//!
//! サービスが実行する業務操作の分類。レスポンスの既定メッセージ選択と
//! データコンテキストへの反映方法の決定に使う。

use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

/// サービスが実行する操作の種別
///
/// 表示名（`Display` / `FromStr`）は大文字小文字を区別する。
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
pub enum ApiOperationType {
    /// データを変更しない読み取り
    Read,
    /// 1 件の挿入
    Insert,
    /// 複数件の挿入
    #[strum(serialize = "Bulk Insert")]
    BulkInsert,
    /// 1 件の更新
    Update,
    /// 複数件の更新
    #[strum(serialize = "Bulk Update")]
    BulkUpdate,
    /// 1 件の削除
    Delete,
    /// 複数件の削除
    #[strum(serialize = "Bulk Delete")]
    BulkDelete,
}

impl ApiOperationType {
    pub const ALL: [Self; 7] = [
        Self::Read,
        Self::Insert,
        Self::BulkInsert,
        Self::Update,
        Self::BulkUpdate,
        Self::Delete,
        Self::BulkDelete,
    ];

    /// 人間向けの表示名
    pub fn description(self) -> &'static str {
        self.into()
    }

    /// データを変更する操作かどうか
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Read)
    }
}
