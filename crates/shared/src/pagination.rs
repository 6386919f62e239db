//! # ページネーション
//!
//! ページ番号ベースのページネーション要求と結果の型。
//!
//! ## JSON 形式
//!
//! ```json
//! {
//!   "PageNumber": 1,
//!   "PageSize": 10,
//!   "SortKey": "name",
//!   "SortDirection": "asc",
//!   "Items": [...],
//!   "RecordCount": 42,
//!   "PageCount": 5
//! }
//! ```

use serde::{Deserialize, Serialize};

/// 1 ページあたりの既定件数
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// 1 ページあたりの最大件数
pub const MAX_PAGE_SIZE: u32 = 1000;

/// ソート方向
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// ページネーション要求
///
/// `page_number` は 1 始まり。範囲外の値は [`normalized`](Self::normalized)
/// で補正してから使う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "PascalCase", default)]
pub struct PaginationRequest {
    pub page_number:    u32,
    pub page_size:      u32,
    pub sort_key:       Option<String>,
    pub sort_direction: SortDirection,
}

impl Default for PaginationRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

impl PaginationRequest {
    pub fn new(page_number: u32, page_size: u32) -> Self {
        Self {
            page_number,
            page_size,
            sort_key: None,
            sort_direction: SortDirection::Asc,
        }
    }

    pub fn with_sort(mut self, key: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_key = Some(key.into());
        self.sort_direction = direction;
        self
    }

    /// ページ番号を 1 以上、件数を `1..=MAX_PAGE_SIZE` に丸める
    pub fn normalized(&self) -> Self {
        Self {
            page_number:    self.page_number.max(1),
            page_size:      self.page_size.clamp(1, MAX_PAGE_SIZE),
            sort_key:       self.sort_key.clone(),
            sort_direction: self.sort_direction,
        }
    }

    /// 読み飛ばす件数（正規化後の値で計算する）
    pub fn offset(&self) -> u64 {
        let normalized = self.normalized();
        u64::from(normalized.page_number - 1) * u64::from(normalized.page_size)
    }
}

/// ページネーション結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "PascalCase")]
pub struct PaginationResult<T> {
    pub page_number:    u32,
    pub page_size:      u32,
    pub sort_key:       Option<String>,
    pub sort_direction: SortDirection,
    pub items:          Vec<T>,
    pub record_count:   u64,
    pub page_count:     u64,
}

impl<T> PaginationResult<T> {
    /// 1 ページ分の要素と総件数から結果を組み立てる
    pub fn new(request: &PaginationRequest, items: Vec<T>, record_count: u64) -> Self {
        let request = request.normalized();
        let page_count = record_count.div_ceil(u64::from(request.page_size));

        Self {
            page_number: request.page_number,
            page_size: request.page_size,
            sort_key: request.sort_key,
            sort_direction: request.sort_direction,
            items,
            record_count,
            page_count,
        }
    }

    /// 要素の型を変換する（ページ情報は保持する）
    pub fn map_items<U>(self, f: impl FnMut(T) -> U) -> PaginationResult<U> {
        PaginationResult {
            page_number:    self.page_number,
            page_size:      self.page_size,
            sort_key:       self.sort_key,
            sort_direction: self.sort_direction,
            items:          self.items.into_iter().map(f).collect(),
            record_count:   self.record_count,
            page_count:     self.page_count,
        }
    }

    /// 要素の型を変換する（失敗した時点で打ち切る）
    pub fn try_map_items<U, E>(
        self,
        f: impl FnMut(T) -> Result<U, E>,
    ) -> Result<PaginationResult<U>, E> {
        let items = self.items.into_iter().map(f).collect::<Result<Vec<_>, _>>()?;
        Ok(PaginationResult {
            page_number: self.page_number,
            page_size: self.page_size,
            sort_key: self.sort_key,
            sort_direction: self.sort_direction,
            items,
            record_count: self.record_count,
            page_count: self.page_count,
        })
    }

    /// 先頭の要素を返す。総件数が 0 の場合は `None`
    pub fn first(&self) -> Option<&T> {
        if self.record_count == 0 {
            return None;
        }
        self.items.first()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 10, 0)]
    #[case(1, 10, 1)]
    #[case(10, 10, 1)]
    #[case(11, 10, 2)]
    #[case(42, 5, 9)]
    fn test_ページ数は総件数とページサイズから切り上げで計算される(
        #[case] record_count: u64,
        #[case] page_size: u32,
        #[case] expected: u64,
    ) {
        let request = PaginationRequest::new(1, page_size);

        let result = PaginationResult::<i32>::new(&request, vec![], record_count);

        assert_eq!(result.page_count, expected);
    }

    #[test]
    fn test_normalizedは0ページと0件を補正する() {
        let request = PaginationRequest::new(0, 0).normalized();

        assert_eq!(request.page_number, 1);
        assert_eq!(request.page_size, 1);
    }

    #[test]
    fn test_offsetはページ番号から計算される() {
        assert_eq!(PaginationRequest::new(1, 20).offset(), 0);
        assert_eq!(PaginationRequest::new(3, 20).offset(), 40);
    }

    #[test]
    fn test_map_itemsはページ情報を保持する() {
        let request = PaginationRequest::new(2, 2).with_sort("name", SortDirection::Desc);
        let result = PaginationResult::new(&request, vec![1, 2], 5);

        let mapped = result.map_items(|n| n.to_string());

        assert_eq!(mapped.items, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(mapped.page_number, 2);
        assert_eq!(mapped.sort_key.as_deref(), Some("name"));
        assert_eq!(mapped.sort_direction, SortDirection::Desc);
        assert_eq!(mapped.page_count, 3);
    }

    #[test]
    fn test_firstは総件数0ならnone() {
        let request = PaginationRequest::default();
        let empty = PaginationResult::<i32>::new(&request, vec![], 0);
        let filled = PaginationResult::new(&request, vec![7, 8], 2);

        assert_eq!(empty.first(), None);
        assert_eq!(filled.first(), Some(&7));
    }

    #[test]
    fn test_jsonのキーはパスカルケース() {
        let result = PaginationResult::new(&PaginationRequest::new(1, 10), vec!["a"], 1);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["PageNumber"], 1);
        assert_eq!(json["RecordCount"], 1);
        assert_eq!(json["SortDirection"], "asc");
        assert_eq!(json["Items"], serde_json::json!(["a"]));
    }
}
