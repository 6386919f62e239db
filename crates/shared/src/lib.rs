//! # Strata 共有ユーティリティ
//!
//! このクレートは、Strata で構築するすべてのサービスが共有する
//! レスポンス型・ページネーション・ローカライズ・ログ初期化を提供する。
//!
//! ## 設計方針
//!
//! - 他のすべてのクレート（services, web, アプリ）から依存される
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - axum への依存は持たない（HTTP への変換は web クレートの責務）

pub mod api_response;
pub mod observability;
pub mod operation;
pub mod pagination;
pub mod resources;

pub use api_response::{ApiResponse, MessageType, UntypedResponse};
pub use operation::ApiOperationType;
pub use pagination::{PaginationRequest, PaginationResult, SortDirection};
pub use resources::{Localizer, ResourceCatalog};
