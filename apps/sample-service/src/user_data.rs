//! # 設定ストアのユーザーデータ
//!
//! Bearer トークンごとのユーザーを設定ストアに持たせる [`UserDataLoader`] 実装。
//! 開発・デモ用で、外部の認証基盤は使わない。
//!
//! ```json
//! {
//!   "Users": {
//!     "admin-token": { "UserId": "1", "Permissions": "AddItem,DeleteItem" }
//!   }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use strata_services::{ConfigSource, ServiceError};
use strata_web::{UserData, UserDataLoader};

/// 設定ストアからユーザーデータを引くローダー
pub struct ConfigUserDataLoader {
    config: Arc<dyn ConfigSource>,
}

impl ConfigUserDataLoader {
    pub fn new(config: Arc<dyn ConfigSource>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl UserDataLoader for ConfigUserDataLoader {
    async fn load(&self, token: &str) -> Result<Option<UserData>, ServiceError> {
        let Some(user_id) = self.config.get_non_empty(&format!("Users:{token}:UserId")) else {
            return Ok(None);
        };

        let permissions = self
            .config
            .get(&format!("Users:{token}:Permissions"))
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(UserData {
            user_id,
            permissions,
        }))
    }
}
