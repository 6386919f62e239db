//! # サービスコンテナ
//!
//! 型をキーとして依存を登録・解決する DI コンテナ。
//!
//! 登録は起動時に [`ServiceCollection`] へ行い、[`ServiceCollection::build`]
//! で読み取り専用の [`ServiceProvider`] に変換する。プロバイダは `Arc` で
//! 共有され、リクエストごとにクローンして使う。
//!
//! トレイトオブジェクトは `Arc<dyn Trait>` の形で登録・解決する。
//!
//! ```
//! use std::sync::Arc;
//!
//! use strata_services::container::ServiceCollection;
//! use strata_shared::{Localizer, ResourceCatalog};
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton::<Arc<dyn Localizer>>(Arc::new(ResourceCatalog::default()));
//!
//! let provider = services.build();
//! assert!(provider.get::<Arc<dyn Localizer>>().is_some());
//! ```

use std::sync::Arc;

use http::Extensions;

use crate::error::ServiceError;

/// 起動時に依存を登録するコレクション
#[derive(Debug, Default)]
pub struct ServiceCollection {
    services:   Extensions,
    registered: Vec<&'static str>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 依存を登録する。同じ型が登録済みなら置き換える
    pub fn add_singleton<T>(&mut self, value: T) -> &mut Self
    where
        T: Clone + Send + Sync + 'static,
    {
        let name = std::any::type_name::<T>();
        if self.services.insert(value).is_none() {
            self.registered.push(name);
        }
        self
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.services.get::<T>().is_some()
    }

    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.services.get::<T>().cloned()
    }

    /// 登録済みの型名（登録順）
    pub fn registered(&self) -> &[&'static str] {
        &self.registered
    }

    pub fn build(self) -> ServiceProvider {
        ServiceProvider {
            services: Arc::new(self.services),
        }
    }
}

/// 登録済みの依存を解決するプロバイダ
#[derive(Debug, Clone, Default)]
pub struct ServiceProvider {
    services: Arc<Extensions>,
}

impl ServiceProvider {
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.services.get::<T>().cloned()
    }

    /// 依存を解決する。未登録ならエラー
    pub fn require<T: Clone + Send + Sync + 'static>(&self) -> Result<T, ServiceError> {
        self.get::<T>()
            .ok_or(ServiceError::NotRegistered(std::any::type_name::<T>()))
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.services.get::<T>().is_some()
    }
}
