//! # 商品サービス
//!
//! [`ApiService`] の上に商品の参照・登録・削除を実装する。
//! リクエストごとに作成し、ストアは [`ItemStore`] を共有する。

use strata_services::{ApiService, ServiceArgs, ServiceError, caller};
use strata_shared::{
    ApiOperationType, ApiResponse, PaginationRequest, PaginationResult, resources::keys,
};

use crate::{
    item::{CreateItemRequest, Item, ItemDto},
    store::ItemStore,
};

/// 商品サービス
#[derive(Debug)]
pub struct ItemService {
    base:  ApiService,
    store: ItemStore,
}

impl ItemService {
    pub fn new(args: ServiceArgs, store: ItemStore) -> Self {
        Self {
            base: ApiService::new("ItemService", args),
            store,
        }
    }

    /// 全件を返す。0 件なら「該当なし」を付ける
    pub async fn list(&mut self) -> Result<ApiResponse<Vec<ItemDto>>, ServiceError> {
        self.base.start_log(caller!());
        let items = self.store.all().await?;
        let response = self
            .base
            .ok_for::<Vec<Item>, Vec<ItemDto>>(items, ApiOperationType::Read);
        self.base.end_log(caller!(), None);
        response
    }

    pub async fn paginate(
        &mut self,
        request: &PaginationRequest,
    ) -> Result<ApiResponse<PaginationResult<ItemDto>>, ServiceError> {
        self.base.start_log(caller!());
        let items = self.store.all().await?;
        let response = self
            .base
            .paginate::<Vec<Item>, Item, ItemDto>(&items, request)
            .await;
        self.base.end_log(caller!(), None);
        response
    }

    /// ID で 1 件返す。見つからなければエラーエンベロープ
    pub async fn find(&mut self, id: u32) -> Result<ApiResponse<ItemDto>, ServiceError> {
        self.base.start_log(caller!());
        let response = match self.store.find(id).await? {
            Some(item) => self.base.ok::<Item, ItemDto>(item, None),
            None => self.not_found(),
        };
        self.base.end_log(caller!(), None);
        response
    }

    /// 検証して登録する。ID はストアで採番する
    pub async fn create(
        &mut self,
        request: CreateItemRequest,
    ) -> Result<ApiResponse<ItemDto>, ServiceError> {
        self.base.start_log(caller!());
        self.base.validate(Some(&request))?;

        let next_id = self.store.next_id().await?;
        let item = request.into_item(next_id);

        self.base
            .save_async(&mut self.store, ApiOperationType::Insert, [item.clone()], true)
            .await?;
        let response = self.base.ok_for::<Item, ItemDto>(item, ApiOperationType::Insert);

        self.base
            .end_log(caller!(), Some(format!("Item {next_id} created").as_str()));
        response
    }

    /// ID で 1 件削除する。見つからなければエラーエンベロープ
    pub async fn delete(&mut self, id: u32) -> Result<ApiResponse<ItemDto>, ServiceError> {
        self.base.start_log(caller!());
        let Some(item) = self.store.find(id).await? else {
            self.base.end_log(caller!(), None);
            return self.not_found();
        };

        self.base
            .save_async(&mut self.store, ApiOperationType::Delete, [item.clone()], true)
            .await?;
        let response = self.base.ok_for::<Item, ItemDto>(item, ApiOperationType::Delete);

        self.base
            .end_log(caller!(), Some(format!("Item {id} deleted").as_str()));
        response
    }

    fn not_found(&self) -> Result<ApiResponse<ItemDto>, ServiceError> {
        let message = self.base.localizer()?.get(keys::NO_RECORDS_FOUND);
        Ok(ApiService::error(message).into_typed())
    }

    /// 依存を解放する
    pub fn dispose(&mut self) {
        self.base.dispose();
    }
}
