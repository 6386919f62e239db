//! # ペイロードバリデータ
//!
//! ペイロード型ごとに業務ルールの検証器を登録する。
//!
//! `validator::Validate` を derive した型は [`ValidatorRegistry::register_derived`]
//! でそのまま登録できる。独自のルールは [`PayloadValidator`] を実装する。

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    marker::PhantomData,
    sync::Arc,
};

use validator::Validate;

use crate::error::ServiceError;

/// ペイロードの検証器
pub trait PayloadValidator<T>: Send + Sync {
    /// 検証エラーのメッセージを返す。空なら検証成功
    fn validate(&self, payload: &T) -> Vec<String>;
}

impl<T, F> PayloadValidator<T> for F
where
    F: Fn(&T) -> Vec<String> + Send + Sync,
{
    fn validate(&self, payload: &T) -> Vec<String> {
        self(payload)
    }
}

/// `validator::Validate` を検証器として使うアダプタ
pub struct DerivedValidator<T>(PhantomData<fn(&T)>);

impl<T> Default for DerivedValidator<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: Validate> PayloadValidator<T> for DerivedValidator<T> {
    fn validate(&self, payload: &T) -> Vec<String> {
        match payload.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => validation_messages(&errors),
        }
    }
}

/// `ValidationErrors` をメッセージの列に変換する
///
/// フィールド名の昇順に並べる。メッセージ未指定のエラーは
/// `"<field>: <code>"` 形式にする。
pub fn validation_messages(errors: &validator::ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));

    fields
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| match &error.message {
                Some(message) => message.to_string(),
                None => format!("{field}: {}", error.code),
            })
        })
        .collect()
}

/// ペイロード型ごとの検証器を保持するレジストリ
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `T` の検証器を登録する。登録済みなら置き換える
    pub fn register<T: 'static>(
        &mut self,
        validator: impl PayloadValidator<T> + 'static,
    ) -> &mut Self {
        let validator: Arc<dyn PayloadValidator<T>> = Arc::new(validator);
        self.validators.insert(TypeId::of::<T>(), Arc::new(validator));
        self
    }

    /// `validator::Validate` の derive をそのまま検証器として登録する
    pub fn register_derived<T: Validate + 'static>(&mut self) -> &mut Self {
        self.register::<T>(DerivedValidator::<T>::default())
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.validators.contains_key(&TypeId::of::<T>())
    }

    /// 検証を実行し、最初のエラーメッセージを返す
    ///
    /// # Errors
    ///
    /// `T` の検証器が登録されていない場合は [`ServiceError::ValidatorNotRegistered`]
    pub fn first_error<T: 'static>(&self, payload: &T) -> Result<Option<String>, ServiceError> {
        let validator = self
            .validators
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<Arc<dyn PayloadValidator<T>>>())
            .ok_or(ServiceError::ValidatorNotRegistered(std::any::type_name::<T>()))?;

        Ok(validator.validate(payload).into_iter().next())
    }
}
