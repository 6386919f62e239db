//! # オブジェクトマッパー
//!
//! 内部モデルからレスポンス用 DTO への変換を型の組み合わせごとに登録する。
//!
//! - 同じ型同士の変換は登録なしで恒等変換になる
//! - `S -> T` を登録すると `Vec<S> -> Vec<T>` と `Option<S> -> Option<T>` も使える

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::Arc,
};

use crate::error::ServiceError;

type Converter = Arc<dyn Fn(Box<dyn Any>) -> Box<dyn Any> + Send + Sync>;

/// 型の組み合わせごとの変換を保持するマッパー
#[derive(Clone, Default)]
pub struct ObjectMapper {
    converters: HashMap<(TypeId, TypeId), Converter>,
}

impl fmt::Debug for ObjectMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectMapper")
            .field("converters", &self.converters.len())
            .finish()
    }
}

impl ObjectMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// `S -> T` の変換を登録する
    pub fn register<S, T>(&mut self, convert: impl Fn(S) -> T + Send + Sync + 'static) -> &mut Self
    where
        S: 'static,
        T: 'static,
    {
        let convert = Arc::new(convert);

        let single = Arc::clone(&convert);
        self.insert::<S, T>(move |source| single(source));

        let many = Arc::clone(&convert);
        self.insert::<Vec<S>, Vec<T>>(move |source| source.into_iter().map(|s| many(s)).collect());

        let optional = convert;
        self.insert::<Option<S>, Option<T>>(move |source| source.map(|s| optional(s)));

        self
    }

    /// `From` 実装を変換として登録する
    pub fn register_from<S, T>(&mut self) -> &mut Self
    where
        S: 'static,
        T: From<S> + 'static,
    {
        self.register::<S, T>(T::from)
    }

    fn insert<S: 'static, T: 'static>(&mut self, convert: impl Fn(S) -> T + Send + Sync + 'static) {
        let converter: Converter = Arc::new(move |source: Box<dyn Any>| {
            match source.downcast::<S>() {
                Ok(source) => Box::new(convert(*source)) as Box<dyn Any>,
                // キーの TypeId が一致するため到達しない
                Err(other) => other,
            }
        });
        self.converters
            .insert((TypeId::of::<S>(), TypeId::of::<T>()), converter);
    }

    pub fn can_map<S: 'static, T: 'static>(&self) -> bool {
        TypeId::of::<S>() == TypeId::of::<T>()
            || self
                .converters
                .contains_key(&(TypeId::of::<S>(), TypeId::of::<T>()))
    }

    /// `S` を `T` に変換する
    ///
    /// # Errors
    ///
    /// 変換が登録されていない場合は [`ServiceError::MappingNotRegistered`]
    pub fn map<S: 'static, T: 'static>(&self, source: S) -> Result<T, ServiceError> {
        let source: Box<dyn Any> = Box::new(source);

        let target = if TypeId::of::<S>() == TypeId::of::<T>() {
            source
        } else {
            let converter = self
                .converters
                .get(&(TypeId::of::<S>(), TypeId::of::<T>()))
                .ok_or_else(Self::not_registered::<S, T>)?;
            converter(source)
        };

        target
            .downcast::<T>()
            .map(|target| *target)
            .map_err(|_| Self::not_registered::<S, T>())
    }

    /// 要素ごとに `S` を `T` に変換する
    pub fn map_many<S: 'static, T: 'static>(
        &self,
        sources: impl IntoIterator<Item = S>,
    ) -> Result<Vec<T>, ServiceError> {
        sources.into_iter().map(|source| self.map(source)).collect()
    }

    fn not_registered<S, T>() -> ServiceError {
        ServiceError::MappingNotRegistered {
            from: std::any::type_name::<S>(),
            to:   std::any::type_name::<T>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id:   u32,
        name: String,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct ItemDto {
        name: String,
    }

    impl From<Item> for ItemDto {
        fn from(item: Item) -> Self {
            Self { name: item.name }
        }
    }

    fn item(id: u32, name: &str) -> Item {
        Item {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_同じ型は登録なしで恒等変換される() {
        let mapper = ObjectMapper::new();

        let mapped: Item = mapper.map(item(1, "a")).unwrap();

        assert_eq!(mapped, item(1, "a"));
    }

    #[test]
    fn test_登録した変換が使われる() {
        let mut mapper = ObjectMapper::new();
        mapper.register(|item: Item| format!("{}:{}", item.id, item.name));

        let mapped: String = mapper.map(item(7, "x")).unwrap();

        assert_eq!(mapped, "7:x");
    }

    #[test]
    fn test_登録するとvecとoptionも変換できる() {
        let mut mapper = ObjectMapper::new();
        mapper.register_from::<Item, ItemDto>();

        let many: Vec<ItemDto> = mapper.map(vec![item(1, "a"), item(2, "b")]).unwrap();
        let some: Option<ItemDto> = mapper.map(Some(item(3, "c"))).unwrap();
        let none: Option<ItemDto> = mapper.map(None::<Item>).unwrap();

        assert_eq!(
            many,
            vec![ItemDto { name: "a".into() }, ItemDto { name: "b".into() }]
        );
        assert_eq!(some, Some(ItemDto { name: "c".into() }));
        assert_eq!(none, None);
    }

    #[test]
    fn test_未登録の変換はエラー() {
        let mapper = ObjectMapper::new();

        let error = mapper.map::<Item, ItemDto>(item(1, "a")).unwrap_err();

        assert!(matches!(error, ServiceError::MappingNotRegistered { .. }));
        assert!(!mapper.can_map::<Item, ItemDto>());
        assert!(mapper.can_map::<Item, Item>());
    }

    #[test]
    fn test_map_manyは要素ごとに変換する() {
        let mut mapper = ObjectMapper::new();
        mapper.register_from::<Item, ItemDto>();

        let mapped: Vec<ItemDto> = mapper.map_many([item(1, "a")]).unwrap();

        assert_eq!(mapped, vec![ItemDto { name: "a".into() }]);
    }
}
