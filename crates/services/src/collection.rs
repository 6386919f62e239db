//! # 空コレクションの判定
//!
//! 値がシーケンスまたはマップとしてシリアライズされ、要素を持たないかを調べる。
//! 要素そのものはシリアライズしない。最初の要素が見つかった時点で打ち切る。
//!
//! | 値 | 判定 |
//! |----|------|
//! | 空の `Vec` / スライス / `HashSet` / `BTreeSet` | 空 |
//! | 空の `HashMap` / `BTreeMap` | 空 |
//! | 要素のあるコレクション | 空でない |
//! | 構造体・スカラー・`None` | コレクションでない |
//!
//! newtype 構造体は中身で判定する。

use std::fmt;

use serde::{
    Serialize,
    ser::{self, Impossible, Serializer},
};

/// 空のシーケンス・マップか
pub(crate) fn is_empty_collection<T: Serialize + ?Sized>(value: &T) -> bool {
    value.serialize(EmptyCollection).is_ok()
}

/// 空のコレクションでないことを表す中断理由
#[derive(Debug)]
struct NotEmpty;

impl fmt::Display for NotEmpty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("空のコレクションではありません")
    }
}

impl std::error::Error for NotEmpty {}

impl ser::Error for NotEmpty {
    fn custom<T: fmt::Display>(_msg: T) -> Self {
        Self
    }
}

/// 空のシーケンス・マップのときだけ成功するシリアライザ
struct EmptyCollection;

type Rejected = Impossible<(), NotEmpty>;

macro_rules! not_a_collection {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method(self, _value: $ty) -> Result<(), NotEmpty> {
                Err(NotEmpty)
            }
        )*
    };
}

impl Serializer for EmptyCollection {
    type Ok = ();
    type Error = NotEmpty;
    type SerializeSeq = Self;
    type SerializeTuple = Rejected;
    type SerializeTupleStruct = Rejected;
    type SerializeTupleVariant = Rejected;
    type SerializeMap = Self;
    type SerializeStruct = Rejected;
    type SerializeStructVariant = Rejected;

    not_a_collection! {
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_f32(f32),
        serialize_f64(f64),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8]),
        serialize_unit_struct(&'static str),
    }

    fn serialize_none(self) -> Result<(), NotEmpty> {
        Err(NotEmpty)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, _value: &T) -> Result<(), NotEmpty> {
        Err(NotEmpty)
    }

    fn serialize_unit(self) -> Result<(), NotEmpty> {
        Err(NotEmpty)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<(), NotEmpty> {
        Err(NotEmpty)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), NotEmpty> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<(), NotEmpty> {
        Err(NotEmpty)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self, NotEmpty> {
        match len {
            Some(len) if len > 0 => Err(NotEmpty),
            _ => Ok(self),
        }
    }

    fn serialize_tuple(self, _len: usize) -> Result<Rejected, NotEmpty> {
        Err(NotEmpty)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Rejected, NotEmpty> {
        Err(NotEmpty)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Rejected, NotEmpty> {
        Err(NotEmpty)
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self, NotEmpty> {
        match len {
            Some(len) if len > 0 => Err(NotEmpty),
            _ => Ok(self),
        }
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Rejected, NotEmpty> {
        Err(NotEmpty)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Rejected, NotEmpty> {
        Err(NotEmpty)
    }
}

impl ser::SerializeSeq for EmptyCollection {
    type Ok = ();
    type Error = NotEmpty;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, _value: &T) -> Result<(), NotEmpty> {
        Err(NotEmpty)
    }

    fn end(self) -> Result<(), NotEmpty> {
        Ok(())
    }
}

impl ser::SerializeMap for EmptyCollection {
    type Ok = ();
    type Error = NotEmpty;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, _key: &T) -> Result<(), NotEmpty> {
        Err(NotEmpty)
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, _value: &T) -> Result<(), NotEmpty> {
        Err(NotEmpty)
    }

    fn end(self) -> Result<(), NotEmpty> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

    use rstest::rstest;
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Item {
        id: u32,
    }

    #[derive(Serialize)]
    struct Items(Vec<Item>);

    #[test]
    fn test_空のコレクションは空と判定する() {
        assert!(is_empty_collection(&Vec::<Item>::new()));
        assert!(is_empty_collection::<[Item]>(&[]));
        assert!(is_empty_collection(&HashSet::<u32>::new()));
        assert!(is_empty_collection(&BTreeSet::<u32>::new()));
        assert!(is_empty_collection(&HashMap::<String, u32>::new()));
        assert!(is_empty_collection(&BTreeMap::<String, u32>::new()));
    }

    #[test]
    fn test_要素のあるコレクションは空でない() {
        assert!(!is_empty_collection(&vec![Item { id: 1 }]));
        assert!(!is_empty_collection(&BTreeMap::from([("a".to_string(), 1)])));
        assert!(!is_empty_collection(&HashSet::from([1])));
    }

    #[rstest]
    #[case::構造体(serde_json::json!({"id": 1}))]
    #[case::数値(serde_json::json!(0))]
    #[case::文字列(serde_json::json!(""))]
    #[case::null(serde_json::Value::Null)]
    fn test_コレクションでない値は空と判定しない(#[case] value: serde_json::Value) {
        assert!(!is_empty_collection(&value));
    }

    #[test]
    fn test_構造体とoptionはコレクションでない() {
        assert!(!is_empty_collection(&Item { id: 1 }));
        assert!(!is_empty_collection(&None::<Vec<Item>>));
        assert!(!is_empty_collection(&()));
    }

    #[test]
    fn test_newtype構造体は中身で判定する() {
        assert!(is_empty_collection(&Items(Vec::new())));
        assert!(!is_empty_collection(&Items(vec![Item { id: 1 }])));
    }
}
