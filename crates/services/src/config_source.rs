//! # 設定ソース
//!
//! `Section:Key` 形式のフラットなキーで文字列値を引く設定ストア。
//!
//! ## 実装
//!
//! | 型 | 用途 |
//! |----|------|
//! | [`MemoryConfig`] | テスト・プログラムからの直接指定 |
//! | [`EnvConfig`] | 環境変数（`Section:Key` → `Section__Key`） |
//! | [`FileConfig`] | JSON / TOML / YAML ファイル（`config` クレート） |
//! | [`LayeredConfig`] | 複数ソースの重ね合わせ（後から追加した層が優先） |

use std::{collections::HashMap, path::Path, sync::Arc};

/// フラットなキーで文字列値を引く設定ストア
pub trait ConfigSource: Send + Sync {
    /// キーに対応する値を返す
    fn get(&self, key: &str) -> Option<String>;

    /// キーに対応する値を返す。空文字列は `None` として扱う
    fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get(key).filter(|value| !value.is_empty())
    }

    /// キーが存在するか（値が空文字列でも `true`）
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for &T {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for Box<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

/// メモリ上の設定
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryConfig {
    values: HashMap<String, String>,
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemoryConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl ConfigSource for MemoryConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// 環境変数を読む設定ソース
///
/// `Cors:PolicyName` は `Cors__PolicyName`（接頭辞があれば `{prefix}Cors__PolicyName`）
/// として読む。
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    prefix: String,
}

impl EnvConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// 設定キーを環境変数名に変換する
    pub fn variable_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.replace(':', "__"))
    }
}

impl ConfigSource for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(self.variable_name(key)).ok()
    }
}

/// 設定ファイルを読む設定ソース
///
/// `Cors:PolicyName` は `Cors.PolicyName` として引き、見つからなければ
/// 小文字化した `cors.policyname` で引き直す。
#[derive(Debug, Clone)]
pub struct FileConfig {
    inner: config::Config,
}

impl FileConfig {
    /// ファイルを読み込む（拡張子から形式を判定する）
    pub fn load(path: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        let inner = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?;
        Ok(Self { inner })
    }

    /// 文字列から読み込む
    pub fn parse(content: &str, format: config::FileFormat) -> Result<Self, config::ConfigError> {
        let inner = config::Config::builder()
            .add_source(config::File::from_str(content, format))
            .build()?;
        Ok(Self { inner })
    }
}

impl ConfigSource for FileConfig {
    fn get(&self, key: &str) -> Option<String> {
        let path = key.replace(':', ".");
        self.inner
            .get_string(&path)
            .or_else(|_| self.inner.get_string(&path.to_lowercase()))
            .ok()
    }
}

/// 複数の設定ソースを重ねた設定
///
/// 後から追加した層ほど優先される。
#[derive(Default)]
pub struct LayeredConfig {
    layers: Vec<Box<dyn ConfigSource>>,
}

impl LayeredConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, layer: impl ConfigSource + 'static) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl std::fmt::Debug for LayeredConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredConfig")
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl ConfigSource for LayeredConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.layers.iter().rev().find_map(|layer| layer.get(key))
    }
}
