//! # 共有キー生成
//!
//! 共有セッション（=オブジェクト）を識別する不透明なキー。
//! UUID v4（122ビットの乱数）なので衝突確率は無視できる。

use std::fmt;

/// 共有セッションを識別する不透明なキー。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShareKey(String);

impl ShareKey {
    /// 新しいキーを生成する。
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// 直接アップロード時の保存先キー（`{key}{suffix}`）。
    pub fn object_key(&self, suffix: &str) -> String {
        format!("{}{}", self.0, suffix)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for ShareKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ShareKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
