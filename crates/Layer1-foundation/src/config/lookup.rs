//! ConfigLookup - 점(.) 경로 기반 설정 조회

use serde_json::Value;
use std::sync::Arc;

/// 플러그인에 주입되는 설정 조회 capability
///
/// `strings.success.permissionCheckPassed` 같은 점 경로로 설정 트리를 조회합니다.
/// 내부 트리는 공유되며 읽기 전용입니다.
#[derive(Debug, Clone)]
pub struct ConfigLookup {
    root: Arc<Value>,
}

impl ConfigLookup {
    pub fn new(root: Value) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    /// 빈 설정
    pub fn empty() -> Self {
        Self::new(Value::Object(Default::default()))
    }

    /// 점 경로로 값 조회
    pub fn get(&self, key: &str) -> Option<&Value> {
        if key.is_empty() {
            return Some(&self.root);
        }

        key.split('.').try_fold(self.root.as_ref(), |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// 문자열 값 조회
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// 문자열 값 조회, 없으면 키 자체를 반환
    pub fn get_str_or_key<'a>(&'a self, key: &'a str) -> &'a str {
        self.get_str(key).unwrap_or(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_u64)
    }
}

impl Default for ConfigLookup {
    fn default() -> Self {
        Self::empty()
    }
}
