//! Plugin Catalog - 빌드 타임에 등록되는 플러그인 팩토리
//!
//! 유닛의 `entry`(기본값은 디렉토리 이름)로 팩토리를 찾아 인스턴스를 만듭니다.

use super::builtin;
use super::traits::{Plugin, PluginInit};
use chatplus_foundation::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// 플러그인 팩토리
pub type PluginFactory = Arc<dyn Fn(PluginInit) -> Result<Arc<dyn Plugin>> + Send + Sync>;

/// entry 이름 -> 팩토리
#[derive(Clone, Default)]
pub struct PluginCatalog {
    factories: HashMap<String, PluginFactory>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 내장 플러그인(hello-world, example-permission, mixin-example)이 등록된 카탈로그
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        builtin::register_all(&mut catalog);
        catalog
    }

    /// 팩토리 등록 (같은 이름이 있으면 false)
    pub fn register<F>(&mut self, entry: impl Into<String>, factory: F) -> bool
    where
        F: Fn(PluginInit) -> Result<Arc<dyn Plugin>> + Send + Sync + 'static,
    {
        let entry = entry.into();
        if self.factories.contains_key(&entry) {
            warn!(entry = %entry, "Plugin factory is already registered");
            return false;
        }

        debug!(entry = %entry, "Registered plugin factory");
        self.factories.insert(entry, Arc::new(factory));
        true
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.factories.contains_key(entry)
    }

    /// 등록된 entry 이름 (정렬)
    pub fn entries(&self) -> Vec<String> {
        let mut entries: Vec<String> = self.factories.keys().cloned().collect();
        entries.sort();
        entries
    }

    /// 인스턴스 생성
    pub fn instantiate(&self, entry: &str, init: PluginInit) -> Result<Arc<dyn Plugin>> {
        let factory = self
            .factories
            .get(entry)
            .ok_or_else(|| Error::NotFound(format!("no plugin factory named '{}'", entry)))?;
        factory(init)
    }
}

impl std::fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("entries", &self.entries())
            .finish()
    }
}
