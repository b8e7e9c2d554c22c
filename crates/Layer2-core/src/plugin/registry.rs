//! Plugin Registry - 로드된 플러그인 저장소

use super::manifest::PluginMetadata;
use super::traits::{Plugin, PluginState};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// 로드된 플러그인 레코드
#[derive(Clone)]
pub struct PluginRecord {
    /// 플러그인 이름 (유닛 디렉토리 이름)
    pub name: String,

    /// 플러그인 인스턴스
    pub instance: Arc<dyn Plugin>,

    /// plugin.json
    pub metadata: PluginMetadata,

    /// 현재 설정 (핫 업데이트로 바뀔 수 있음)
    pub config: Map<String, Value>,

    /// 현재 상태
    pub state: PluginState,

    /// 로드 순서
    pub load_order: usize,

    /// 유닛 디렉토리 (핫 리로드 감시 대상)
    pub path: PathBuf,

    pub loaded_at: DateTime<Utc>,
}

impl std::fmt::Debug for PluginRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRecord")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("load_order", &self.load_order)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// 레코드 생성에 필요한 값
pub struct NewRecord {
    pub name: String,
    pub instance: Arc<dyn Plugin>,
    pub metadata: PluginMetadata,
    pub config: Map<String, Value>,
    pub path: PathBuf,
}

/// 플러그인 레지스트리 - 로드된 모든 플러그인 관리
pub struct PluginRegistry {
    /// 플러그인 저장소 (이름 -> PluginRecord)
    plugins: RwLock<HashMap<String, PluginRecord>>,

    /// 로드 카운터
    load_counter: RwLock<usize>,
}

impl PluginRegistry {
    /// 새 레지스트리 생성
    pub fn new() -> Self {
        Self {
            plugins: RwLock::new(HashMap::new()),
            load_counter: RwLock::new(0),
        }
    }

    /// 레코드 추가 (`Loaded` 상태), 이미 있으면 false
    pub async fn insert(&self, record: NewRecord) -> bool {
        let mut plugins = self.plugins.write().await;

        if plugins.contains_key(&record.name) {
            warn!(plugin = %record.name, "Plugin is already registered");
            return false;
        }

        let mut counter = self.load_counter.write().await;
        let load_order = *counter;
        *counter += 1;

        info!(plugin = %record.name, version = %record.metadata.version, load_order, "Registered plugin");
        plugins.insert(
            record.name.clone(),
            PluginRecord {
                name: record.name,
                instance: record.instance,
                metadata: record.metadata,
                config: record.config,
                state: PluginState::Loaded,
                load_order,
                path: record.path,
                loaded_at: Utc::now(),
            },
        );
        true
    }

    /// 레코드 제거
    pub async fn remove(&self, name: &str) -> Option<PluginRecord> {
        let removed = self.plugins.write().await.remove(name);
        if removed.is_some() {
            debug!(plugin = %name, "Removed plugin record");
        }
        removed
    }

    /// 레코드 복사본
    pub async fn record(&self, name: &str) -> Option<PluginRecord> {
        self.plugins.read().await.get(name).cloned()
    }

    /// 플러그인 인스턴스 조회
    pub async fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        let plugins = self.plugins.read().await;
        plugins.get(name).map(|record| Arc::clone(&record.instance))
    }

    /// 플러그인 상태 조회
    pub async fn state(&self, name: &str) -> Option<PluginState> {
        let plugins = self.plugins.read().await;
        plugins.get(name).map(|record| record.state)
    }

    /// 플러그인 상태 설정
    pub async fn set_state(&self, name: &str, state: PluginState) -> bool {
        let mut plugins = self.plugins.write().await;
        if let Some(record) = plugins.get_mut(name) {
            record.state = state;
            debug!(plugin = %name, state = %state, "Set plugin state");
            true
        } else {
            false
        }
    }

    pub async fn config(&self, name: &str) -> Option<Map<String, Value>> {
        let plugins = self.plugins.read().await;
        plugins.get(name).map(|record| record.config.clone())
    }

    pub async fn set_config(&self, name: &str, config: Map<String, Value>) -> bool {
        let mut plugins = self.plugins.write().await;
        if let Some(record) = plugins.get_mut(name) {
            record.config = config;
            true
        } else {
            false
        }
    }

    /// 로드 순서대로 모든 레코드
    pub async fn records_in_load_order(&self) -> Vec<PluginRecord> {
        let plugins = self.plugins.read().await;
        let mut records: Vec<PluginRecord> = plugins.values().cloned().collect();
        records.sort_by_key(|record| record.load_order);
        records
    }

    /// 로드 순서대로 이름
    pub async fn names_in_load_order(&self) -> Vec<String> {
        self.records_in_load_order()
            .await
            .into_iter()
            .map(|record| record.name)
            .collect()
    }

    /// `name`에 의존하는 로드된 플러그인 (정렬)
    pub async fn dependents_of(&self, name: &str) -> Vec<String> {
        let plugins = self.plugins.read().await;
        let mut dependents: Vec<String> = plugins
            .values()
            .filter(|record| record.name != name && record.metadata.dependencies.iter().any(|d| d == name))
            .map(|record| record.name.clone())
            .collect();
        dependents.sort();
        dependents
    }

    /// 활성 상태가 아닌 의존성 목록
    pub async fn inactive_dependencies(&self, name: &str) -> Vec<String> {
        let plugins = self.plugins.read().await;
        let Some(record) = plugins.get(name) else {
            return Vec::new();
        };

        record
            .metadata
            .dependencies
            .iter()
            .filter(|dep| plugins.get(dep.as_str()).map(|r| r.state) != Some(PluginState::Active))
            .cloned()
            .collect()
    }

    /// 플러그인 존재 여부 확인
    pub async fn contains(&self, name: &str) -> bool {
        self.plugins.read().await.contains_key(name)
    }

    /// 플러그인 수
    pub async fn len(&self) -> usize {
        self.plugins.read().await.len()
    }

    /// 비어있는지 확인
    pub async fn is_empty(&self) -> bool {
        self.plugins.read().await.is_empty()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chatplus_foundation::Result;
    use std::any::Any;

    struct Inert;

    #[async_trait]
    impl Plugin for Inert {
        async fn init(&self) -> Result<()> {
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn record(name: &str, deps: &[&str]) -> NewRecord {
        let mut metadata = PluginMetadata::default();
        metadata.dependencies = deps.iter().map(|d| d.to_string()).collect();
        NewRecord {
            name: name.to_string(),
            instance: Arc::new(Inert),
            metadata,
            config: Map::new(),
            path: PathBuf::from(name),
        }
    }

    #[tokio::test]
    async fn test_insert_and_order() {
        let registry = PluginRegistry::new();
        assert!(registry.insert(record("b", &[])).await);
        assert!(registry.insert(record("a", &["b"])).await);
        assert!(!registry.insert(record("a", &[])).await);

        assert_eq!(registry.names_in_load_order().await, vec!["b", "a"]);
        assert_eq!(registry.record("b").await.unwrap().load_order, 0);
        assert_eq!(registry.record("a").await.unwrap().load_order, 1);
        assert_eq!(registry.state("a").await, Some(PluginState::Loaded));
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_dependency_queries() {
        let registry = PluginRegistry::new();
        registry.insert(record("base", &[])).await;
        registry.insert(record("top", &["base"])).await;

        assert_eq!(registry.dependents_of("base").await, vec!["top"]);
        assert_eq!(registry.inactive_dependencies("top").await, vec!["base"]);

        registry.set_state("base", PluginState::Active).await;
        assert!(registry.inactive_dependencies("top").await.is_empty());

        registry.remove("top").await;
        assert!(registry.dependents_of("base").await.is_empty());
    }
}
