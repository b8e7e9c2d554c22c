//! 통합 테스트 공용 헬퍼: 유닛 디렉토리 작성 + 기록용 Recorder 플러그인

#![allow(dead_code)]

use async_trait::async_trait;
use chatplus_core::{
    Activatable, ConfigUpdatable, LifecycleHooks, Plugin, PluginCatalog, PluginInit, Unloadable,
};
use chatplus_foundation::{Error, Result};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub type Journal = Arc<Mutex<Vec<String>>>;

/// `<dir>/<name>/plugin.json` (+ config.json) 작성
pub fn write_unit(dir: &Path, name: &str, metadata: Value, config: Option<Value>) {
    let unit = dir.join(name);
    std::fs::create_dir_all(&unit).unwrap();
    std::fs::write(unit.join("plugin.json"), serde_json::to_string_pretty(&metadata).unwrap()).unwrap();
    if let Some(config) = config {
        std::fs::write(unit.join("config.json"), serde_json::to_string_pretty(&config).unwrap()).unwrap();
    }
}

/// 의존성/권한만 있는 간단한 유닛
pub fn write_simple_unit(dir: &Path, name: &str, dependencies: &[&str], permissions: &[&str]) {
    write_unit(
        dir,
        name,
        json!({
            "version": "1.0.0",
            "description": format!("{} test plugin", name),
            "dependencies": dependencies,
            "permissions": permissions,
        }),
        None,
    );
}

/// Recorder 동작 설정
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    pub fail_init: bool,
    pub panic_init: bool,
    pub hang_activate: bool,
    pub reject_config: bool,
    pub fail_unload: bool,
    /// 두 번째 이후 인스턴스의 init을 800ms 지연 (리로드 도중 상태 확인용)
    pub slow_reinit: bool,
}

/// 모든 라이프사이클 호출을 journal에 `name:stage`로 남기는 플러그인
pub struct Recorder {
    name: String,
    journal: Journal,
    faults: Faults,
}

impl Recorder {
    fn note(&self, stage: &str) {
        self.journal.lock().push(format!("{}:{}", self.name, stage));
    }

    fn has_noted(&self, stage: &str) -> bool {
        let entry = format!("{}:{}", self.name, stage);
        self.journal.lock().iter().any(|e| *e == entry)
    }
}

#[async_trait]
impl Plugin for Recorder {
    async fn init(&self) -> Result<()> {
        if self.faults.panic_init {
            panic!("recorder init panic");
        }
        if self.faults.fail_init {
            return Err(Error::Internal("recorder init failure".into()));
        }
        if self.faults.slow_reinit && self.has_noted("init") {
            tokio::time::sleep(Duration::from_millis(800)).await;
        }
        self.note("init");
        Ok(())
    }

    fn activation(&self) -> Option<&dyn Activatable> {
        Some(self)
    }

    fn unloadable(&self) -> Option<&dyn Unloadable> {
        Some(self)
    }

    fn lifecycle_hooks(&self) -> Option<&dyn LifecycleHooks> {
        Some(self)
    }

    fn config_updatable(&self) -> Option<&dyn ConfigUpdatable> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl Activatable for Recorder {
    async fn activate(&self) -> Result<()> {
        if self.faults.hang_activate {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        self.note("activate");
        Ok(())
    }

    async fn deactivate(&self) -> Result<()> {
        self.note("deactivate");
        Ok(())
    }
}

#[async_trait]
impl Unloadable for Recorder {
    async fn unload(&self) -> Result<()> {
        if self.faults.fail_unload {
            return Err(Error::Internal("recorder unload failure".into()));
        }
        self.note("unload");
        Ok(())
    }
}

#[async_trait]
impl LifecycleHooks for Recorder {
    async fn before_init(&self) -> Result<()> {
        self.note("before_init");
        Ok(())
    }

    async fn before_activate(&self) -> Result<()> {
        self.note("before_activate");
        Ok(())
    }

    async fn after_activate(&self) -> Result<()> {
        self.note("after_activate");
        Ok(())
    }
}

#[async_trait]
impl ConfigUpdatable for Recorder {
    async fn on_config_update(&self, _old: &Map<String, Value>, new: &Map<String, Value>) -> Result<()> {
        if self.faults.reject_config {
            return Err(Error::InvalidInput("recorder rejects config".into()));
        }
        self.note(&format!("config={}", Value::Object(new.clone())));
        Ok(())
    }
}

/// entry 이름마다 Recorder 팩토리를 등록
pub fn recorder_catalog(journal: &Journal, entries: &[(&str, Faults)]) -> PluginCatalog {
    let mut catalog = PluginCatalog::new();
    for (entry, faults) in entries {
        let journal = Arc::clone(journal);
        let faults = *faults;
        catalog.register(*entry, move |init: PluginInit| {
            let plugin: Arc<dyn Plugin> = Arc::new(Recorder {
                name: init.name.clone(),
                journal: Arc::clone(&journal),
                faults,
            });
            Ok(plugin)
        });
    }
    catalog
}

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// `name:`으로 시작하는 항목만
pub fn entries_for(journal: &Journal, name: &str) -> Vec<String> {
    let prefix = format!("{}:", name);
    journal
        .lock()
        .iter()
        .filter(|e| e.starts_with(&prefix))
        .cloned()
        .collect()
}

pub fn position(journal: &Journal, entry: &str) -> usize {
    journal
        .lock()
        .iter()
        .position(|e| e == entry)
        .unwrap_or_else(|| panic!("'{}' not in journal", entry))
}
