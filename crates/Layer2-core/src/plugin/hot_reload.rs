//! Hot Reload - 유닛 디렉토리 감시와 자동 리로드
//!
//! `notify` 콜백은 감시 스레드에서 불리므로 이름만 채널로 넘기고, 실제 리로드는
//! 단일 tokio 워커가 디바운스 후 순차적으로 수행합니다.
//!
//! ```text
//! notify thread ──(plugin name)──► mpsc ──► worker: debounce ─► dedup ─► reload(name)
//! ```

use super::manager::PluginManager;
use chatplus_foundation::{Error, Result};
use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct Worker {
    sender: UnboundedSender<String>,
    handle: JoinHandle<()>,
}

/// 플러그인별 파일 감시 상태
#[derive(Default)]
pub(crate) struct HotReloader {
    watchers: Mutex<HashMap<String, RecommendedWatcher>>,
    worker: Mutex<Option<Worker>>,
}

impl HotReloader {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_watching(&self, name: &str) -> bool {
        self.watchers.lock().contains_key(name)
    }

    pub(crate) fn watched(&self) -> Vec<String> {
        let mut names: Vec<String> = self.watchers.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// 감시 중지, 감시 중이었으면 true
    pub(crate) fn unwatch(&self, name: &str) -> bool {
        let removed = self.watchers.lock().remove(name).is_some();
        if removed {
            info!(plugin = %name, "Stopped watching plugin");
        }
        removed
    }

    /// 모든 감시 해제
    ///
    /// 워커는 중단하지 않습니다. watcher와 송신자를 버리면 채널이 닫히고,
    /// 진행 중인 리로드를 끝낸 뒤 워커가 스스로 종료합니다.
    fn unwatch_all(&self) -> usize {
        let removed = std::mem::take(&mut *self.watchers.lock()).len();
        drop(self.worker.lock().take());
        removed
    }

    fn watch(&self, name: &str, path: &Path, sender: UnboundedSender<String>) -> Result<()> {
        let plugin = name.to_string();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
            Ok(event) if triggers_reload(&event.kind) => {
                debug!(plugin = %plugin, paths = ?event.paths, "Plugin file changed");
                let _ = sender.send(plugin.clone());
            }
            Ok(_) => {}
            Err(e) => warn!(plugin = %plugin, error = %e, "Plugin watcher error"),
        })?;
        watcher.watch(path, RecursiveMode::Recursive)?;

        // 이미 감시 중이면 교체 (이전 watcher는 drop 시 닫힘)
        self.watchers.lock().insert(name.to_string(), watcher);
        info!(plugin = %name, path = %path.display(), "Watching plugin");
        Ok(())
    }
}

impl Drop for HotReloader {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            worker.handle.abort();
        }
    }
}

/// 내용 변경/생성만 리로드 대상 (접근, 메타데이터 변경은 무시)
fn triggers_reload(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

async fn reload_worker(
    manager: Weak<PluginManager>,
    mut receiver: UnboundedReceiver<String>,
    debounce: Duration,
) {
    while let Some(first) = receiver.recv().await {
        tokio::time::sleep(debounce).await;

        let mut pending = vec![first];
        while let Ok(name) = receiver.try_recv() {
            if !pending.contains(&name) {
                pending.push(name);
            }
        }

        let Some(manager) = manager.upgrade() else {
            break;
        };

        for name in pending {
            // 디바운스 동안 감시가 꺼졌으면 건너뜀
            if !manager.is_watching(&name) {
                continue;
            }
            info!(plugin = %name, "Reloading plugin after file change");
            manager.reload(&name).await;
        }
    }

    debug!("Hot reload worker stopped");
}

// ============================================================================
// PluginManager API
// ============================================================================

impl PluginManager {
    /// 핫 리로드 활성화
    ///
    /// `name`이 없으면 현재 로드된 모든 플러그인을 감시합니다. 감시를 시작한
    /// 플러그인 수를 반환합니다.
    pub async fn enable_hot_reload(self: &Arc<Self>, name: Option<&str>) -> Result<usize> {
        let names = match name {
            Some(name) => {
                if !self.is_loaded(name).await {
                    return Err(Error::NotFound(format!("plugin '{}' is not loaded", name)));
                }
                vec![name.to_string()]
            }
            None => self.names().await,
        };

        let sender = self.reload_sender();
        let mut watching = 0;
        for name in names {
            let path = self.discovery().unit_path(&name);
            match self.hot_reload.watch(&name, &path, sender.clone()) {
                Ok(()) => watching += 1,
                Err(e) => warn!(plugin = %name, error = %e, "Failed to watch plugin"),
            }
        }

        info!(watching, "Hot reload enabled");
        Ok(watching)
    }

    /// 핫 리로드 비활성화 (`name`이 없으면 전부), 중지한 감시 수 반환
    pub fn disable_hot_reload(&self, name: Option<&str>) -> usize {
        match name {
            Some(name) => usize::from(self.hot_reload.unwatch(name)),
            None => {
                let removed = self.hot_reload.unwatch_all();
                info!(removed, "Hot reload disabled for all plugins");
                removed
            }
        }
    }

    pub fn is_watching(&self, name: &str) -> bool {
        self.hot_reload.is_watching(name)
    }

    /// 감시 중인 플러그인 이름 (정렬)
    pub fn watched_plugins(&self) -> Vec<String> {
        self.hot_reload.watched()
    }

    fn reload_sender(self: &Arc<Self>) -> UnboundedSender<String> {
        let mut worker = self.hot_reload.worker.lock();
        if let Some(existing) = worker.as_ref() {
            if !existing.handle.is_finished() {
                return existing.sender.clone();
            }
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(reload_worker(
            Arc::downgrade(self),
            receiver,
            self.config().hot_reload_debounce,
        ));
        *worker = Some(Worker {
            sender: sender.clone(),
            handle,
        });
        sender
    }
}
