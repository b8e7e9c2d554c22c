//! Hook Registry - 이름 붙은 확장 지점

use super::types::{HookArgs, HookHandler, HookId, HookOptions, HookReport};
use chatplus_foundation::panic_message;
use futures::FutureExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, warn};

#[derive(Clone)]
struct HookEntry {
    id: HookId,
    handler: HookHandler,
    options: HookOptions,
}

/// Hook 레지스트리
///
/// 핸들러는 우선순위 오름차순(동률이면 등록 순서)으로 순차 실행됩니다.
/// 하나가 실패해도 나머지는 실행됩니다.
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<String, Vec<HookEntry>>>,
    counter: AtomicU64,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 핸들러 등록
    pub fn register_hook(
        &self,
        name: impl Into<String>,
        handler: HookHandler,
        options: HookOptions,
    ) -> HookId {
        let name = name.into();
        let id = HookId(self.counter.fetch_add(1, Ordering::SeqCst));

        let mut hooks = self.hooks.write();
        let entries = hooks.entry(name.clone()).or_default();
        entries.push(HookEntry {
            id,
            handler,
            options,
        });
        entries.sort_by_key(|e| e.options.priority);

        debug!(hook = %name, hook_id = %id, priority = options.priority, "Registered hook handler");
        id
    }

    /// 핸들러 해제
    ///
    /// `id`가 없으면 해당 hook의 모든 핸들러를 지웁니다. 지운 수를 반환합니다.
    pub fn remove_hook(&self, name: &str, id: Option<HookId>) -> usize {
        let mut hooks = self.hooks.write();
        let Some(entries) = hooks.get_mut(name) else {
            return 0;
        };

        let before = entries.len();
        match id {
            Some(id) => entries.retain(|e| e.id != id),
            None => entries.clear(),
        }
        let removed = before - entries.len();

        if entries.is_empty() {
            hooks.remove(name);
        }

        debug!(hook = %name, removed, "Removed hook handlers");
        removed
    }

    /// hook 실행
    pub async fn trigger(&self, name: &str, args: HookArgs) -> HookReport {
        let entries = match self.hooks.read().get(name) {
            Some(entries) => entries.clone(),
            None => return HookReport::default(),
        };

        let mut report = HookReport::default();
        for entry in entries {
            report.executed += 1;
            if let Err(reason) = Self::run(name, &entry, &args).await {
                report.failed += 1;
                warn!(hook = %name, hook_id = %entry.id, reason = %reason, "Hook handler failed");
            }
        }

        report
    }

    async fn run(name: &str, entry: &HookEntry, args: &HookArgs) -> Result<(), String> {
        match &entry.handler {
            HookHandler::Sync(f) => match std::panic::catch_unwind(AssertUnwindSafe(|| f(args))) {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(panic) => Err(format!("panicked: {}", panic_message(panic.as_ref()))),
            },
            HookHandler::Async(f) if entry.options.is_async => {
                match AssertUnwindSafe(f(args.clone())).catch_unwind().await {
                    Ok(result) => result.map_err(|e| e.to_string()),
                    Err(panic) => Err(format!("panicked: {}", panic_message(panic.as_ref()))),
                }
            }
            HookHandler::Async(f) => {
                // 기다리지 않는 비동기 핸들러: 결과는 로그로만 남김
                let fut = f(args.clone());
                let hook = name.to_string();
                let id = entry.id;
                tokio::spawn(async move {
                    match AssertUnwindSafe(fut).catch_unwind().await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            warn!(hook = %hook, hook_id = %id, error = %e, "Detached hook handler failed")
                        }
                        Err(panic) => error!(
                            hook = %hook,
                            hook_id = %id,
                            panic = %panic_message(panic.as_ref()),
                            "Detached hook handler panicked"
                        ),
                    }
                });
                Ok(())
            }
        }
    }

    // ========================================================================
    // 조회
    // ========================================================================

    pub fn hook_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.hooks.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn handler_count(&self, name: &str) -> usize {
        self.hooks.read().get(name).map(Vec::len).unwrap_or(0)
    }
}
