//! Plugin Manager - 플러그인 라이프사이클 관리
//!
//! ## 상태 전이
//!
//! ```text
//!   (없음) ──load──► Loaded ──activate──► Active ──deactivate──► Inactive
//!                       │                   ▲                        │
//!                       │                   └────────activate────────┘
//!                       └──────────────unload (어느 상태에서든)────────► (없음)
//! ```
//!
//! - 의존성은 depth-first로 먼저 로드되고, 순환은 `DependencyCycle`로 거부
//! - activate 전제 조건: 모든 의존성 Active, 선언된 권한 전부 승인
//! - 같은 이름에 대한 전이는 이름별 락으로 직렬화
//! - 플러그인 코드 호출은 패닉을 잡고, 설정된 경우 타임아웃을 적용

use super::catalog::PluginCatalog;
use super::discovery::{PluginDiscovery, PluginUnit};
use super::events::{
    lifecycle_event, PLUGIN_ACTIVATED, PLUGIN_DEACTIVATED, PLUGIN_LOADED, PLUGIN_RELOADED,
    PLUGIN_UNLOADED,
};
use super::hot_reload::HotReloader;
use super::permission::PermissionStore;
use super::registry::{NewRecord, PluginRegistry};
use super::traits::{Plugin, PluginCapability, PluginInit, PluginState};
use crate::hook::HookRegistry;
use crate::mixin::MixinRegistry;
use chatplus_foundation::{
    panic_message, ConfigLookup, Error, EventBus, PluginLogger, Result, RuntimeConfig,
};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

// ============================================================================
// 설정 / 결과 타입
// ============================================================================

/// 플러그인 매니저 설정
#[derive(Debug, Clone)]
pub struct PluginManagerConfig {
    /// 플러그인 유닛 디렉토리
    pub plugin_dir: PathBuf,

    /// 플러그인 코드 호출 타임아웃 (없으면 무제한)
    pub transition_timeout: Option<Duration>,

    /// 핫 리로드 디바운스
    pub hot_reload_debounce: Duration,

    /// 사전 승인 권한
    pub grants: HashMap<String, Vec<String>>,
}

impl Default for PluginManagerConfig {
    fn default() -> Self {
        Self {
            plugin_dir: PathBuf::from("plugins"),
            transition_timeout: None,
            hot_reload_debounce: Duration::from_millis(200),
            grants: HashMap::new(),
        }
    }
}

impl PluginManagerConfig {
    pub fn new(plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
            ..Default::default()
        }
    }

    /// 런타임 설정에서 생성
    pub fn from_runtime(runtime: &RuntimeConfig) -> Self {
        Self {
            plugin_dir: runtime.plugin_dir.clone(),
            transition_timeout: runtime.transition_timeout(),
            hot_reload_debounce: runtime.hot_reload_debounce(),
            grants: runtime.grants.clone(),
        }
    }

    pub fn with_transition_timeout(mut self, timeout: Duration) -> Self {
        self.transition_timeout = Some(timeout);
        self
    }

    pub fn with_hot_reload_debounce(mut self, debounce: Duration) -> Self {
        self.hot_reload_debounce = debounce;
        self
    }
}

/// 일괄 작업 중 실패한 항목
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub name: String,
    pub reason: String,
}

/// 일괄 작업 결과
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    fn record(&mut self, name: &str, result: Result<()>) {
        self.attempted += 1;
        match result {
            Ok(()) => self.succeeded += 1,
            Err(e) => self.failures.push(BatchFailure {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 플러그인 요약 정보 (조회/관리 명령용)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub state: PluginState,
    pub load_order: usize,
    pub dependencies: Vec<String>,
    pub dependents: Vec<String>,
    pub permissions: Vec<String>,
    pub granted_permissions: Vec<String>,
    pub missing_permissions: Vec<String>,
    pub capabilities: Vec<PluginCapability>,
    pub config: Map<String, Value>,
    pub path: PathBuf,
    pub loaded_at: DateTime<Utc>,
}

// ============================================================================
// PluginManager
// ============================================================================

/// 플러그인 매니저 - 전체 플러그인 시스템 관리
pub struct PluginManager {
    /// 설정
    config: PluginManagerConfig,

    /// 유닛 디렉토리 스캐너
    discovery: PluginDiscovery,

    /// entry -> 팩토리
    catalog: PluginCatalog,

    /// 로드된 플러그인
    registry: PluginRegistry,

    /// 승인된 권한
    permissions: PermissionStore,

    /// 플러그인에 주입되는 capability
    event_bus: Arc<EventBus>,
    mixins: Arc<MixinRegistry>,
    hooks: Arc<HookRegistry>,
    config_lookup: ConfigLookup,

    /// 이름별 전이 락
    transition_locks: parking_lot::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,

    /// 이름별 리로드 락
    reload_locks: parking_lot::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,

    /// 파일 감시
    pub(super) hot_reload: HotReloader,
}

impl PluginManager {
    /// 새 매니저 생성
    pub fn new(config: PluginManagerConfig, catalog: PluginCatalog) -> Self {
        let permissions = PermissionStore::new();
        for (name, perms) in &config.grants {
            permissions.grant(name, perms.iter().cloned());
        }

        Self {
            discovery: PluginDiscovery::new(&config.plugin_dir),
            catalog,
            registry: PluginRegistry::new(),
            permissions,
            event_bus: Arc::new(EventBus::new()),
            mixins: Arc::new(MixinRegistry::new()),
            hooks: Arc::new(HookRegistry::new()),
            config_lookup: ConfigLookup::empty(),
            transition_locks: parking_lot::Mutex::new(HashMap::new()),
            reload_locks: parking_lot::Mutex::new(HashMap::new()),
            hot_reload: HotReloader::new(),
            config,
        }
    }

    /// 런타임 설정으로 생성 (`settings`는 ConfigLookup으로 노출)
    pub fn from_runtime(runtime: &RuntimeConfig, catalog: PluginCatalog) -> Self {
        Self::new(PluginManagerConfig::from_runtime(runtime), catalog)
            .with_config_lookup(ConfigLookup::new(runtime.settings.clone()))
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn with_mixins(mut self, mixins: Arc<MixinRegistry>) -> Self {
        self.mixins = mixins;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<HookRegistry>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_config_lookup(mut self, lookup: ConfigLookup) -> Self {
        self.config_lookup = lookup;
        self
    }

    // ========================================================================
    // 접근자
    // ========================================================================

    pub fn config(&self) -> &PluginManagerConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn mixins(&self) -> &Arc<MixinRegistry> {
        &self.mixins
    }

    pub fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    pub fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }

    pub fn discovery(&self) -> &PluginDiscovery {
        &self.discovery
    }

    // ========================================================================
    // 로드
    // ========================================================================

    /// 플러그인 로드 (의존성 먼저)
    pub async fn load(&self, name: &str) -> bool {
        Self::report("load", name, self.try_load(name).await)
    }

    pub async fn try_load(&self, name: &str) -> Result<()> {
        let mut stack = Vec::new();
        self.load_recursive(name.to_string(), &mut stack).await
    }

    fn load_recursive<'a>(&'a self, name: String, stack: &'a mut Vec<String>) -> BoxFuture<'a, Result<()>> {
        async move {
            if let Some(pos) = stack.iter().position(|n| *n == name) {
                let mut cycle = stack[pos..].to_vec();
                cycle.push(name);
                return Err(Error::DependencyCycle(cycle));
            }

            if self.registry.contains(&name).await {
                debug!(plugin = %name, "Plugin already loaded");
                return Ok(());
            }

            let unit = self.discovery.read_unit(&name).await?;

            stack.push(name.clone());
            let deps = self.load_dependencies(&unit, stack).await;
            stack.pop();
            deps?;

            self.instantiate(unit).await
        }
        .boxed()
    }

    /// `unit`의 의존성을 순서대로 로드 (`stack`에는 `unit`이 이미 들어 있어야 함)
    async fn load_dependencies(&self, unit: &PluginUnit, stack: &mut Vec<String>) -> Result<()> {
        for dep in &unit.metadata.dependencies {
            if let Err(e) = self.load_recursive(dep.clone(), stack).await {
                return Err(match e {
                    Error::DependencyCycle(_) => e,
                    other => Error::dependency(&unit.name, dep, other.to_string()),
                });
            }
        }
        Ok(())
    }

    async fn instantiate(&self, unit: PluginUnit) -> Result<()> {
        let lock = self.transition_lock(&unit.name);
        let _guard = lock.lock().await;
        self.instantiate_locked(unit).await
    }

    async fn instantiate_locked(&self, unit: PluginUnit) -> Result<()> {
        if self.registry.contains(&unit.name).await {
            return Ok(());
        }

        let name = unit.name.clone();
        let entry = unit.metadata.entry_name(&name).to_string();
        if !self.catalog.contains(&entry) {
            return Err(Error::Discovery(format!(
                "plugin '{}' names entry '{}' which is not in the catalog",
                name, entry
            )));
        }

        let init = PluginInit {
            name: name.clone(),
            metadata: unit.metadata.clone(),
            config: unit.config.clone(),
            logger: PluginLogger::new(&name),
            config_lookup: self.config_lookup.clone(),
            event_bus: Arc::clone(&self.event_bus),
            mixins: Arc::clone(&self.mixins),
            hooks: Arc::clone(&self.hooks),
        };

        let instance = match std::panic::catch_unwind(AssertUnwindSafe(|| self.catalog.instantiate(&entry, init))) {
            Ok(Ok(instance)) => instance,
            Ok(Err(e)) => return Err(Error::lifecycle(&name, "construct", e)),
            Err(panic) => {
                return Err(Error::lifecycle(
                    &name,
                    "construct",
                    format!("panicked: {}", panic_message(panic.as_ref())),
                ))
            }
        };

        if let Some(hooks) = instance.lifecycle_hooks() {
            self.guarded(&name, "before_init", hooks.before_init()).await?;
        }
        self.guarded(&name, "init", instance.init()).await?;

        self.registry
            .insert(NewRecord {
                name: name.clone(),
                instance,
                metadata: unit.metadata,
                config: unit.config,
                path: unit.path,
            })
            .await;

        info!(plugin = %name, "Plugin loaded");
        self.event_bus.publish(lifecycle_event(PLUGIN_LOADED, &name)).await;
        Ok(())
    }

    /// 발견된 모든 유닛 로드
    pub async fn load_all(&self) -> BatchReport {
        let mut report = BatchReport::default();
        for name in self.discovery.discover().await {
            let result = self.try_load(&name).await;
            if let Err(e) = &result {
                warn!(plugin = %name, error = %e, "Failed to load plugin");
            }
            report.record(&name, result);
        }

        info!(attempted = report.attempted, succeeded = report.succeeded, "Loaded plugins");
        report
    }

    // ========================================================================
    // 활성화 / 비활성화
    // ========================================================================

    pub async fn activate(&self, name: &str) -> bool {
        Self::report("activate", name, self.try_activate(name).await)
    }

    pub async fn try_activate(&self, name: &str) -> Result<()> {
        let lock = self.transition_lock(name);
        let _guard = lock.lock().await;
        self.activate_locked(name).await
    }

    async fn activate_locked(&self, name: &str) -> Result<()> {
        let record = self.registry.record(name).await.ok_or_else(|| not_loaded(name))?;

        if record.state == PluginState::Active {
            debug!(plugin = %name, "Plugin already active");
            return Ok(());
        }

        if let Some(dep) = self.registry.inactive_dependencies(name).await.into_iter().next() {
            return Err(Error::dependency(name, dep, "dependency is not active"));
        }

        let missing = self.permissions.missing(name, &record.metadata.permissions);
        if !missing.is_empty() {
            return Err(Error::PermissionDenied {
                plugin: name.to_string(),
                missing,
            });
        }

        let instance = record.instance;
        if let Some(hooks) = instance.lifecycle_hooks() {
            self.guarded(name, "before_activate", hooks.before_activate()).await?;
        }
        if let Some(activation) = instance.activation() {
            self.guarded(name, "activate", activation.activate()).await?;
        }
        self.registry.set_state(name, PluginState::Active).await;
        if let Some(hooks) = instance.lifecycle_hooks() {
            self.guarded(name, "after_activate", hooks.after_activate()).await?;
        }

        info!(plugin = %name, "Plugin activated");
        self.event_bus.publish(lifecycle_event(PLUGIN_ACTIVATED, name)).await;
        Ok(())
    }

    pub async fn deactivate(&self, name: &str) -> bool {
        Self::report("deactivate", name, self.try_deactivate(name).await)
    }

    pub async fn try_deactivate(&self, name: &str) -> Result<()> {
        let lock = self.transition_lock(name);
        let _guard = lock.lock().await;
        self.deactivate_locked(name).await
    }

    async fn deactivate_locked(&self, name: &str) -> Result<()> {
        let record = self.registry.record(name).await.ok_or_else(|| not_loaded(name))?;

        if record.state != PluginState::Active {
            debug!(plugin = %name, state = %record.state, "Plugin is not active");
            return Ok(());
        }

        let instance = record.instance;
        if let Some(hooks) = instance.lifecycle_hooks() {
            self.guarded(name, "before_deactivate", hooks.before_deactivate()).await?;
        }
        if let Some(activation) = instance.activation() {
            self.guarded(name, "deactivate", activation.deactivate()).await?;
        }
        self.registry.set_state(name, PluginState::Inactive).await;
        if let Some(hooks) = instance.lifecycle_hooks() {
            self.guarded(name, "after_deactivate", hooks.after_deactivate()).await?;
        }

        info!(plugin = %name, "Plugin deactivated");
        self.event_bus.publish(lifecycle_event(PLUGIN_DEACTIVATED, name)).await;
        Ok(())
    }

    /// Loaded/Inactive 플러그인을 로드 순서대로 활성화
    pub async fn activate_all(&self) -> BatchReport {
        let mut report = BatchReport::default();
        for record in self.registry.records_in_load_order().await {
            if record.state == PluginState::Active {
                continue;
            }
            let result = self.try_activate(&record.name).await;
            if let Err(e) = &result {
                warn!(plugin = %record.name, error = %e, "Failed to activate plugin");
            }
            report.record(&record.name, result);
        }

        info!(attempted = report.attempted, succeeded = report.succeeded, "Activated plugins");
        report
    }

    /// Active 플러그인을 로드 역순으로 비활성화
    pub async fn deactivate_all(&self) -> BatchReport {
        let mut report = BatchReport::default();
        for record in self.registry.records_in_load_order().await.into_iter().rev() {
            if record.state != PluginState::Active {
                continue;
            }
            let result = self.try_deactivate(&record.name).await;
            report.record(&record.name, result);
        }
        report
    }

    // ========================================================================
    // 언로드 / 리로드
    // ========================================================================

    pub async fn unload(&self, name: &str) -> bool {
        Self::report("unload", name, self.try_unload(name).await)
    }

    /// 언로드 (다른 로드된 플러그인이 의존하고 있으면 거부)
    pub async fn try_unload(&self, name: &str) -> Result<()> {
        let lock = self.transition_lock(name);
        let _guard = lock.lock().await;

        if !self.registry.contains(name).await {
            return Err(not_loaded(name));
        }

        let dependents = self.registry.dependents_of(name).await;
        if !dependents.is_empty() {
            return Err(Error::Referential {
                plugin: name.to_string(),
                dependents,
            });
        }

        self.erase_locked(name).await?;
        self.hot_reload.unwatch(name);
        Ok(())
    }

    /// 비활성화 후 unload 훅을 거쳐 레코드 삭제 (의존 관계는 보지 않음)
    async fn erase_locked(&self, name: &str) -> Result<()> {
        self.deactivate_locked(name).await?;

        let record = self.registry.record(name).await.ok_or_else(|| not_loaded(name))?;
        let instance = record.instance;

        if let Some(hooks) = instance.lifecycle_hooks() {
            self.guarded(name, "before_unload", hooks.before_unload()).await?;
        }
        if let Some(unloadable) = instance.unloadable() {
            self.guarded(name, "unload", unloadable.unload()).await?;
        }
        if let Some(hooks) = instance.lifecycle_hooks() {
            self.guarded(name, "after_unload", hooks.after_unload()).await?;
        }

        self.registry.remove(name).await;
        info!(plugin = %name, "Plugin unloaded");
        self.event_bus.publish(lifecycle_event(PLUGIN_UNLOADED, name)).await;
        Ok(())
    }

    /// 모두 언로드 (의존하는 쪽이 먼저)
    ///
    /// 로드 역순으로 훑되 아직 로드된 의존자가 남은 플러그인은 다음 패스로
    /// 미룹니다. 리로드로 로드 순서가 바뀌어도 의존성은 의존자 뒤에 내려갑니다.
    /// 한 패스에서 아무것도 내려가지 않으면 남은 플러그인을 그대로 시도해
    /// 실패를 기록합니다.
    pub async fn unload_all(&self) -> BatchReport {
        let mut report = BatchReport::default();
        let mut pending: Vec<String> = self.registry.names_in_load_order().await.into_iter().rev().collect();

        while !pending.is_empty() {
            let mut deferred = Vec::new();
            let mut progressed = false;
            for name in &pending {
                if !self.registry.dependents_of(name).await.is_empty() {
                    deferred.push(name.clone());
                    continue;
                }
                let result = self.try_unload(name).await;
                progressed |= result.is_ok();
                Self::record_unload(&mut report, name, result);
            }

            if !progressed {
                for name in &deferred {
                    let result = self.try_unload(name).await;
                    Self::record_unload(&mut report, name, result);
                }
                break;
            }
            pending = deferred;
        }

        info!(attempted = report.attempted, succeeded = report.succeeded, "Unloaded plugins");
        report
    }

    fn record_unload(report: &mut BatchReport, name: &str, result: Result<()>) {
        if let Err(e) = &result {
            warn!(plugin = %name, error = %e, "Failed to unload plugin");
        }
        report.record(name, result);
    }

    pub async fn reload(&self, name: &str) -> bool {
        Self::report("reload", name, self.try_reload(name).await)
    }

    /// deactivate -> erase -> load -> activate
    ///
    /// 권한 승인은 유지됩니다. 의존하는 플러그인이 있어도 진행합니다.
    /// 전체 순서 동안 전이 락을 쥐므로 같은 이름의 다른 전이는 중간 상태를 보지 못합니다.
    pub async fn try_reload(&self, name: &str) -> Result<()> {
        let reload_lock = self.reload_lock(name);
        let _reload_guard = reload_lock.lock().await;

        let lock = self.transition_lock(name);
        let _guard = lock.lock().await;

        if self.registry.contains(name).await {
            self.erase_locked(name).await?;
        }

        let unit = self.discovery.read_unit(name).await?;
        let mut stack = vec![name.to_string()];
        self.load_dependencies(&unit, &mut stack).await?;
        self.instantiate_locked(unit).await?;
        self.activate_locked(name).await?;

        info!(plugin = %name, "Plugin reloaded");
        self.event_bus.publish(lifecycle_event(PLUGIN_RELOADED, name)).await;
        Ok(())
    }

    // ========================================================================
    // 설정 핫 업데이트
    // ========================================================================

    pub async fn update_config(&self, name: &str, patch: Map<String, Value>) -> bool {
        Self::report("update config", name, self.try_update_config(name, patch).await)
    }

    /// 얕은 병합 후 `on_config_update(old, new)`; 실패하면 이전 설정으로 되돌림
    pub async fn try_update_config(&self, name: &str, patch: Map<String, Value>) -> Result<()> {
        let lock = self.transition_lock(name);
        let _guard = lock.lock().await;

        let record = self.registry.record(name).await.ok_or_else(|| not_loaded(name))?;
        let old = record.config;
        let mut new = old.clone();
        new.extend(patch);

        self.registry.set_config(name, new.clone()).await;

        if let Some(updatable) = record.instance.config_updatable() {
            let result = self
                .guarded(name, "on_config_update", updatable.on_config_update(&old, &new))
                .await;
            if let Err(e) = result {
                self.registry.set_config(name, old).await;
                return Err(e);
            }
        }

        info!(plugin = %name, "Plugin config updated");
        Ok(())
    }

    // ========================================================================
    // 권한
    // ========================================================================

    /// 권한 승인 (로드 여부와 무관, 중복 무시)
    pub fn grant_permissions<I, S>(&self, name: &str, permissions: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let added = self.permissions.grant(name, permissions);
        info!(plugin = %name, added, "Permissions granted");
        true
    }

    /// 권한 회수 (이미 Active인 플러그인은 그대로 둠)
    pub fn revoke_permissions<I, S>(&self, name: &str, permissions: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let removed = self.permissions.revoke(name, permissions);
        info!(plugin = %name, removed, "Permissions revoked");
        true
    }

    /// 승인된 권한 (정렬)
    pub fn permissions(&self, name: &str) -> Vec<String> {
        self.permissions.granted(name)
    }

    /// 로드된 플러그인이 선언했지만 승인되지 않은 권한
    pub async fn missing_permissions(&self, name: &str) -> Vec<String> {
        match self.registry.record(name).await {
            Some(record) => self.permissions.missing(name, &record.metadata.permissions),
            None => Vec::new(),
        }
    }

    // ========================================================================
    // 조회
    // ========================================================================

    pub async fn state(&self, name: &str) -> Option<PluginState> {
        self.registry.state(name).await
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.registry.get(name).await
    }

    pub async fn is_loaded(&self, name: &str) -> bool {
        self.registry.contains(name).await
    }

    pub async fn plugin_count(&self) -> usize {
        self.registry.len().await
    }

    /// 로드 순서대로 이름
    pub async fn names(&self) -> Vec<String> {
        self.registry.names_in_load_order().await
    }

    pub async fn info(&self, name: &str) -> Option<PluginInfo> {
        let record = self.registry.record(name).await?;
        let dependents = self.registry.dependents_of(name).await;

        Some(PluginInfo {
            version: record.metadata.version.clone(),
            description: record.metadata.description.clone(),
            state: record.state,
            load_order: record.load_order,
            dependencies: record.metadata.dependencies.clone(),
            dependents,
            granted_permissions: self.permissions.granted(name),
            missing_permissions: self.permissions.missing(name, &record.metadata.permissions),
            permissions: record.metadata.permissions,
            capabilities: record.instance.capabilities(),
            config: record.config,
            path: record.path,
            loaded_at: record.loaded_at,
            name: record.name,
        })
    }

    /// 로드 순서대로 모든 플러그인 정보
    pub async fn list(&self) -> Vec<PluginInfo> {
        let mut infos = Vec::new();
        for name in self.registry.names_in_load_order().await {
            if let Some(info) = self.info(&name).await {
                infos.push(info);
            }
        }
        infos
    }

    // ========================================================================
    // 내부 헬퍼
    // ========================================================================

    fn transition_lock(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.transition_locks.lock().entry(name.to_string()).or_default())
    }

    fn reload_lock(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.reload_locks.lock().entry(name.to_string()).or_default())
    }

    /// 플러그인 코드 호출: 패닉 포착 + 타임아웃
    async fn guarded<F>(&self, plugin: &str, stage: &'static str, fut: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        let caught = AssertUnwindSafe(fut).catch_unwind();
        let outcome = match self.config.transition_timeout {
            Some(limit) => tokio::time::timeout(limit, caught).await.map_err(|_| {
                Error::Timeout(format!(
                    "plugin '{}' did not finish {} within {}ms",
                    plugin,
                    stage,
                    limit.as_millis()
                ))
            })?,
            None => caught.await,
        };

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Error::lifecycle(plugin, stage, e)),
            Err(panic) => Err(Error::lifecycle(
                plugin,
                stage,
                format!("panicked: {}", panic_message(panic.as_ref())),
            )),
        }
    }

    /// bool API용: 실패는 로그로 남김
    fn report(operation: &str, name: &str, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) if e.is_user_facing() => {
                warn!(plugin = %name, operation, error = %e, "Plugin operation refused");
                false
            }
            Err(e) => {
                error!(plugin = %name, operation, error = %e, "Plugin operation failed");
                false
            }
        }
    }
}

fn not_loaded(name: &str) -> Error {
    Error::NotFound(format!("plugin '{}' is not loaded", name))
}
