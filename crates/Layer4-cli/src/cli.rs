//! Runtime boot + operator commands

use anyhow::Context;
use chatplus_core::{
    announce_app_initialized, AdminCommand, CommandOutcome, PluginAdmin, PluginCatalog,
    PluginManager, RouteTable,
};
use chatplus_foundation::{RuntimeConfig, RUNTIME_CONFIG_FILE};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 부팅 옵션 (CLI 플래그에서)
#[derive(Debug, Clone, Default)]
pub struct BootOptions {
    pub config: Option<PathBuf>,
    pub plugins_dir: Option<PathBuf>,
    pub grants: Vec<(String, Vec<String>)>,
}

/// 부팅된 런타임
pub struct Runtime {
    pub manager: Arc<PluginManager>,
    pub routes: Arc<RouteTable>,
}

/// `--grant name=perm,perm` 파서
pub fn parse_grant(raw: &str) -> Result<(String, Vec<String>), String> {
    let (name, perms) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PERM[,PERM...], got '{}'", raw))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing plugin name in '{}'", raw));
    }

    let perms: Vec<String> = perms
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect();
    if perms.is_empty() {
        return Err(format!("no permissions listed in '{}'", raw));
    }

    Ok((name.to_string(), perms))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => RuntimeConfig::load_or_default(RUNTIME_CONFIG_FILE)
            .with_context(|| format!("failed to load {}", RUNTIME_CONFIG_FILE)),
    }
}

/// 설정 로드 → 매니저 생성 → load_all → 권한 → activate_all → app.initialized
pub async fn boot(options: BootOptions) -> anyhow::Result<Runtime> {
    let mut config = load_config(options.config.as_deref())?;
    if let Some(dir) = options.plugins_dir {
        config.plugin_dir = dir;
    }
    info!(plugin_dir = %config.plugin_dir.display(), "Booting extension runtime");

    let manager = Arc::new(PluginManager::from_runtime(&config, PluginCatalog::with_builtins()));
    let routes = Arc::new(RouteTable::new());
    routes.attach(manager.event_bus());

    let loaded = manager.load_all().await;
    for failure in &loaded.failures {
        warn!(plugin = %failure.name, reason = %failure.reason, "Plugin not loaded");
    }

    for (name, perms) in options.grants {
        manager.grant_permissions(&name, perms);
    }

    let activated = manager.activate_all().await;
    for failure in &activated.failures {
        warn!(plugin = %failure.name, reason = %failure.reason, "Plugin not activated");
    }

    announce_app_initialized(manager.event_bus(), routes.clone()).await;

    if config.hot_reload {
        manager.enable_hot_reload(None).await?;
    }
    info!(
        loaded = loaded.succeeded,
        active = activated.succeeded,
        routes = routes.len(),
        "Extension runtime ready"
    );

    Ok(Runtime { manager, routes })
}

/// 관리 명령 1회 실행 후 출력
pub async fn run_command(runtime: &Runtime, command: AdminCommand) -> anyhow::Result<()> {
    let admin = PluginAdmin::new(Arc::clone(&runtime.manager));
    let outcome = admin.execute(command).await;
    print_outcome(&outcome)?;

    runtime.manager.unload_all().await;

    if !outcome.success {
        anyhow::bail!(outcome.message);
    }
    Ok(())
}

fn print_outcome(outcome: &CommandOutcome) -> anyhow::Result<()> {
    let status = if outcome.success { "✓" } else { "✗" };
    println!("{} {}", status, outcome.message);
    if let Some(data) = &outcome.data {
        println!("{}", serde_json::to_string_pretty(data)?);
    }
    Ok(())
}

/// 아직 감시 중인 플러그인이 없을 때만 핫 리로드를 켬, 새로 켰으면 true
///
/// 설정의 `hotReload`로 부팅 때 이미 켜졌다면 watcher를 다시 만들지 않습니다.
pub async fn ensure_hot_reload(manager: &Arc<PluginManager>) -> anyhow::Result<bool> {
    if !manager.watched_plugins().is_empty() {
        debug!("Hot reload already enabled");
        return Ok(false);
    }
    manager.enable_hot_reload(None).await?;
    Ok(true)
}

/// 핫 리로드를 켜고 Ctrl-C까지 대기
pub async fn watch(runtime: Runtime) -> anyhow::Result<()> {
    ensure_hot_reload(&runtime.manager).await?;
    let watching = runtime.manager.watched_plugins().len();
    println!(
        "Watching {} plugin(s), {} route(s) registered. Press Ctrl-C to stop.",
        watching,
        runtime.routes.len()
    );
    for route in runtime.routes.describe() {
        println!("  {} {}", route["method"].as_str().unwrap_or("?"), route["path"].as_str().unwrap_or("?"));
    }

    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;

    info!("Shutting down");
    runtime.manager.disable_hot_reload(None);
    let report = runtime.manager.unload_all().await;
    for failure in &report.failures {
        warn!(plugin = %failure.name, reason = %failure.reason, "Plugin did not unload cleanly");
    }
    Ok(())
}
