//! 플러그인 라이프사이클 통합 테스트
//!
//! `cargo test -p chatplus-core --test plugin_lifecycle`

mod common;

use chatplus_core::plugin::events::{
    PLUGIN_ACTIVATED, PLUGIN_DEACTIVATED, PLUGIN_LOADED, PLUGIN_RELOADED, PLUGIN_UNLOADED,
};
use chatplus_core::{AdminCommand, PluginAdmin, PluginCatalog, PluginManager, PluginManagerConfig, PluginState};
use chatplus_foundation::{listener_fn, Error};
use common::{
    entries_for, journal, position, recorder_catalog, write_simple_unit, write_unit, Faults, Journal,
};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn manager(dir: &Path, catalog: PluginCatalog) -> PluginManager {
    PluginManager::new(PluginManagerConfig::new(dir), catalog)
}

fn recorders(journal: &Journal, names: &[&str]) -> PluginCatalog {
    let entries: Vec<(&str, Faults)> = names.iter().map(|n| (*n, Faults::default())).collect();
    recorder_catalog(journal, &entries)
}

fn patch(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

// ============================================================================
// 로드 / 의존성
// ============================================================================

#[tokio::test]
async fn test_dependencies_load_first() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "a", &["b"], &[]);
    write_simple_unit(dir.path(), "b", &[], &[]);

    let log = journal();
    let manager = manager(dir.path(), recorders(&log, &["a", "b"]));

    assert!(manager.load("a").await);
    assert_eq!(manager.names().await, vec!["b", "a"]);
    assert_eq!(manager.state("a").await, Some(PluginState::Loaded));
    assert_eq!(manager.state("b").await, Some(PluginState::Loaded));
    assert!(position(&log, "b:init") < position(&log, "a:init"));
    assert_eq!(entries_for(&log, "a"), vec!["a:before_init", "a:init"]);

    // 이미 로드된 플러그인은 다시 init하지 않음
    assert!(manager.load("a").await);
    assert_eq!(entries_for(&log, "a").len(), 2);
}

#[tokio::test]
async fn test_missing_dependency_fails_load() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "a", &["ghost"], &[]);

    let log = journal();
    let manager = manager(dir.path(), recorders(&log, &["a"]));

    match manager.try_load("a").await {
        Err(Error::Dependency { plugin, dependency, .. }) => {
            assert_eq!(plugin, "a");
            assert_eq!(dependency, "ghost");
        }
        other => panic!("expected dependency error, got {:?}", other),
    }
    assert!(!manager.is_loaded("a").await);
    assert!(!manager.load("a").await);
}

#[tokio::test]
async fn test_dependency_cycle_detected() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "a", &["b"], &[]);
    write_simple_unit(dir.path(), "b", &["a"], &[]);

    let log = journal();
    let manager = manager(dir.path(), recorders(&log, &["a", "b"]));

    match manager.try_load("a").await {
        Err(Error::DependencyCycle(cycle)) => assert_eq!(cycle, vec!["a", "b", "a"]),
        other => panic!("expected cycle error, got {:?}", other),
    }
    assert_eq!(manager.plugin_count().await, 0);
    assert!(log.lock().is_empty());
}

#[tokio::test]
async fn test_unknown_entry_is_discovery_error() {
    let dir = TempDir::new().unwrap();
    write_unit(dir.path(), "odd", json!({ "entry": "not-registered" }), None);

    let manager = manager(dir.path(), PluginCatalog::new());
    assert!(matches!(manager.try_load("odd").await, Err(Error::Discovery(_))));
    assert!(matches!(manager.try_load("absent").await, Err(Error::Discovery(_))));
}

#[tokio::test]
async fn test_load_all_continues_past_broken_units() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "a", &[], &[]);
    write_simple_unit(dir.path(), "c", &[], &[]);
    std::fs::create_dir_all(dir.path().join("b")).unwrap();
    std::fs::write(dir.path().join("b").join("plugin.json"), "{ not json").unwrap();

    let log = journal();
    let manager = manager(dir.path(), recorders(&log, &["a", "b", "c"]));

    let report = manager.load_all().await;
    assert_eq!(report.attempted, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].name, "b");
    assert_eq!(manager.names().await, vec!["a", "c"]);
}

#[tokio::test]
async fn test_init_failure_and_panic_are_contained() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "broken", &[], &[]);
    write_simple_unit(dir.path(), "panicky", &[], &[]);
    write_simple_unit(dir.path(), "fine", &[], &[]);

    let log = journal();
    let catalog = recorder_catalog(
        &log,
        &[
            ("broken", Faults { fail_init: true, ..Default::default() }),
            ("panicky", Faults { panic_init: true, ..Default::default() }),
            ("fine", Faults::default()),
        ],
    );
    let manager = manager(dir.path(), catalog);

    match manager.try_load("broken").await {
        Err(Error::Lifecycle { plugin, stage, .. }) => {
            assert_eq!(plugin, "broken");
            assert_eq!(stage, "init");
        }
        other => panic!("expected lifecycle error, got {:?}", other),
    }

    match manager.try_load("panicky").await {
        Err(Error::Lifecycle { stage, message, .. }) => {
            assert_eq!(stage, "init");
            assert!(message.contains("recorder init panic"));
        }
        other => panic!("expected lifecycle error, got {:?}", other),
    }

    assert!(manager.load("fine").await);
    assert_eq!(manager.names().await, vec!["fine"]);
}

// ============================================================================
// 활성화 / 권한
// ============================================================================

#[tokio::test]
async fn test_activation_requires_active_dependencies() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "a", &["b"], &[]);
    write_simple_unit(dir.path(), "b", &[], &[]);

    let log = journal();
    let manager = manager(dir.path(), recorders(&log, &["a", "b"]));
    manager.load("a").await;

    assert!(matches!(
        manager.try_activate("a").await,
        Err(Error::Dependency { .. })
    ));
    assert_eq!(manager.state("a").await, Some(PluginState::Loaded));

    let report = manager.activate_all().await;
    assert!(report.all_succeeded());
    assert_eq!(report.succeeded, 2);
    assert!(position(&log, "b:activate") < position(&log, "a:activate"));
    assert_eq!(
        entries_for(&log, "a")[2..],
        ["a:before_activate", "a:activate", "a:after_activate"]
    );
}

#[tokio::test]
async fn test_activate_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "a", &[], &[]);

    let log = journal();
    let manager = manager(dir.path(), recorders(&log, &["a"]));
    manager.load("a").await;

    assert!(manager.activate("a").await);
    assert!(manager.activate("a").await);
    let activations = entries_for(&log, "a").iter().filter(|e| *e == "a:activate").count();
    assert_eq!(activations, 1);

    // 이미 비활성이면 무시
    assert!(manager.deactivate("a").await);
    assert_eq!(manager.state("a").await, Some(PluginState::Inactive));
    assert!(manager.deactivate("a").await);
    assert_eq!(entries_for(&log, "a").iter().filter(|e| *e == "a:deactivate").count(), 1);

    assert!(manager.activate("a").await);
    assert_eq!(manager.state("a").await, Some(PluginState::Active));
}

#[tokio::test]
async fn test_permission_gate() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "c", &[], &["x:read"]);

    let log = journal();
    let manager = manager(dir.path(), recorders(&log, &["c"]));
    manager.load("c").await;

    match manager.try_activate("c").await {
        Err(Error::PermissionDenied { plugin, missing }) => {
            assert_eq!(plugin, "c");
            assert_eq!(missing, vec!["x:read"]);
        }
        other => panic!("expected permission error, got {:?}", other),
    }
    assert_eq!(manager.missing_permissions("c").await, vec!["x:read"]);

    assert!(manager.grant_permissions("c", ["x:read"]));
    assert!(manager.activate("c").await);
    assert_eq!(manager.state("c").await, Some(PluginState::Active));

    // 회수는 다음 전이부터 적용
    assert!(manager.revoke_permissions("c", ["x:read"]));
    assert_eq!(manager.state("c").await, Some(PluginState::Active));

    assert!(manager.deactivate("c").await);
    assert!(matches!(
        manager.try_activate("c").await,
        Err(Error::PermissionDenied { .. })
    ));
}

#[tokio::test]
async fn test_preauthorized_grants_from_config() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "c", &[], &["x:read", "x:write"]);

    let mut config = PluginManagerConfig::new(dir.path());
    config
        .grants
        .insert("c".to_string(), vec!["x:read".to_string(), "x:write".to_string()]);

    let log = journal();
    let manager = PluginManager::new(config, recorders(&log, &["c"]));
    manager.load("c").await;

    assert!(manager.activate("c").await);
    assert_eq!(manager.permissions("c"), vec!["x:read", "x:write"]);
}

#[tokio::test]
async fn test_transition_timeout() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "slow", &[], &[]);

    let log = journal();
    let catalog = recorder_catalog(
        &log,
        &[("slow", Faults { hang_activate: true, ..Default::default() })],
    );
    let config = PluginManagerConfig::new(dir.path()).with_transition_timeout(Duration::from_millis(100));
    let manager = PluginManager::new(config, catalog);
    manager.load("slow").await;

    assert!(matches!(manager.try_activate("slow").await, Err(Error::Timeout(_))));
    assert_ne!(manager.state("slow").await, Some(PluginState::Active));
}

// ============================================================================
// 언로드 / 리로드 / 설정
// ============================================================================

#[tokio::test]
async fn test_unload_refused_while_required() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "a", &["b"], &[]);
    write_simple_unit(dir.path(), "b", &[], &[]);

    let log = journal();
    let manager = manager(dir.path(), recorders(&log, &["a", "b"]));
    manager.load("a").await;
    manager.activate_all().await;

    match manager.try_unload("b").await {
        Err(Error::Referential { plugin, dependents }) => {
            assert_eq!(plugin, "b");
            assert_eq!(dependents, vec!["a"]);
        }
        other => panic!("expected referential error, got {:?}", other),
    }
    assert_eq!(manager.state("b").await, Some(PluginState::Active));

    assert!(manager.unload("a").await);
    assert!(manager.unload("b").await);
    assert_eq!(manager.plugin_count().await, 0);
    assert!(position(&log, "a:deactivate") < position(&log, "a:unload"));
    assert!(matches!(manager.try_unload("b").await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_unload_all_in_reverse_order() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "a", &["b"], &[]);
    write_simple_unit(dir.path(), "b", &[], &[]);

    let log = journal();
    let manager = manager(dir.path(), recorders(&log, &["a", "b"]));
    manager.load_all().await;
    manager.activate_all().await;

    let report = manager.unload_all().await;
    assert!(report.all_succeeded());
    assert!(position(&log, "a:unload") < position(&log, "b:unload"));
    assert_eq!(manager.plugin_count().await, 0);
}

#[tokio::test]
async fn test_reload_keeps_grants() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "c", &[], &["x:read"]);

    let log = journal();
    let manager = manager(dir.path(), recorders(&log, &["c"]));
    manager.grant_permissions("c", ["x:read"]);
    manager.load("c").await;
    manager.activate("c").await;

    // 디스크 변경이 리로드에 반영됨
    write_unit(
        dir.path(),
        "c",
        json!({ "version": "2.0.0", "permissions": ["x:read"] }),
        None,
    );

    assert!(manager.reload("c").await);
    assert_eq!(manager.state("c").await, Some(PluginState::Active));
    assert_eq!(manager.permissions("c"), vec!["x:read"]);

    let info = manager.info("c").await.unwrap();
    assert_eq!(info.version, "2.0.0");
    assert_eq!(
        entries_for(&log, "c").iter().filter(|e| *e == "c:init").count(),
        2
    );
    assert!(position(&log, "c:unload") < log.lock().iter().rposition(|e| e == "c:init").unwrap());
}

#[tokio::test]
async fn test_reload_unloaded_plugin_loads_it() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "a", &[], &[]);

    let log = journal();
    let manager = manager(dir.path(), recorders(&log, &["a"]));

    assert!(manager.reload("a").await);
    assert_eq!(manager.state("a").await, Some(PluginState::Active));
}

#[tokio::test]
async fn test_unload_all_after_dependency_reload() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "a", &["b"], &[]);
    write_simple_unit(dir.path(), "b", &[], &[]);

    let log = journal();
    let manager = manager(dir.path(), recorders(&log, &["a", "b"]));
    manager.load_all().await;
    manager.activate_all().await;

    // 리로드 후 b가 a보다 뒤의 로드 순서를 가짐
    assert!(manager.reload("b").await);
    assert_eq!(manager.names().await, vec!["a", "b"]);

    let report = manager.unload_all().await;
    assert!(report.all_succeeded(), "{:?}", report.failures);
    assert_eq!(report.attempted, 2);
    assert_eq!(manager.plugin_count().await, 0);
    let entries = log.lock().clone();
    let last = |entry: &str| entries.iter().rposition(|e| e == entry).unwrap();
    assert!(last("a:unload") < last("b:unload"));
}

#[tokio::test]
async fn test_unload_all_reports_blocked_dependency() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "a", &["b"], &[]);
    write_simple_unit(dir.path(), "b", &[], &[]);

    let log = journal();
    let catalog = recorder_catalog(
        &log,
        &[("a", Faults { fail_unload: true, ..Default::default() }), ("b", Faults::default())],
    );
    let manager = manager(dir.path(), catalog);
    manager.load_all().await;

    let report = manager.unload_all().await;
    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 0);
    assert!(matches!(manager.try_unload("b").await, Err(Error::Referential { .. })));
    assert_eq!(manager.names().await, vec!["b", "a"]);
}

#[tokio::test]
async fn test_concurrent_transitions_are_serialized() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "x", &[], &[]);

    let log = journal();
    let manager = manager(dir.path(), recorders(&log, &["x"]));
    assert!(manager.load("x").await);
    assert!(manager.activate("x").await);

    let (first, second, activated) = tokio::join!(
        manager.reload("x"),
        manager.reload("x"),
        manager.activate("x"),
    );
    assert!(first && second && activated);
    assert_eq!(manager.state("x").await, Some(PluginState::Active));

    let startup = ["before_init", "init", "before_activate", "activate", "after_activate"];
    let reload = ["deactivate", "unload", "before_init", "init", "before_activate", "activate", "after_activate"];
    let expected: Vec<String> = startup
        .iter()
        .chain(reload.iter())
        .chain(reload.iter())
        .map(|stage| format!("x:{}", stage))
        .collect();
    assert_eq!(entries_for(&log, "x"), expected);
}

#[tokio::test]
async fn test_update_config_merges_and_rolls_back() {
    let dir = TempDir::new().unwrap();
    write_unit(
        dir.path(),
        "good",
        json!({ "version": "1.0.0" }),
        Some(json!({ "greeting": "hi", "count": 1 })),
    );
    write_unit(dir.path(), "picky", json!({ "version": "1.0.0" }), Some(json!({ "mode": "strict" })));

    let log = journal();
    let catalog = recorder_catalog(
        &log,
        &[
            ("good", Faults::default()),
            ("picky", Faults { reject_config: true, ..Default::default() }),
        ],
    );
    let manager = manager(dir.path(), catalog);
    manager.load_all().await;

    assert!(manager.update_config("good", patch(json!({ "count": 2 }))).await);
    let config = manager.info("good").await.unwrap().config;
    assert_eq!(config.get("greeting"), Some(&json!("hi")));
    assert_eq!(config.get("count"), Some(&json!(2)));
    assert!(entries_for(&log, "good").iter().any(|e| e.starts_with("good:config=")));

    assert!(matches!(
        manager.try_update_config("picky", patch(json!({ "mode": "loose" }))).await,
        Err(Error::Lifecycle { .. })
    ));
    let config = manager.info("picky").await.unwrap().config;
    assert_eq!(config.get("mode"), Some(&json!("strict")));

    assert!(matches!(
        manager.try_update_config("ghost", Map::new()).await,
        Err(Error::NotFound(_))
    ));
}

// ============================================================================
// 이벤트 / 조회 / 관리 명령
// ============================================================================

#[tokio::test]
async fn test_lifecycle_events_published() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "a", &[], &[]);

    let log = journal();
    let manager = manager(dir.path(), recorders(&log, &["a"]));

    let seen = Arc::new(Mutex::new(Vec::new()));
    for topic in [PLUGIN_LOADED, PLUGIN_ACTIVATED, PLUGIN_DEACTIVATED, PLUGIN_UNLOADED, PLUGIN_RELOADED] {
        let seen = Arc::clone(&seen);
        manager.event_bus().subscribe(
            topic,
            listener_fn("test.lifecycle", move |event| {
                seen.lock()
                    .push(format!("{}:{}", event.topic, event.data["plugin"].as_str().unwrap_or("")));
                Ok(())
            }),
        );
    }

    manager.load("a").await;
    manager.activate("a").await;
    manager.reload("a").await;
    manager.unload("a").await;

    assert_eq!(
        *seen.lock(),
        vec![
            "plugin.loaded:a",
            "plugin.activated:a",
            "plugin.deactivated:a",
            "plugin.unloaded:a",
            "plugin.loaded:a",
            "plugin.activated:a",
            "plugin.reloaded:a",
            "plugin.deactivated:a",
            "plugin.unloaded:a",
        ]
    );
}

#[tokio::test]
async fn test_plugin_info() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "a", &["b"], &["x:read"]);
    write_simple_unit(dir.path(), "b", &[], &[]);

    let log = journal();
    let manager = manager(dir.path(), recorders(&log, &["a", "b"]));
    manager.load_all().await;

    let b = manager.info("b").await.unwrap();
    assert_eq!(b.load_order, 0);
    assert_eq!(b.dependents, vec!["a"]);

    let a = manager.info("a").await.unwrap();
    assert_eq!(a.dependencies, vec!["b"]);
    assert_eq!(a.missing_permissions, vec!["x:read"]);
    assert_eq!(a.description, "a test plugin");

    let json = serde_json::to_value(&a).unwrap();
    assert_eq!(json["state"], "loaded");
    assert_eq!(json["missingPermissions"], json!(["x:read"]));

    assert_eq!(manager.list().await.len(), 2);
    assert!(manager.info("ghost").await.is_none());
}

#[tokio::test]
async fn test_admin_commands() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "c", &[], &["x:read"]);

    let log = journal();
    let manager = Arc::new(manager(dir.path(), recorders(&log, &["c"])));
    manager.load_all().await;
    let admin = PluginAdmin::new(Arc::clone(&manager));

    let outcome = admin.execute(AdminCommand::Activate { name: "c".into() }).await;
    assert!(!outcome.success);
    assert!(outcome.message.contains("x:read"));

    let outcome = admin
        .execute(AdminCommand::Grant {
            name: "c".into(),
            permissions: vec!["x:read".into()],
        })
        .await;
    assert!(outcome.success);
    assert_eq!(outcome.data, Some(json!(["x:read"])));

    let outcome = admin.execute(AdminCommand::Activate { name: "c".into() }).await;
    assert!(outcome.success);
    assert_eq!(outcome.message, "Plugin 'c' activated");

    let outcome = admin.execute(AdminCommand::List).await;
    assert_eq!(outcome.message, "1 plugin(s) loaded");
    assert_eq!(outcome.data.unwrap()[0]["state"], "active");

    let outcome = admin.execute(AdminCommand::Show { name: "ghost".into() }).await;
    assert!(!outcome.success);

    let outcome = admin
        .execute(AdminCommand::UpdateConfig {
            name: "c".into(),
            patch: patch(json!({ "level": 3 })),
        })
        .await;
    assert!(outcome.success);

    let outcome = admin.execute(AdminCommand::Deactivate { name: "c".into() }).await;
    assert!(outcome.success);
    assert_eq!(manager.state("c").await, Some(PluginState::Inactive));
}
