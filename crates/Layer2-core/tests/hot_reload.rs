//! 핫 리로드 통합 테스트 - 실제 파일 변경 감시
//!
//! `cargo test -p chatplus-core --test hot_reload`

mod common;

use chatplus_core::plugin::events::PLUGIN_RELOADED;
use chatplus_core::{PluginManager, PluginManagerConfig, PluginState};
use chatplus_foundation::{listener_fn, Error};
use common::{entries_for, journal, recorder_catalog, write_simple_unit, write_unit, Faults};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

async fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    check()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_file_change_triggers_reload() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "watched", &[], &[]);

    let log = journal();
    let catalog = recorder_catalog(&log, &[("watched", Faults::default())]);
    let config = PluginManagerConfig::new(dir.path()).with_hot_reload_debounce(Duration::from_millis(50));
    let manager = Arc::new(PluginManager::new(config, catalog));

    let reloads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&reloads);
    manager.event_bus().subscribe(
        PLUGIN_RELOADED,
        listener_fn("test.reloads", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    );

    manager.load("watched").await;
    manager.activate("watched").await;
    assert_eq!(manager.enable_hot_reload(None).await.unwrap(), 1);
    assert!(manager.is_watching("watched"));

    write_unit(
        dir.path(),
        "watched",
        json!({ "version": "1.0.1" }),
        Some(json!({ "changed": true })),
    );

    let reloaded = wait_until(Duration::from_secs(5), || reloads.load(Ordering::SeqCst) >= 1).await;
    assert!(reloaded, "plugin was not reloaded after file change");

    // 두 파일 쓰기가 리로드 두 번으로 나뉠 수 있으므로 최종 상태를 기다림
    let mut settled = false;
    for _ in 0..200 {
        if let Some(info) = manager.info("watched").await {
            if info.state == PluginState::Active
                && info.version == "1.0.1"
                && info.config.get("changed") == Some(&json!(true))
            {
                settled = true;
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(settled, "reloaded plugin did not pick up the new unit files");
    assert!(entries_for(&log, "watched").iter().filter(|e| *e == "watched:init").count() >= 2);

    // 리로드 후에도 감시 유지
    assert!(manager.is_watching("watched"));
    assert_eq!(manager.disable_hot_reload(None), 1);
    assert!(manager.watched_plugins().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_disable_during_reload_finishes_reload() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "x", &[], &[]);

    let log = journal();
    let catalog = recorder_catalog(&log, &[("x", Faults { slow_reinit: true, ..Default::default() })]);
    let config = PluginManagerConfig::new(dir.path()).with_hot_reload_debounce(Duration::from_millis(50));
    let manager = Arc::new(PluginManager::new(config, catalog));

    assert!(manager.load("x").await);
    assert!(manager.activate("x").await);
    manager.enable_hot_reload(None).await.unwrap();

    write_unit(dir.path(), "x", json!({ "version": "1.0.1" }), None);

    // 두 번째 인스턴스의 init이 시작될 때까지 대기
    let started = wait_until(Duration::from_secs(5), || {
        entries_for(&log, "x").iter().filter(|e| *e == "x:before_init").count() >= 2
    })
    .await;
    assert!(started, "reload did not start");

    assert_eq!(manager.disable_hot_reload(None), 1);
    assert!(!manager.is_watching("x"));

    // 진행 중이던 리로드는 끝까지 수행됨
    let mut finished = false;
    for _ in 0..120 {
        if let Some(info) = manager.info("x").await {
            if info.state == PluginState::Active && info.version == "1.0.1" {
                finished = true;
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(finished, "plugin lost after disabling hot reload mid-reload");
    assert_eq!(entries_for(&log, "x").last().map(String::as_str), Some("x:after_activate"));
}

#[tokio::test]
async fn test_enable_for_unknown_plugin() {
    let dir = TempDir::new().unwrap();
    let log = journal();
    let manager = Arc::new(PluginManager::new(
        PluginManagerConfig::new(dir.path()),
        recorder_catalog(&log, &[]),
    ));

    assert!(matches!(
        manager.enable_hot_reload(Some("ghost")).await,
        Err(Error::NotFound(_))
    ));
    assert_eq!(manager.disable_hot_reload(Some("ghost")), 0);
}

#[tokio::test]
async fn test_unload_stops_watching() {
    let dir = TempDir::new().unwrap();
    write_simple_unit(dir.path(), "a", &[], &[]);
    write_simple_unit(dir.path(), "b", &[], &[]);

    let log = journal();
    let catalog = recorder_catalog(&log, &[("a", Faults::default()), ("b", Faults::default())]);
    let manager = Arc::new(PluginManager::new(PluginManagerConfig::new(dir.path()), catalog));
    manager.load_all().await;

    assert_eq!(manager.enable_hot_reload(Some("a")).await.unwrap(), 1);
    assert_eq!(manager.enable_hot_reload(None).await.unwrap(), 2);
    assert_eq!(manager.watched_plugins(), vec!["a", "b"]);

    assert!(manager.unload("a").await);
    assert!(!manager.is_watching("a"));
    assert_eq!(manager.disable_hot_reload(Some("b")), 1);
    assert!(manager.watched_plugins().is_empty());
}
