//! chatplus-core: Extension Runtime for ChatPlus
//!
//! Layer2 - 플러그인 확장 런타임
//!
//! # 주요 모듈
//!
//! - `plugin`: 플러그인 발견, 로드, 라이프사이클, 권한, 핫 리로드
//! - `mixin`: 런타임 멤버 주입과 복원
//! - `hook`: 이름 붙은 확장 지점 (우선순위 순 실행)
//!
//! # 사용 예시
//!
//! ```ignore
//! use chatplus_core::{PluginCatalog, PluginManager, PluginManagerConfig, RouteTable};
//!
//! let manager = Arc::new(PluginManager::new(
//!     PluginManagerConfig::new("plugins"),
//!     PluginCatalog::with_builtins(),
//! ));
//!
//! // 라우트 공지 수집
//! let routes = Arc::new(RouteTable::new());
//! routes.attach(manager.event_bus());
//!
//! manager.load_all().await;
//! manager.activate_all().await;
//! announce_app_initialized(manager.event_bus(), routes.clone()).await;
//! ```

pub mod hook;
pub mod mixin;
pub mod plugin;

// Re-exports: Plugin
pub use plugin::{
    announce_app_initialized, announce_route, route_handler, Activatable, AdminCommand, AppInitialized,
    BatchFailure, BatchReport, CommandOutcome, ConfigUpdatable, HttpMethod, LifecycleHooks,
    PermissionStore, Plugin, PluginAdmin, PluginCapability, PluginCatalog, PluginDiscovery,
    PluginFactory, PluginInfo, PluginInit, PluginManager, PluginManagerConfig, PluginMetadata,
    PluginRecord, PluginRegistry, PluginState, PluginUnit, RouteHandler, RouteRegistrar,
    RouteRegistration, RouteRequest, RouteTable, Unloadable,
};

// Re-exports: Mixin
pub use mixin::{Member, MixinBundle, MixinOptions, MixinRegistry, MixinTarget};

// Re-exports: Hook
pub use hook::{HookArgs, HookHandler, HookId, HookOptions, HookRegistry, HookReport};

// Layer1 re-exports
pub use chatplus_foundation::{Error, Event, EventBus, Result};

/// Layer2 버전
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
