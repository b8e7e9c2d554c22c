//! # Plugin System
//!
//! 플러그인 디렉토리의 유닛을 발견해 로드하고 라이프사이클을 관리합니다.
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      PluginManager                          │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐   │
//! │  │  Discovery   │  │   Catalog    │  │  PluginRegistry  │   │
//! │  │ plugin.json  │─►│ entry→factory│─►│ record + state   │   │
//! │  │ config.json  │  │              │  │ load order       │   │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐   │
//! │  │ Permissions  │  │  HotReloader │  │ EventBus / Mixin │   │
//! │  │   (grants)   │  │   (notify)   │  │ / Hook registries│   │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 상태 전이
//!
//! ```text
//! load ──► Loaded ──activate──► Active ──deactivate──► Inactive
//!                                  ▲                      │
//!                                  └──────activate────────┘
//! unload: 어느 상태에서든 (의존하는 플러그인이 없을 때만)
//! ```
//!
//! ## 예시
//!
//! ```ignore
//! let manager = Arc::new(PluginManager::new(
//!     PluginManagerConfig::new("plugins"),
//!     PluginCatalog::with_builtins(),
//! ));
//!
//! manager.grant_permissions("example-permission", ["user:read"]);
//! manager.load_all().await;
//! manager.activate_all().await;
//! manager.enable_hot_reload(None).await?;
//! ```

mod admin;
pub mod builtin;
mod catalog;
mod discovery;
pub mod events;
mod hot_reload;
mod manager;
mod manifest;
mod permission;
mod registry;
mod traits;

pub use admin::{AdminCommand, CommandOutcome, PluginAdmin};
pub use catalog::{PluginCatalog, PluginFactory};
pub use discovery::{PluginDiscovery, PluginUnit};
pub use events::{
    announce_app_initialized, announce_route, route_handler, AppInitialized, HttpMethod, RouteHandler,
    RouteRegistrar, RouteRegistration, RouteRequest, RouteTable,
};
pub use manager::{BatchFailure, BatchReport, PluginInfo, PluginManager, PluginManagerConfig};
pub use manifest::{PluginMetadata, CONFIG_FILE, ENTRY_FILE};
pub use permission::PermissionStore;
pub use registry::{PluginRecord, PluginRegistry};
pub use traits::{
    Activatable, ConfigUpdatable, LifecycleHooks, Plugin, PluginCapability, PluginInit, PluginState,
    Unloadable,
};
