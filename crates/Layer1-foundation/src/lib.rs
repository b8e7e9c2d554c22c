//! # chatplus-foundation
//!
//! Foundation layer for the ChatPlus extension runtime:
//! - Error: 런타임 전체 에러 타입 (Discovery / Dependency / Permission / Lifecycle ...)
//! - Config: RuntimeConfig (TOML/JSON) + ConfigLookup (점 경로 조회)
//! - Event: 우선순위/일회성 리스너를 지원하는 EventBus
//! - Logging: 플러그인 이름이 붙는 PluginLogger
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  chatplus-core (PluginManager, MixinRegistry, Hooks)    │
//! │                     │                                   │
//! │          ┌──────────┼──────────┐                        │
//! │          ▼          ▼          ▼                        │
//! │      EventBus   RuntimeConfig  PluginLogger             │
//! │          └──────────┬──────────┘                        │
//! │                     ▼                                   │
//! │                Error / Result                           │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod logging;

// ============================================================================
// Error
// ============================================================================
pub use error::{panic_message, Error, Result};

// ============================================================================
// Config
// ============================================================================
pub use config::{ConfigLookup, RuntimeConfig, RUNTIME_CONFIG_FILE};

// ============================================================================
// Event
// ============================================================================
pub use event::{
    async_listener_fn, listener_fn, Event, EventBus, EventBusConfig, EventListener, ListenerId,
};

// ============================================================================
// Logging
// ============================================================================
pub use logging::PluginLogger;

/// Foundation 버전
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
