//! Event System - 토픽 기반 발행/구독 시스템
//!
//! 플러그인 간 통신과 시스템 이벤트(앱 초기화, 라우트 등록 등)를 전달합니다.
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        EventBus                              │
//! │  topic "user:login"                                          │
//! │   ├── priority -1  listener A                                │
//! │   ├── priority  0  listener B   (등록 순서)                  │
//! │   └── priority  5  listener C   (once)                       │
//! │                                                              │
//! │  publish(event) ─▶ A ─▶ B ─▶ C   (실패는 격리, 순차 실행)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 사용법
//!
//! ```ignore
//! use chatplus_foundation::event::{listener_fn, Event, EventBus};
//!
//! let bus = EventBus::new();
//! let id = bus.subscribe_with_priority("user:login", listener_fn("audit", |e| {
//!     tracing::info!("login {}", e.data);
//!     Ok(())
//! }), -10);
//!
//! bus.publish(Event::new("user:login", json!({ "username": "kim" }))).await;
//! bus.unsubscribe("user:login", id);
//! ```

pub mod bus;
pub mod types;

// Re-exports
pub use bus::{
    async_listener_fn, listener_fn, EventBus, EventBusConfig, EventListener, ListenerId,
};
pub use types::Event;
