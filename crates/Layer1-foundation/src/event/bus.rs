//! Event Bus - 토픽 기반 발행/구독
//!
//! - 토픽별 리스너 목록을 우선순위(오름차순, 안정 정렬)로 유지
//! - 일회성 리스너 (`subscribe_once`)
//! - 리스너 단위 장애 격리: 에러/패닉이 나도 다음 리스너는 실행됨

use super::types::Event;
use crate::error::panic_message;
use crate::{Error, Result};
use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

// ============================================================================
// EventListener Trait
// ============================================================================

/// 이벤트 리스너 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// 이벤트 리스너 trait
#[async_trait]
pub trait EventListener: Send + Sync {
    /// 리스너 이름 (디버깅용)
    fn name(&self) -> &str {
        "listener"
    }

    /// 이벤트 처리
    async fn on_event(&self, event: &Event) -> Result<()>;
}

struct FnListener<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F> EventListener for FnListener<F>
where
    F: Fn(&Event) -> Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_event(&self, event: &Event) -> Result<()> {
        (self.f)(event)
    }
}

struct AsyncFnListener<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F, Fut> EventListener for AsyncFnListener<F>
where
    F: Fn(Event) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_event(&self, event: &Event) -> Result<()> {
        (self.f)(event.clone()).await
    }
}

/// 동기 클로저를 리스너로 변환
pub fn listener_fn<F>(name: impl Into<String>, f: F) -> Arc<dyn EventListener>
where
    F: Fn(&Event) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(FnListener {
        name: name.into(),
        f,
    })
}

/// 비동기 클로저를 리스너로 변환 (publish가 완료를 기다림)
pub fn async_listener_fn<F, Fut>(name: impl Into<String>, f: F) -> Arc<dyn EventListener>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(AsyncFnListener {
        name: name.into(),
        f,
    })
}

// ============================================================================
// EventBus
// ============================================================================

/// 이벤트 버스 설정
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// 토픽당 리스너 수 경고 임계값
    pub max_listeners: usize,

    /// 디버그 모드 (모든 발행 로깅)
    pub debug_mode: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            max_listeners: 100,
            debug_mode: false,
        }
    }
}

/// 등록된 리스너 정보
#[derive(Clone)]
struct Registration {
    id: ListenerId,
    listener: Arc<dyn EventListener>,
    priority: i32,
    once: bool,
}

/// 이벤트 버스
///
/// 디스패치는 호출한 태스크 안에서 순차적으로 이뤄지며, `publish`는 모든
/// 리스너 호출이 끝난 뒤에 반환됩니다. 리스너 목록은 스냅샷으로 복사한 뒤
/// 락 없이 호출하므로 리스너 안에서 구독/해제를 해도 됩니다.
///
/// ```ignore
/// let bus = EventBus::new();
/// let id = bus.subscribe("user:login", listener_fn("audit", |e| {
///     println!("login: {}", e.data);
///     Ok(())
/// }));
/// bus.publish(Event::new("user:login", json!({ "username": "kim" }))).await;
/// bus.unsubscribe("user:login", id);
/// ```
pub struct EventBus {
    /// 설정
    config: EventBusConfig,

    /// 토픽 -> 리스너 목록 (실행 순서)
    topics: Mutex<HashMap<String, Vec<Registration>>>,

    /// 리스너 ID 카운터
    listener_counter: AtomicU64,

    /// 발행된 이벤트 수
    event_count: AtomicU64,
}

impl EventBus {
    /// 기본 설정으로 이벤트 버스 생성
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// 커스텀 설정으로 이벤트 버스 생성
    pub fn with_config(config: EventBusConfig) -> Self {
        debug!("EventBus initialized");
        Self {
            config,
            topics: Mutex::new(HashMap::new()),
            listener_counter: AtomicU64::new(0),
            event_count: AtomicU64::new(0),
        }
    }

    // ========================================================================
    // 구독
    // ========================================================================

    /// 리스너 등록 (기본 우선순위 0, 등록 순서대로 실행)
    pub fn subscribe(&self, topic: impl Into<String>, listener: Arc<dyn EventListener>) -> ListenerId {
        self.register(topic.into(), listener, 0, false)
    }

    /// 우선순위와 함께 리스너 등록
    ///
    /// 0이 아닌 우선순위가 들어오면 해당 토픽의 전체 목록을 오름차순으로
    /// 안정 정렬합니다 (작을수록 먼저 실행).
    pub fn subscribe_with_priority(
        &self,
        topic: impl Into<String>,
        listener: Arc<dyn EventListener>,
        priority: i32,
    ) -> ListenerId {
        self.register(topic.into(), listener, priority, false)
    }

    /// 일회성 리스너 등록 - 최대 한 번 호출된 뒤 자동 해제
    pub fn subscribe_once(&self, topic: impl Into<String>, listener: Arc<dyn EventListener>) -> ListenerId {
        self.register(topic.into(), listener, 0, true)
    }

    fn register(
        &self,
        topic: String,
        listener: Arc<dyn EventListener>,
        priority: i32,
        once: bool,
    ) -> ListenerId {
        let id = ListenerId::new(self.listener_counter.fetch_add(1, Ordering::SeqCst));

        debug!(
            topic = %topic,
            listener_name = listener.name(),
            listener_id = %id,
            priority,
            once,
            "Registering event listener"
        );

        let mut topics = self.topics.lock();
        let list = topics.entry(topic.clone()).or_default();
        list.push(Registration {
            id,
            listener,
            priority,
            once,
        });

        if priority != 0 {
            // sort_by_key는 안정 정렬
            list.sort_by_key(|r| r.priority);
        }

        if list.len() > self.config.max_listeners {
            warn!(
                topic = %topic,
                count = list.len(),
                max = self.config.max_listeners,
                "Possible listener leak: too many listeners on topic"
            );
        }

        id
    }

    /// 리스너 해제
    pub fn unsubscribe(&self, topic: &str, id: ListenerId) -> bool {
        let mut topics = self.topics.lock();
        let Some(list) = topics.get_mut(topic) else {
            return false;
        };

        let before = list.len();
        list.retain(|r| r.id != id);
        let removed = list.len() != before;

        if list.is_empty() {
            topics.remove(topic);
        }

        if removed {
            debug!(topic = %topic, listener_id = %id, "Unregistered event listener");
        }

        removed
    }

    /// 토픽의 모든 리스너 해제, 해제된 수 반환
    pub fn unsubscribe_all(&self, topic: &str) -> usize {
        let removed = self
            .topics
            .lock()
            .remove(topic)
            .map(|list| list.len())
            .unwrap_or(0);

        debug!(topic = %topic, removed, "All listeners removed for topic");
        removed
    }

    // ========================================================================
    // 발행
    // ========================================================================

    /// 이벤트 발행
    ///
    /// 리스너가 하나라도 있었는지 반환합니다. 실패한 리스너는 로그만 남기고
    /// 다음 리스너로 진행합니다.
    pub async fn publish(&self, event: Event) -> bool {
        self.dispatch(&event).await.0
    }

    /// 이벤트 발행 후, 실패한 리스너가 있으면 모아서 에러로 반환
    ///
    /// 모든 리스너는 실패 여부와 관계없이 실행됩니다.
    pub async fn try_publish(&self, event: Event) -> Result<bool> {
        let (had_listeners, failures) = self.dispatch(&event).await;
        if failures > 0 {
            return Err(Error::Listener {
                topic: event.topic,
                failures,
            });
        }
        Ok(had_listeners)
    }

    async fn dispatch(&self, event: &Event) -> (bool, usize) {
        let event_count = self.event_count.fetch_add(1, Ordering::SeqCst);

        if self.config.debug_mode {
            trace!(topic = %event.topic, source = %event.source, "Publishing event #{}", event_count + 1);
        }

        let snapshot = {
            let mut topics = self.topics.lock();
            let Some(list) = topics.get_mut(&event.topic) else {
                return (false, 0);
            };

            let snapshot = list.clone();
            // 일회성 리스너는 호출 전에 제거
            list.retain(|r| !r.once);
            if list.is_empty() {
                topics.remove(&event.topic);
            }
            snapshot
        };

        if snapshot.is_empty() {
            return (false, 0);
        }

        let mut failures = 0;
        for registered in &snapshot {
            trace!(
                listener_id = %registered.id,
                listener_name = registered.listener.name(),
                topic = %event.topic,
                "Delivering event to listener"
            );

            match AssertUnwindSafe(registered.listener.on_event(event))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    warn!(
                        topic = %event.topic,
                        listener_name = registered.listener.name(),
                        error = %e,
                        "Event listener failed"
                    );
                }
                Err(panic) => {
                    failures += 1;
                    error!(
                        topic = %event.topic,
                        listener_name = registered.listener.name(),
                        panic = %panic_message(panic.as_ref()),
                        "Event listener panicked"
                    );
                }
            }
        }

        (true, failures)
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 토픽의 리스너 수
    pub fn listener_count(&self, topic: &str) -> usize {
        self.topics.lock().get(topic).map(Vec::len).unwrap_or(0)
    }

    /// 리스너가 있는 토픽 목록
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.topics.lock().keys().cloned().collect();
        topics.sort();
        topics
    }

    /// 총 발행된 이벤트 수
    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// 테스트
// ============================================================================
