//! Plugin Events - 호스트와 주고받는 이벤트
//!
//! - `app.initialized`: 호스트 준비 완료, 라우트 등록기([`AppInitialized`])를 실어 보냄
//! - `route:register`: 플러그인이 라우트를 공지 ([`RouteRegistration`])
//! - `plugin.*`: 런타임이 발행하는 라이프사이클 알림

use async_trait::async_trait;
use chatplus_foundation::{Error, Event, EventBus, EventListener, ListenerId, Result};
use futures::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

// ============================================================================
// 토픽
// ============================================================================

pub const APP_INITIALIZED: &str = "app.initialized";
pub const ROUTE_REGISTER: &str = "route:register";

pub const PLUGIN_LOADED: &str = "plugin.loaded";
pub const PLUGIN_ACTIVATED: &str = "plugin.activated";
pub const PLUGIN_DEACTIVATED: &str = "plugin.deactivated";
pub const PLUGIN_UNLOADED: &str = "plugin.unloaded";
pub const PLUGIN_RELOADED: &str = "plugin.reloaded";

/// 런타임 라이프사이클 알림 이벤트
pub fn lifecycle_event(topic: &str, plugin: &str) -> Event {
    Event::new(topic, json!({ "plugin": plugin })).with_source("plugin-manager")
}

// ============================================================================
// Route 타입
// ============================================================================

/// HTTP 메서드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Patch => write!(f, "PATCH"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!("unknown HTTP method '{}'", other))),
        }
    }
}

/// 라우트 핸들러에 전달되는 요청
#[derive(Debug, Clone, Default)]
pub struct RouteRequest {
    pub params: Map<String, Value>,
    pub query: Map<String, Value>,
    pub body: Value,

    /// 인증된 사용자 (없으면 익명)
    pub user: Option<Value>,
}

impl RouteRequest {
    pub fn authenticated(user: Value) -> Self {
        Self {
            user: Some(user),
            ..Default::default()
        }
    }
}

/// 라우트 핸들러: 요청 -> JSON 응답
pub type RouteHandler = Arc<dyn Fn(RouteRequest) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// 클로저를 라우트 핸들러로 변환
pub fn route_handler<F, Fut>(f: F) -> RouteHandler
where
    F: Fn(RouteRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Arc::new(move |req| f(req).boxed())
}

/// 라우트 등록 요청
#[derive(Clone)]
pub struct RouteRegistration {
    pub method: HttpMethod,
    pub path: String,
    pub handler: RouteHandler,
    pub requires_auth: bool,

    /// 공지한 플러그인
    pub plugin: Option<String>,
}

impl RouteRegistration {
    pub fn new(method: HttpMethod, path: impl Into<String>, handler: RouteHandler) -> Self {
        Self {
            method,
            path: path.into(),
            handler,
            requires_auth: false,
            plugin: None,
        }
    }

    pub fn requiring_auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    pub fn from_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    /// 이벤트 페이로드로 쓰는 직렬화 가능한 부분
    pub fn describe(&self) -> Value {
        json!({
            "method": self.method,
            "path": self.path,
            "requiresAuth": self.requires_auth,
            "plugin": self.plugin,
        })
    }
}

impl std::fmt::Debug for RouteRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteRegistration")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("requires_auth", &self.requires_auth)
            .field("plugin", &self.plugin)
            .finish_non_exhaustive()
    }
}

/// 호스트가 제공하는 라우트 등록 capability
pub trait RouteRegistrar: Send + Sync {
    fn register_route(&self, route: RouteRegistration) -> Result<()>;
}

/// `app.initialized` 확장 페이로드
#[derive(Clone)]
pub struct AppInitialized {
    pub routes: Arc<dyn RouteRegistrar>,
}

/// `route:register` 공지
pub async fn announce_route(bus: &EventBus, route: RouteRegistration) -> bool {
    let source = route.plugin.clone().unwrap_or_else(|| "plugin".to_string());
    let event = Event::new(ROUTE_REGISTER, route.describe())
        .with_source(source)
        .with_extension(route);
    bus.publish(event).await
}

/// `app.initialized` 발행
pub async fn announce_app_initialized(bus: &EventBus, routes: Arc<dyn RouteRegistrar>) -> bool {
    let event = Event::simple(APP_INITIALIZED)
        .with_source("host")
        .with_extension(AppInitialized { routes });
    bus.publish(event).await
}

// ============================================================================
// RouteTable - 메모리 라우트 테이블
// ============================================================================

/// 메모리 라우트 테이블
///
/// `attach`하면 `route:register` 공지를 받아 등록하고, `app.initialized`의
/// 등록기로도 쓸 수 있습니다.
#[derive(Default)]
pub struct RouteTable {
    routes: RwLock<Vec<RouteRegistration>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `route:register` 구독
    pub fn attach(self: &Arc<Self>, bus: &EventBus) -> ListenerId {
        bus.subscribe(ROUTE_REGISTER, Arc::new(RouteCollector(Arc::clone(self))))
    }

    pub fn find(&self, method: HttpMethod, path: &str) -> Option<RouteRegistration> {
        self.routes
            .read()
            .iter()
            .find(|r| r.method == method && r.path == path)
            .cloned()
    }

    /// 등록된 라우트 설명 목록 (등록 순서)
    pub fn describe(&self) -> Vec<Value> {
        self.routes.read().iter().map(RouteRegistration::describe).collect()
    }

    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }

    /// 요청 디스패치
    pub async fn dispatch(&self, method: HttpMethod, path: &str, request: RouteRequest) -> Result<Value> {
        let route = self
            .find(method, path)
            .ok_or_else(|| Error::NotFound(format!("route {} {}", method, path)))?;

        if route.requires_auth && request.user.is_none() {
            return Err(Error::InvalidInput(format!(
                "route {} {} requires an authenticated user",
                method, path
            )));
        }

        (route.handler)(request).await
    }
}

impl RouteRegistrar for RouteTable {
    fn register_route(&self, route: RouteRegistration) -> Result<()> {
        let mut routes = self.routes.write();
        if routes.iter().any(|r| r.method == route.method && r.path == route.path) {
            return Err(Error::AlreadyExists(format!("route {} {}", route.method, route.path)));
        }

        info!(method = %route.method, path = %route.path, plugin = ?route.plugin, "Route registered");
        routes.push(route);
        Ok(())
    }
}

struct RouteCollector(Arc<RouteTable>);

#[async_trait]
impl EventListener for RouteCollector {
    fn name(&self) -> &str {
        "route-table"
    }

    async fn on_event(&self, event: &Event) -> Result<()> {
        match event.extension::<RouteRegistration>() {
            Some(route) => self.0.register_route(route.clone()),
            None => {
                warn!(source = %event.source, "route:register without a route payload");
                Err(Error::InvalidInput("route:register without a route payload".into()))
            }
        }
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.routes.read().iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatplus_foundation::listener_fn;

    fn ok_handler(message: &'static str) -> RouteHandler {
        route_handler(move |_| async move { Ok::<_, Error>(json!({ "message": message })) })
    }

    #[tokio::test]
    async fn test_route_announcement_reaches_table() {
        let bus = EventBus::new();
        let table = Arc::new(RouteTable::new());
        table.attach(&bus);

        let route = RouteRegistration::new(HttpMethod::Get, "/api/x", ok_handler("hi"))
            .requiring_auth()
            .from_plugin("x");
        assert!(announce_route(&bus, route).await);

        assert_eq!(table.len(), 1);
        assert_eq!(table.describe()[0]["requiresAuth"], true);
        assert_eq!(table.describe()[0]["method"], "GET");

        let anon = table.dispatch(HttpMethod::Get, "/api/x", RouteRequest::default()).await;
        assert!(matches!(anon, Err(Error::InvalidInput(_))));

        let response = table
            .dispatch(HttpMethod::Get, "/api/x", RouteRequest::authenticated(json!({ "id": 1 })))
            .await
            .unwrap();
        assert_eq!(response["message"], "hi");
    }

    #[tokio::test]
    async fn test_app_initialized_carries_registrar() {
        let bus = EventBus::new();
        let table = Arc::new(RouteTable::new());

        bus.subscribe(
            APP_INITIALIZED,
            listener_fn("registers", |event| {
                let app = event
                    .extension::<AppInitialized>()
                    .ok_or_else(|| Error::InvalidInput("missing app".into()))?;
                app.routes.register_route(RouteRegistration::new(
                    HttpMethod::Get,
                    "/api/plugins/demo",
                    ok_handler("demo"),
                ))
            }),
        );

        assert!(announce_app_initialized(&bus, table.clone()).await);
        assert!(table.find(HttpMethod::Get, "/api/plugins/demo").is_some());
        assert!(matches!(
            table.dispatch(HttpMethod::Post, "/api/plugins/demo", RouteRequest::default()).await,
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let table = RouteTable::new();
        table
            .register_route(RouteRegistration::new(HttpMethod::Get, "/a", ok_handler("a")))
            .unwrap();
        let dup = table.register_route(RouteRegistration::new(HttpMethod::Get, "/a", ok_handler("b")));
        assert!(matches!(dup, Err(Error::AlreadyExists(_))));
        assert_eq!("delete".parse::<HttpMethod>().unwrap(), HttpMethod::Delete);
    }
}
