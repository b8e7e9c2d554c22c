//! example-permission - 권한 선언과 인증 라우트 예시

use crate::plugin::events::{announce_route, route_handler, HttpMethod, RouteRegistration};
use crate::plugin::traits::{Activatable, Plugin, PluginInit, Unloadable};
use async_trait::async_trait;
use chatplus_foundation::{listener_fn, Error, Event, ListenerId, PluginLogger, Result};
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub(super) const ENTRY: &str = "example-permission";

pub const USER_LOGIN_TOPIC: &str = "user:login";
pub const MESSAGE_SEND_TOPIC: &str = "message:send";

const ROUTE_PATH: &str = "/api/example-permission";
const SUCCESS_KEY: &str = "strings.success.permissionCheckPassed";
const PREVIEW_CHARS: usize = 20;

pub struct ExamplePermissionPlugin {
    init: PluginInit,
    active: Arc<AtomicBool>,
    listeners: Mutex<Vec<(&'static str, ListenerId)>>,
}

pub(super) fn create(init: PluginInit) -> Result<Arc<dyn Plugin>> {
    Ok(Arc::new(ExamplePermissionPlugin::new(init)))
}

impl ExamplePermissionPlugin {
    pub fn new(init: PluginInit) -> Self {
        Self {
            init,
            active: Arc::new(AtomicBool::new(false)),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// 현재 구독 중인 리스너 수
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// 이벤트 리스너 구독 (이미 구독 중이면 무시)
    fn subscribe_listeners(&self) {
        let mut listeners = self.listeners.lock();
        if !listeners.is_empty() {
            return;
        }

        let bus = &self.init.event_bus;

        let (active, logger) = (Arc::clone(&self.active), self.init.logger.clone());
        let login = bus.subscribe(
            USER_LOGIN_TOPIC,
            listener_fn("example-permission.user-login", move |event| {
                if active.load(Ordering::SeqCst) {
                    on_user_login(&logger, event);
                }
                Ok(())
            }),
        );

        let (active, logger) = (Arc::clone(&self.active), self.init.logger.clone());
        let message = bus.subscribe(
            MESSAGE_SEND_TOPIC,
            listener_fn("example-permission.message-send", move |event| {
                if active.load(Ordering::SeqCst) {
                    on_message_send(&logger, event);
                }
                Ok(())
            }),
        );

        listeners.push((USER_LOGIN_TOPIC, login));
        listeners.push((MESSAGE_SEND_TOPIC, message));
    }

    fn unsubscribe_listeners(&self) {
        for (topic, id) in self.listeners.lock().drain(..) {
            self.init.event_bus.unsubscribe(topic, id);
        }
    }

    fn route(&self) -> RouteRegistration {
        let message = self.init.config_lookup.get_str_or_key(SUCCESS_KEY).to_string();
        let required = self.init.metadata.permissions.clone();

        RouteRegistration::new(
            HttpMethod::Get,
            ROUTE_PATH,
            route_handler(move |_| {
                let body = json!({
                    "success": true,
                    "message": message,
                    "requiredPermissions": required,
                    "timestamp": Utc::now().to_rfc3339(),
                });
                async move { Ok::<_, Error>(body) }
            }),
        )
        .requiring_auth()
        .from_plugin(&self.init.name)
    }
}

fn on_user_login(logger: &PluginLogger, event: &Event) {
    match event.data.get("username").and_then(Value::as_str) {
        Some(username) => logger.info(format!("User logged in: {}", username)),
        None => logger.error("Error handling user login: missing username"),
    }
}

fn on_message_send(logger: &PluginLogger, event: &Event) {
    let from = event.data.get("from").and_then(Value::as_str).unwrap_or("unknown");
    match event.data.get("content").and_then(Value::as_str) {
        Some(content) => logger.info(format!("Message sent from {}: {}...", from, preview(content))),
        None => logger.error("Error handling message send: missing content"),
    }
}

/// 앞 20자 (문자 단위)
fn preview(content: &str) -> &str {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

#[async_trait]
impl Plugin for ExamplePermissionPlugin {
    async fn init(&self) -> Result<()> {
        self.init.logger.info(format!("Initializing {} plugin", self.init.name));

        self.subscribe_listeners();
        if !announce_route(&self.init.event_bus, self.route()).await {
            self.init.logger.warn(format!("Route {} was not accepted by every listener", ROUTE_PATH));
        }
        Ok(())
    }

    fn activation(&self) -> Option<&dyn Activatable> {
        Some(self)
    }

    fn unloadable(&self) -> Option<&dyn Unloadable> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl Activatable for ExamplePermissionPlugin {
    async fn activate(&self) -> Result<()> {
        self.init.logger.info(format!("Activating {} plugin", self.init.name));
        self.subscribe_listeners();
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn deactivate(&self) -> Result<()> {
        self.init.logger.info(format!("Deactivating {} plugin", self.init.name));
        self.active.store(false, Ordering::SeqCst);
        self.unsubscribe_listeners();
        Ok(())
    }
}

#[async_trait]
impl Unloadable for ExamplePermissionPlugin {
    async fn unload(&self) -> Result<()> {
        self.active.store(false, Ordering::SeqCst);
        self.unsubscribe_listeners();
        Ok(())
    }
}
