//! hello-world - 라우트 등록과 주기 이벤트 예시

use crate::plugin::events::{route_handler, AppInitialized, HttpMethod, RouteRegistration, APP_INITIALIZED};
use crate::plugin::traits::{Activatable, ConfigUpdatable, Plugin, PluginInit, Unloadable};
use async_trait::async_trait;
use chatplus_foundation::{listener_fn, Error, Event, EventBus, ListenerId, Result};
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub(super) const ENTRY: &str = "hello-world";

/// tick 이벤트 토픽
pub const TICK_TOPIC: &str = "hello-world.tick";

const ROUTE_PATH: &str = "/api/plugins/hello-world";
const MESSAGE_KEY: &str = "strings.errors.helloWorldPluginMessage";
const DEFAULT_MESSAGE: &str = "Hello from the hello-world plugin";
const DEFAULT_TICK_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Settings {
    show_on_start: bool,
    tick_interval: Duration,
}

impl Settings {
    fn from_config(config: &Map<String, Value>) -> Self {
        Self {
            show_on_start: config.get("showOnStart").and_then(Value::as_bool).unwrap_or(false),
            tick_interval: Duration::from_millis(
                config
                    .get("tickIntervalMs")
                    .and_then(Value::as_u64)
                    .filter(|ms| *ms > 0)
                    .unwrap_or(DEFAULT_TICK_MS),
            ),
        }
    }
}

pub struct HelloWorldPlugin {
    init: PluginInit,
    settings: Mutex<Settings>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    tick_listener: Mutex<Option<ListenerId>>,
    app_listener: Mutex<Option<ListenerId>>,
}

pub(super) fn create(init: PluginInit) -> Result<Arc<dyn Plugin>> {
    Ok(Arc::new(HelloWorldPlugin::new(init)))
}

impl HelloWorldPlugin {
    pub fn new(init: PluginInit) -> Self {
        let settings = Settings::from_config(&init.config);
        Self {
            init,
            settings: Mutex::new(settings),
            ticker: Mutex::new(None),
            tick_listener: Mutex::new(None),
            app_listener: Mutex::new(None),
        }
    }

    /// tick이 돌고 있는지
    pub fn is_ticking(&self) -> bool {
        self.ticker.lock().is_some()
    }

    pub fn tick_interval(&self) -> Duration {
        self.settings.lock().tick_interval
    }

    fn display_name(&self) -> &str {
        self.init.metadata.display_name(&self.init.name)
    }

    fn message(&self) -> String {
        self.init
            .config_lookup
            .get_str(MESSAGE_KEY)
            .unwrap_or(DEFAULT_MESSAGE)
            .to_string()
    }

    fn route(&self) -> RouteRegistration {
        let message = self.message();
        let name = self.init.name.clone();
        let version = self.init.metadata.version.clone();

        RouteRegistration::new(
            HttpMethod::Get,
            ROUTE_PATH,
            route_handler(move |_| {
                let body = json!({ "message": message, "pluginName": name, "version": version });
                async move { Ok::<_, Error>(body) }
            }),
        )
        .from_plugin(&self.init.name)
    }

    fn start_ticker(&self, interval: Duration) {
        let bus = Arc::clone(&self.init.event_bus);
        let source = self.init.name.clone();
        let handle = tokio::spawn(tick_loop(bus, source, interval));

        if let Some(previous) = self.ticker.lock().replace(handle) {
            previous.abort();
        }
    }

    fn stop_ticker(&self) {
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
        }
    }
}

async fn tick_loop(bus: Arc<EventBus>, source: String, period: Duration) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    loop {
        interval.tick().await;
        let event = Event::new(TICK_TOPIC, json!({ "timestamp": Utc::now().to_rfc3339() }))
            .with_source(source.as_str());
        bus.publish(event).await;
    }
}

#[async_trait]
impl Plugin for HelloWorldPlugin {
    async fn init(&self) -> Result<()> {
        let route = self.route();
        let logger = self.init.logger.clone();

        let id = self.init.event_bus.subscribe(
            APP_INITIALIZED,
            listener_fn("hello-world.routes", move |event| {
                let app = event
                    .extension::<AppInitialized>()
                    .ok_or_else(|| Error::InvalidInput("app.initialized without an app handle".into()))?;
                app.routes.register_route(route.clone())?;
                logger.info("Routes registered");
                Ok(())
            }),
        );
        *self.app_listener.lock() = Some(id);

        self.init.logger.info(format!("{} plugin initialized", self.display_name()));
        Ok(())
    }

    fn activation(&self) -> Option<&dyn Activatable> {
        Some(self)
    }

    fn unloadable(&self) -> Option<&dyn Unloadable> {
        Some(self)
    }

    fn config_updatable(&self) -> Option<&dyn ConfigUpdatable> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl Activatable for HelloWorldPlugin {
    async fn activate(&self) -> Result<()> {
        let settings = *self.settings.lock();
        if settings.show_on_start {
            self.init.logger.info(format!("{}: {}", self.display_name(), self.message()));
        }

        self.start_ticker(settings.tick_interval);

        let logger = self.init.logger.clone();
        let id = self.init.event_bus.subscribe(
            TICK_TOPIC,
            listener_fn("hello-world.tick-log", move |event| {
                logger.debug(format!("tick at {}", event.data["timestamp"]));
                Ok(())
            }),
        );
        if let Some(previous) = self.tick_listener.lock().replace(id) {
            self.init.event_bus.unsubscribe(TICK_TOPIC, previous);
        }

        self.init.logger.info(format!("{} plugin activated", self.display_name()));
        Ok(())
    }

    async fn deactivate(&self) -> Result<()> {
        self.stop_ticker();
        if let Some(id) = self.tick_listener.lock().take() {
            self.init.event_bus.unsubscribe(TICK_TOPIC, id);
        }

        self.init.logger.info(format!("{} plugin deactivated", self.display_name()));
        Ok(())
    }
}

#[async_trait]
impl Unloadable for HelloWorldPlugin {
    async fn unload(&self) -> Result<()> {
        self.deactivate().await?;
        if let Some(id) = self.app_listener.lock().take() {
            self.init.event_bus.unsubscribe(APP_INITIALIZED, id);
        }

        self.init.logger.info(format!("{} plugin unloaded", self.display_name()));
        Ok(())
    }
}

#[async_trait]
impl ConfigUpdatable for HelloWorldPlugin {
    async fn on_config_update(&self, _old: &Map<String, Value>, new: &Map<String, Value>) -> Result<()> {
        let updated = Settings::from_config(new);
        let previous = std::mem::replace(&mut *self.settings.lock(), updated);

        if self.is_ticking() && previous.tick_interval != updated.tick_interval {
            self.start_ticker(updated.tick_interval);
            self.init
                .logger
                .info(format!("tick interval changed to {}ms", updated.tick_interval.as_millis()));
        }
        Ok(())
    }
}

impl Drop for HelloWorldPlugin {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}
