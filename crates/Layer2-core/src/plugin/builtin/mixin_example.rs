//! mixin-example - mixin과 hook 사용 예시
//!
//! 활성화 시:
//! - `startup-mixin`: `app.initialized` 때 새 대상에 적용하고 `onServerStartup` 호출
//! - `example-mixin`: 로그인한 사용자 객체에 `getEnhancedInfo`, `toString`, `enhanced` 추가
//! - `user.login.before` / `user.login.after` hook (priority 10)

use crate::hook::{HookArgs, HookHandler, HookId, HookOptions};
use crate::mixin::{MixinBundle, MixinOptions, MixinRegistry, MixinTarget};
use crate::plugin::events::APP_INITIALIZED;
use crate::plugin::traits::{Activatable, Plugin, PluginInit, Unloadable};
use async_trait::async_trait;
use chatplus_foundation::{listener_fn, Error, ListenerId, PluginLogger, Result};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

pub(super) const ENTRY: &str = "mixin-example";

pub const STARTUP_MIXIN: &str = "startup-mixin";
pub const EXAMPLE_MIXIN: &str = "example-mixin";

pub const LOGIN_BEFORE_HOOK: &str = "user.login.before";
pub const LOGIN_AFTER_HOOK: &str = "user.login.after";

const HOOK_PRIORITY: i32 = 10;
const LOGIN_AFTER_DELAY: Duration = Duration::from_millis(100);

pub struct MixinExamplePlugin {
    init: PluginInit,
    hooks: Mutex<Vec<(&'static str, HookId)>>,
    app_listener: Mutex<Option<ListenerId>>,
}

pub(super) fn create(init: PluginInit) -> Result<Arc<dyn Plugin>> {
    Ok(Arc::new(MixinExamplePlugin::new(init)))
}

/// 대상의 `type` 필드, 없으면 `fallback`
fn type_name(this: &MixinTarget, fallback: &str) -> String {
    this.get_value("type")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| fallback.to_string())
}

fn startup_bundle(logger: PluginLogger) -> MixinBundle {
    MixinBundle::new().with_method("onServerStartup", move |_, _| {
        logger.info("Mixin test succeeded");
        Ok(Value::Null)
    })
}

fn example_bundle() -> MixinBundle {
    MixinBundle::new()
        .with_method("getEnhancedInfo", |this, _| {
            Ok(json!(format!("Enhanced info from {}", type_name(this, "object"))))
        })
        .with_method("toString", |this, _| {
            Ok(json!(format!("[Enhanced Object: {}]", type_name(this, "Unknown"))))
        })
        .with_value("enhanced", json!(true))
}

/// `startup-mixin`을 임시 대상에 적용해 실행하고 되돌림
fn run_startup_mixin(mixins: &MixinRegistry, logger: &PluginLogger) -> Result<()> {
    logger.info("Server started, applying startup mixin");
    if !mixins.is_registered(STARTUP_MIXIN) {
        return Ok(());
    }

    let handler = MixinTarget::new();
    mixins.try_apply(STARTUP_MIXIN, &handler, None)?;
    let result = handler.call("onServerStartup", &[]);
    mixins.try_remove(STARTUP_MIXIN)?;
    result.map(|_| ())
}

impl MixinExamplePlugin {
    pub fn new(init: PluginInit) -> Self {
        Self {
            init,
            hooks: Mutex::new(Vec::new()),
            app_listener: Mutex::new(None),
        }
    }

    /// 이 플러그인이 등록한 hook 핸들러 수
    pub fn hook_count(&self) -> usize {
        self.hooks.lock().len()
    }

    fn register_startup_mixin(&self) {
        let mixins = &self.init.mixins;
        mixins.register_with_options(
            STARTUP_MIXIN,
            startup_bundle(self.init.logger.clone()),
            MixinOptions::owned_by(&self.init.name).with_description("server startup output"),
        );

        let registry = Arc::clone(mixins);
        let logger = self.init.logger.clone();
        let id = self.init.event_bus.subscribe(
            APP_INITIALIZED,
            listener_fn("mixin-example.startup", move |_| run_startup_mixin(&registry, &logger)),
        );
        if let Some(previous) = self.app_listener.lock().replace(id) {
            self.init.event_bus.unsubscribe(APP_INITIALIZED, previous);
        }

        self.init.logger.info("Startup mixin registered");
    }

    fn register_example_mixin(&self) {
        self.init.mixins.register_with_options(
            EXAMPLE_MIXIN,
            example_bundle(),
            MixinOptions::owned_by(&self.init.name).with_description("enhanced user object"),
        );
        self.init.logger.info("Example mixin registered");
    }

    fn register_hooks(&self) {
        let hooks = &self.init.hooks;
        let mut ids = self.hooks.lock();

        let logger = self.init.logger.clone();
        let before = hooks.register_hook(
            LOGIN_BEFORE_HOOK,
            HookHandler::sync(move |args| {
                let username = args.first().and_then(Value::as_str).unwrap_or("unknown");
                logger.info(format!("Before user login: {}", username));
                Ok(())
            }),
            HookOptions::with_priority(HOOK_PRIORITY),
        );
        ids.push((LOGIN_BEFORE_HOOK, before));

        let logger = self.init.logger.clone();
        let mixins = Arc::clone(&self.init.mixins);
        let after = hooks.register_hook(
            LOGIN_AFTER_HOOK,
            HookHandler::asynchronous(move |args: HookArgs| {
                let logger = logger.clone();
                let mixins = Arc::clone(&mixins);
                async move {
                    let user = args
                        .target
                        .ok_or_else(|| Error::Hook("user.login.after without a user target".into()))?;
                    let username = user
                        .get_value("username")
                        .and_then(|v| v.as_str().map(str::to_string))
                        .unwrap_or_else(|| "unknown".to_string());
                    logger.info(format!("After user login: {}", username));

                    tokio::time::sleep(LOGIN_AFTER_DELAY).await;

                    if mixins.is_registered(EXAMPLE_MIXIN) {
                        // 이전 사용자에게 붙어 있던 적용은 먼저 되돌림
                        if mixins.is_applied(EXAMPLE_MIXIN) {
                            mixins.try_remove(EXAMPLE_MIXIN)?;
                        }
                        mixins.try_apply(EXAMPLE_MIXIN, &user, None)?;
                        logger.info("Applied example mixin to user object");
                    }
                    Ok::<_, Error>(())
                }
            }),
            HookOptions::with_priority(HOOK_PRIORITY).awaited(),
        );
        ids.push((LOGIN_AFTER_HOOK, after));

        self.init.logger.info("Example hooks registered");
    }

    /// 등록한 mixin, hook, 리스너를 모두 해제
    fn teardown(&self) {
        for name in [EXAMPLE_MIXIN, STARTUP_MIXIN] {
            if self.init.mixins.is_registered(name) {
                self.init.mixins.unregister(name);
            }
        }

        for (hook, id) in self.hooks.lock().drain(..) {
            self.init.hooks.remove_hook(hook, Some(id));
        }

        if let Some(id) = self.app_listener.lock().take() {
            self.init.event_bus.unsubscribe(APP_INITIALIZED, id);
        }
    }
}

#[async_trait]
impl Plugin for MixinExamplePlugin {
    async fn init(&self) -> Result<()> {
        self.init.logger.info(format!("Plugin {} initialized", self.init.name));
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
impl Activatable for MixinExamplePlugin {
    async fn activate(&self) -> Result<()> {
        self.init.logger.info(format!("Plugin {} activated", self.init.name));

        // 재활성화 시 중복 등록 방지
        self.teardown();

        self.register_startup_mixin();
        self.register_example_mixin();
        self.register_hooks();
        Ok(())
    }

    async fn deactivate(&self) -> Result<()> {
        self.init.logger.info(format!("Plugin {} deactivated", self.init.name));
        self.teardown();
        Ok(())
    }
}

#[async_trait]
impl Unloadable for MixinExamplePlugin {
    async fn unload(&self) -> Result<()> {
        self.teardown();
        Ok(())
    }
}
