//! Built-in Plugins - 카탈로그에 기본 등록되는 플러그인
//!
//! - `hello-world`: 라우트 등록 + 주기적 tick 이벤트
//! - `example-permission`: 권한 선언, 이벤트 구독, 인증 라우트 공지
//! - `mixin-example`: mixin/hook 사용 예시

mod example_permission;
mod hello_world;
mod mixin_example;

pub use example_permission::{ExamplePermissionPlugin, MESSAGE_SEND_TOPIC, USER_LOGIN_TOPIC};
pub use hello_world::{HelloWorldPlugin, TICK_TOPIC};
pub use mixin_example::{
    MixinExamplePlugin, EXAMPLE_MIXIN, LOGIN_AFTER_HOOK, LOGIN_BEFORE_HOOK, STARTUP_MIXIN,
};

use super::catalog::PluginCatalog;

pub(crate) fn register_all(catalog: &mut PluginCatalog) {
    catalog.register(hello_world::ENTRY, hello_world::create);
    catalog.register(example_permission::ENTRY, example_permission::create);
    catalog.register(mixin_example::ENTRY, mixin_example::create);
}
