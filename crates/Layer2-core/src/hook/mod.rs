//! # Hook System
//!
//! 이름 붙은 확장 지점. 플러그인이 `user.login.before` 같은 hook에 핸들러를
//! 걸고, 호스트가 `trigger`로 실행합니다.
//!
//! ```ignore
//! let id = hooks.register_hook(
//!     "user.login.after",
//!     HookHandler::asynchronous(|args| async move { Ok(()) }),
//!     HookOptions::with_priority(10).awaited(),
//! );
//! hooks.trigger("user.login.after", HookArgs::new(vec![json!({ "id": 1 })])).await;
//! hooks.remove_hook("user.login.after", Some(id));
//! ```

mod registry;
mod types;

pub use registry::HookRegistry;
pub use types::{HookArgs, HookHandler, HookId, HookOptions, HookReport};
