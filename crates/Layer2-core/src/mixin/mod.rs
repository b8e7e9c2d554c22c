//! Mixin System - 런타임 멤버 주입과 복원
//!
//! 플러그인이 기존 객체에 값과 메서드를 붙였다가 나중에 원래대로 되돌릴 수
//! 있게 합니다.
//!
//! ```text
//! register("example-mixin", bundle)
//!        │
//!        ▼
//! apply(name, target, property?) ──► 이전 멤버 기록 + 메서드 바인딩
//!        │
//!        ▼
//! remove(name) ──► 역순 복원, 없던 멤버 삭제, 만든 프로퍼티 객체 정리
//! ```

mod bundle;
mod registry;
mod target;

pub use bundle::{BundleMember, MixinBundle};
pub use registry::{AppliedMixinState, MixinDescriptor, MixinOptions, MixinRegistry};
pub use target::{BoundMethod, Member, MethodFn, MixinTarget};
