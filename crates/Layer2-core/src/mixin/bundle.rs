//! Mixin Bundle - 재사용 가능한 멤버 묶음

use super::target::{Member, MethodFn, MixinTarget};
use chatplus_foundation::Result;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// 번들 멤버 (아직 대상에 바인딩되지 않은 상태)
#[derive(Clone)]
pub enum BundleMember {
    Value(Value),
    Method(MethodFn),
}

impl BundleMember {
    /// 대상에 붙일 멤버로 변환 (메서드는 receiver에 바인딩)
    pub(crate) fn bind_to(&self, receiver: &MixinTarget) -> Member {
        match self {
            BundleMember::Value(v) => Member::Value(v.clone()),
            BundleMember::Method(f) => receiver.bind(Arc::clone(f)),
        }
    }
}

/// 이름 -> 멤버 묶음, 선언 순서 유지
///
/// ```ignore
/// let bundle = MixinBundle::new()
///     .with_method("getEnhancedInfo", |this, _| Ok(json!("enhanced")))
///     .with_value("enhanced", json!(true));
/// ```
#[derive(Clone, Default)]
pub struct MixinBundle {
    members: Vec<(String, BundleMember)>,
}

impl MixinBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// 값 멤버 추가 (같은 이름이면 교체)
    pub fn with_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.put(name.into(), BundleMember::Value(value));
        self
    }

    /// 메서드 멤버 추가 (같은 이름이면 교체)
    pub fn with_method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&MixinTarget, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.put(name.into(), BundleMember::Method(Arc::new(f)));
        self
    }

    fn put(&mut self, name: String, member: BundleMember) {
        match self.members.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = member,
            None => self.members.push((name, member)),
        }
    }

    pub fn members(&self) -> &[(String, BundleMember)] {
        &self.members
    }

    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl fmt::Debug for MixinBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixinBundle")
            .field("members", &self.member_names())
            .finish()
    }
}
