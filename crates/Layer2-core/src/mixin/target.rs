//! Mixin Target - 멤버 사이드 테이블을 가진 동적 객체
//!
//! 구조체 필드를 런타임에 바꾸는 대신, 이름 -> 멤버 맵을 가진 공유 핸들을
//! 대상으로 삼습니다. 메서드 멤버는 자신이 붙은 객체(receiver)에 바인딩됩니다.

use chatplus_foundation::{Error, Result};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// 메서드 구현: (receiver, args) -> 반환값
pub type MethodFn = Arc<dyn Fn(&MixinTarget, &[Value]) -> Result<Value> + Send + Sync>;

// ============================================================================
// Member
// ============================================================================

/// receiver에 바인딩된 메서드
///
/// receiver는 약한 참조로 들고 있어 대상 객체와 순환 참조를 만들지 않습니다.
#[derive(Clone)]
pub struct BoundMethod {
    func: MethodFn,
    receiver: Weak<RwLock<BTreeMap<String, Member>>>,
}

impl BoundMethod {
    /// 바인딩된 receiver로 호출
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        let inner = self
            .receiver
            .upgrade()
            .ok_or_else(|| Error::Mixin("method receiver has been dropped".to_string()))?;
        (self.func)(&MixinTarget { inner }, args)
    }

    /// receiver가 `target`인지
    pub fn is_bound_to(&self, target: &MixinTarget) -> bool {
        Weak::ptr_eq(&self.receiver, &Arc::downgrade(&target.inner))
    }
}

/// 대상 객체의 멤버
#[derive(Clone)]
pub enum Member {
    /// 일반 값
    Value(Value),
    /// 바인딩된 메서드
    Method(BoundMethod),
    /// 중첩 객체 (target property)
    Object(MixinTarget),
}

impl Member {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Member::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_method(&self) -> bool {
        matches!(self, Member::Method(_))
    }
}

/// 관찰 가능한 동일성: 값은 값 비교, 메서드/객체는 동일 인스턴스 비교
impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Member::Value(a), Member::Value(b)) => a == b,
            (Member::Method(a), Member::Method(b)) => {
                Arc::ptr_eq(&a.func, &b.func) && Weak::ptr_eq(&a.receiver, &b.receiver)
            }
            (Member::Object(a), Member::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Member::Method(_) => f.write_str("Method(..)"),
            Member::Object(obj) => f.debug_tuple("Object").field(&obj.keys()).finish(),
        }
    }
}

// ============================================================================
// MixinTarget
// ============================================================================

/// mixin을 적용할 수 있는 공유 객체 핸들
///
/// `clone()`은 같은 객체를 가리키는 핸들을 만듭니다.
#[derive(Clone, Default)]
pub struct MixinTarget {
    inner: Arc<RwLock<BTreeMap<String, Member>>>,
}

impl MixinTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON 객체의 필드로 초기화
    pub fn from_json(value: Value) -> Self {
        let target = Self::new();
        if let Value::Object(map) = value {
            let mut inner = target.inner.write();
            for (key, value) in map {
                inner.insert(key, Member::Value(value));
            }
        }
        target
    }

    // ========================================================================
    // 멤버 접근
    // ========================================================================

    pub fn get(&self, name: &str) -> Option<Member> {
        self.inner.read().get(name).cloned()
    }

    pub fn get_value(&self, name: &str) -> Option<Value> {
        self.get(name).and_then(|m| m.as_value().cloned())
    }

    /// 중첩 객체 조회
    pub fn object(&self, name: &str) -> Option<MixinTarget> {
        match self.get(name) {
            Some(Member::Object(obj)) => Some(obj),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().contains_key(name)
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// 전체 멤버 복사본 (상태 비교용)
    pub fn snapshot(&self) -> BTreeMap<String, Member> {
        self.inner.read().clone()
    }

    // ========================================================================
    // 멤버 변경
    // ========================================================================

    /// 멤버를 넣고 이전 멤버를 반환
    pub fn insert(&self, name: impl Into<String>, member: Member) -> Option<Member> {
        self.inner.write().insert(name.into(), member)
    }

    pub fn set_value(&self, name: impl Into<String>, value: Value) -> Option<Member> {
        self.insert(name, Member::Value(value))
    }

    pub fn set_object(&self, name: impl Into<String>, object: MixinTarget) -> Option<Member> {
        self.insert(name, Member::Object(object))
    }

    /// 메서드를 이 객체에 바인딩해서 넣음
    pub fn set_method(&self, name: impl Into<String>, func: MethodFn) -> Option<Member> {
        let bound = self.bind(func);
        self.insert(name, bound)
    }

    pub fn remove(&self, name: &str) -> Option<Member> {
        self.inner.write().remove(name)
    }

    /// 메서드를 이 객체를 receiver로 바인딩
    pub fn bind(&self, func: MethodFn) -> Member {
        Member::Method(BoundMethod {
            func,
            receiver: Arc::downgrade(&self.inner),
        })
    }

    // ========================================================================
    // 호출
    // ========================================================================

    /// 메서드 멤버 호출
    ///
    /// 락을 잡지 않은 상태에서 호출하므로 메서드가 receiver를 읽고 써도 됩니다.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        match self.get(name) {
            Some(Member::Method(method)) => method.call(args),
            Some(_) => Err(Error::Mixin(format!("member '{}' is not callable", name))),
            None => Err(Error::NotFound(format!("member '{}'", name))),
        }
    }

    pub fn ptr_eq(&self, other: &MixinTarget) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for MixinTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.read().iter()).finish()
    }
}
