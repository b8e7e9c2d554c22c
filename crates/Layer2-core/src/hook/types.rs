//! Hook Types - 핸들러, 옵션, 실행 결과

use crate::mixin::MixinTarget;
use chatplus_foundation::Result;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Hook 등록 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(pub(crate) u64);

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook-{}", self.0)
    }
}

/// Hook 호출 인자
///
/// `values`는 직렬화 가능한 인자, `target`은 mixin을 붙일 수 있는 객체
/// (예: 로그인한 사용자)입니다.
#[derive(Debug, Clone, Default)]
pub struct HookArgs {
    pub values: Vec<Value>,
    pub target: Option<MixinTarget>,
}

impl HookArgs {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values,
            target: None,
        }
    }

    pub fn with_target(mut self, target: MixinTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn first(&self) -> Option<&Value> {
        self.values.first()
    }
}

type SyncHookFn = Arc<dyn Fn(&HookArgs) -> Result<()> + Send + Sync>;
type AsyncHookFn = Arc<dyn Fn(HookArgs) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Hook 핸들러
#[derive(Clone)]
pub enum HookHandler {
    Sync(SyncHookFn),
    Async(AsyncHookFn),
}

impl HookHandler {
    /// 동기 클로저 핸들러
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&HookArgs) -> Result<()> + Send + Sync + 'static,
    {
        HookHandler::Sync(Arc::new(f))
    }

    /// 비동기 클로저 핸들러
    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn(HookArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        HookHandler::Async(Arc::new(move |args| f(args).boxed()))
    }
}

impl fmt::Debug for HookHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookHandler::Sync(_) => f.write_str("HookHandler::Sync"),
            HookHandler::Async(_) => f.write_str("HookHandler::Async"),
        }
    }
}

/// Hook 등록 옵션
#[derive(Debug, Clone, Copy, Default)]
pub struct HookOptions {
    /// 실행 순서 (작을수록 먼저)
    pub priority: i32,

    /// true면 trigger가 완료를 기다림
    pub is_async: bool,
}

impl HookOptions {
    pub fn with_priority(priority: i32) -> Self {
        Self {
            priority,
            is_async: false,
        }
    }

    pub fn awaited(mut self) -> Self {
        self.is_async = true;
        self
    }
}

/// trigger 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookReport {
    /// 호출된 핸들러 수
    pub executed: usize,

    /// 그중 실패(에러/패닉)한 수
    pub failed: usize,
}

impl HookReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}
