//! Plugin traits - 핵심 플러그인 인터페이스
//!
//! 필수 trait은 [`Plugin`] 하나이고, 나머지 능력(활성화, 언로드, 라이프사이클
//! 훅, 설정 갱신)은 accessor가 `Some`을 돌려줄 때만 런타임이 호출합니다.

use super::manifest::PluginMetadata;
use crate::hook::HookRegistry;
use crate::mixin::MixinRegistry;
use async_trait::async_trait;
use chatplus_foundation::{ConfigLookup, EventBus, PluginLogger, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::any::Any;
use std::sync::Arc;

// ============================================================================
// PluginCapability - 플러그인 기능 열거
// ============================================================================

/// 플러그인이 구현한 선택적 능력
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginCapability {
    /// activate / deactivate
    Activation,

    /// unload
    Unload,

    /// before_* / after_* 라이프사이클 훅
    LifecycleHooks,

    /// 설정 핫 업데이트
    ConfigUpdate,
}

// ============================================================================
// PluginInit - 플러그인 생성 시 주입되는 capability
// ============================================================================

/// 플러그인 생성 시 주입되는 값
#[derive(Clone)]
pub struct PluginInit {
    /// 유닛 디렉토리 이름 = 플러그인 이름
    pub name: String,

    /// plugin.json 메타데이터
    pub metadata: PluginMetadata,

    /// config.json 내용 (없으면 빈 맵)
    pub config: Map<String, Value>,

    /// 플러그인 이름이 붙은 로거
    pub logger: PluginLogger,

    /// 호스트 설정 조회 (`strings.*` 등)
    pub config_lookup: ConfigLookup,

    /// 이벤트 버스
    pub event_bus: Arc<EventBus>,

    /// mixin 레지스트리
    pub mixins: Arc<MixinRegistry>,

    /// hook 레지스트리
    pub hooks: Arc<HookRegistry>,
}

impl PluginInit {
    /// 설정 값 조회
    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }
}

impl std::fmt::Debug for PluginInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginInit")
            .field("name", &self.name)
            .field("metadata", &self.metadata)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Plugin Trait - 모든 플러그인이 구현해야 하는 인터페이스
// ============================================================================

/// 플러그인 트레이트
#[async_trait]
pub trait Plugin: Send + Sync {
    /// 로드 시 한 번 호출
    ///
    /// 이벤트 구독, 라우트 공지 등은 여기서 합니다.
    async fn init(&self) -> Result<()>;

    fn activation(&self) -> Option<&dyn Activatable> {
        None
    }

    fn unloadable(&self) -> Option<&dyn Unloadable> {
        None
    }

    fn lifecycle_hooks(&self) -> Option<&dyn LifecycleHooks> {
        None
    }

    fn config_updatable(&self) -> Option<&dyn ConfigUpdatable> {
        None
    }

    /// 구현된 선택적 능력 목록
    fn capabilities(&self) -> Vec<PluginCapability> {
        let mut caps = Vec::new();
        if self.activation().is_some() {
            caps.push(PluginCapability::Activation);
        }
        if self.unloadable().is_some() {
            caps.push(PluginCapability::Unload);
        }
        if self.lifecycle_hooks().is_some() {
            caps.push(PluginCapability::LifecycleHooks);
        }
        if self.config_updatable().is_some() {
            caps.push(PluginCapability::ConfigUpdate);
        }
        caps
    }

    /// 타입 캐스팅을 위한 헬퍼 (다운캐스팅 지원)
    fn as_any(&self) -> &dyn Any;
}

/// 활성화 능력
#[async_trait]
pub trait Activatable: Send + Sync {
    async fn activate(&self) -> Result<()>;

    async fn deactivate(&self) -> Result<()> {
        Ok(())
    }
}

/// 언로드 능력
#[async_trait]
pub trait Unloadable: Send + Sync {
    async fn unload(&self) -> Result<()>;
}

/// 라이프사이클 전후 훅 (모두 선택)
#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    async fn before_init(&self) -> Result<()> {
        Ok(())
    }

    async fn before_activate(&self) -> Result<()> {
        Ok(())
    }

    async fn after_activate(&self) -> Result<()> {
        Ok(())
    }

    async fn before_deactivate(&self) -> Result<()> {
        Ok(())
    }

    async fn after_deactivate(&self) -> Result<()> {
        Ok(())
    }

    async fn before_unload(&self) -> Result<()> {
        Ok(())
    }

    async fn after_unload(&self) -> Result<()> {
        Ok(())
    }
}

/// 설정 핫 업데이트 능력
#[async_trait]
pub trait ConfigUpdatable: Send + Sync {
    async fn on_config_update(&self, old: &Map<String, Value>, new: &Map<String, Value>) -> Result<()>;
}

// ============================================================================
// PluginState
// ============================================================================

/// 플러그인 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginState {
    /// 로드됨 (아직 활성화 안됨)
    Loaded,

    /// 활성화됨
    Active,

    /// 비활성화됨
    Inactive,
}

impl std::fmt::Display for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded => write!(f, "loaded"),
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}
