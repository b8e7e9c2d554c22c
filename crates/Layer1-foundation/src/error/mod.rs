//! Error types for ChatPlus
//!
//! 확장 런타임의 모든 에러를 중앙에서 관리
//!
//! 런타임 경계에서는 대부분 로컬 복구(로그 + `false`)되지만,
//! `try_*` 계열 API는 아래 타입을 그대로 돌려줍니다.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// ChatPlus 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 플러그인 발견 / 의존성
    // ========================================================================
    #[error("Discovery error: {0}")]
    Discovery(String),

    #[error("Dependency error: plugin '{plugin}' requires '{dependency}': {reason}")]
    Dependency {
        plugin: String,
        dependency: String,
        reason: String,
    },

    #[error("Dependency cycle detected: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    // ========================================================================
    // 권한
    // ========================================================================
    #[error("Permission denied: plugin '{plugin}' lacks {}", .missing.join(", "))]
    PermissionDenied { plugin: String, missing: Vec<String> },

    // ========================================================================
    // 라이프사이클
    // ========================================================================
    #[error("Plugin '{plugin}' failed during {stage}: {message}")]
    Lifecycle {
        plugin: String,
        stage: String,
        message: String,
    },

    #[error("Cannot unload '{plugin}': still required by {}", .dependents.join(", "))]
    Referential {
        plugin: String,
        dependents: Vec<String>,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    // ========================================================================
    // Mixin / Hook / Event
    // ========================================================================
    #[error("Mixin error: {0}")]
    Mixin(String),

    #[error("Hook error: {0}")]
    Hook(String),

    #[error("{failures} listener(s) failed on topic '{topic}'")]
    Listener { topic: String, failures: usize },

    // ========================================================================
    // 실행 관련
    // ========================================================================
    #[error("Timeout: {0}")]
    Timeout(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 운영자에게 그대로 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::PermissionDenied { .. }
                | Error::Dependency { .. }
                | Error::DependencyCycle(_)
                | Error::Referential { .. }
                | Error::NotFound(_)
                | Error::AlreadyExists(_)
                | Error::InvalidInput(_)
        )
    }

    /// 라이프사이클 에러 생성 헬퍼
    pub fn lifecycle(
        plugin: impl Into<String>,
        stage: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Error::Lifecycle {
            plugin: plugin.into(),
            stage: stage.into(),
            message: message.to_string(),
        }
    }

    /// 의존성 에러 생성 헬퍼
    pub fn dependency(
        plugin: impl Into<String>,
        dependency: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::Dependency {
            plugin: plugin.into(),
            dependency: dependency.into(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}

/// 플러그인 작성자가 `anyhow`로 작성한 코드를 `?`로 올릴 수 있도록
impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Internal(format!("{e:#}"))
    }
}

/// `catch_unwind`로 잡은 패닉 페이로드를 문자열로
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
