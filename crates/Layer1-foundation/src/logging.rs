//! Plugin Logging - 플러그인에 주입되는 로깅 capability
//!
//! 모든 로그는 `chatplus::plugin` 타깃과 `plugin` 필드를 달고 나갑니다.
//! 구독자(tracing-subscriber) 설정은 바이너리 쪽 책임입니다.

use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Span};

/// 플러그인 이름이 붙은 로거 핸들
#[derive(Debug, Clone)]
pub struct PluginLogger {
    plugin: Arc<str>,
}

impl PluginLogger {
    pub fn new(plugin: impl AsRef<str>) -> Self {
        Self {
            plugin: Arc::from(plugin.as_ref()),
        }
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn debug(&self, message: impl Display) {
        debug!(target: "chatplus::plugin", plugin = %self.plugin, "{}", message);
    }

    pub fn info(&self, message: impl Display) {
        info!(target: "chatplus::plugin", plugin = %self.plugin, "{}", message);
    }

    pub fn warn(&self, message: impl Display) {
        warn!(target: "chatplus::plugin", plugin = %self.plugin, "{}", message);
    }

    pub fn error(&self, message: impl Display) {
        error!(target: "chatplus::plugin", plugin = %self.plugin, "{}", message);
    }

    /// 플러그인 작업을 묶는 span
    pub fn span(&self, operation: &'static str) -> Span {
        info_span!("plugin", name = %self.plugin, op = operation)
    }
}
