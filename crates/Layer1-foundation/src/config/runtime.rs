//! Runtime Config - 확장 런타임 설정
//!
//! TOML(기본) 또는 JSON 파일에서 로드합니다.
//!
//! ```toml
//! pluginDir = "plugins"
//! hotReload = true
//! transitionTimeoutMs = 10000
//!
//! [grants]
//! example-permission = ["user:read", "message:read"]
//!
//! [settings.strings.success]
//! permissionCheckPassed = "Permission check passed"
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// 기본 설정 파일명
pub const RUNTIME_CONFIG_FILE: &str = "chatplus.toml";

// ============================================================================
// RuntimeConfig
// ============================================================================

/// 확장 런타임 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// 플러그인 유닛 디렉토리
    #[serde(default = "default_plugin_dir")]
    pub plugin_dir: PathBuf,

    /// 부팅 시 핫 리로드 활성화
    #[serde(default)]
    pub hot_reload: bool,

    /// 파일 변경 이벤트 디바운스 (ms)
    #[serde(default = "default_debounce_ms")]
    pub hot_reload_debounce_ms: u64,

    /// 플러그인 전이(init/activate/...) 타임아웃 (ms), 없으면 무제한
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_timeout_ms: Option<u64>,

    /// 사전 승인된 권한 (플러그인 이름 -> 권한 목록)
    #[serde(default)]
    pub grants: HashMap<String, Vec<String>>,

    /// 플러그인에 노출되는 설정 트리 (ConfigLookup 대상)
    #[serde(default = "default_settings")]
    pub settings: serde_json::Value,
}

fn default_plugin_dir() -> PathBuf {
    PathBuf::from("plugins")
}

fn default_debounce_ms() -> u64 {
    200
}

fn default_settings() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            plugin_dir: default_plugin_dir(),
            hot_reload: false,
            hot_reload_debounce_ms: default_debounce_ms(),
            transition_timeout_ms: None,
            grants: HashMap::new(),
            settings: default_settings(),
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// 파일에서 로드 (`.json` 확장자면 JSON, 그 외는 TOML)
    ///
    /// 상대 경로인 `plugin_dir`은 설정 파일 위치 기준으로 해석합니다.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let mut config = Self::parse(&content, path)?;

        if config.plugin_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.plugin_dir = parent.join(&config.plugin_dir);
            }
        }

        debug!(path = %path.display(), plugin_dir = %config.plugin_dir.display(), "Loaded runtime config");
        Ok(config)
    }

    /// 파일이 없으면 기본값
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Ok(serde_json::from_str(content)?)
        } else {
            Ok(toml::from_str(content)?)
        }
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn with_plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plugin_dir = dir.into();
        self
    }

    pub fn with_grant(
        mut self,
        plugin: impl Into<String>,
        permissions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.grants
            .entry(plugin.into())
            .or_default()
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn with_transition_timeout(mut self, timeout: Duration) -> Self {
        self.transition_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn transition_timeout(&self) -> Option<Duration> {
        self.transition_timeout_ms.map(Duration::from_millis)
    }

    pub fn hot_reload_debounce(&self) -> Duration {
        Duration::from_millis(self.hot_reload_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.plugin_dir, PathBuf::from("plugins"));
        assert!(!config.hot_reload);
        assert_eq!(config.hot_reload_debounce(), Duration::from_millis(200));
        assert!(config.transition_timeout().is_none());
    }

    #[test]
    fn test_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RUNTIME_CONFIG_FILE);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
pluginDir = "ext"
hotReload = true
transitionTimeoutMs = 1500

[grants]
example-permission = ["user:read"]

[settings.strings.success]
permissionCheckPassed = "ok"
"#
        )
        .unwrap();

        let config = RuntimeConfig::load(&path).unwrap();
        assert_eq!(config.plugin_dir, dir.path().join("ext"));
        assert!(config.hot_reload);
        assert_eq!(config.transition_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.grants["example-permission"], vec!["user:read"]);
        assert_eq!(
            config.settings["strings"]["success"]["permissionCheckPassed"],
            "ok"
        );
    }

    #[test]
    fn test_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runtime.json");
        std::fs::write(&path, r#"{ "pluginDir": "/abs/plugins", "grants": { "c": ["x:read"] } }"#)
            .unwrap();

        let config = RuntimeConfig::load(&path).unwrap();
        assert_eq!(config.plugin_dir, PathBuf::from("/abs/plugins"));
        assert_eq!(config.grants["c"], vec!["x:read"]);
    }

    #[test]
    fn test_load_or_default_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = RuntimeConfig::load_or_default(dir.path().join("missing.toml")).unwrap();
        assert!(config.grants.is_empty());
    }

    #[test]
    fn test_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RUNTIME_CONFIG_FILE);
        std::fs::write(&path, "pluginDir = [").unwrap();
        assert!(matches!(RuntimeConfig::load(&path), Err(Error::Toml(_))));
    }

    #[test]
    fn test_with_grant_accumulates() {
        let config = RuntimeConfig::new()
            .with_grant("c", ["x:read"])
            .with_grant("c", ["x:write"]);
        assert_eq!(config.grants["c"], vec!["x:read", "x:write"]);
    }
}
