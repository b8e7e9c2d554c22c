//! Plugin Manifest - 유닛 메타데이터 (`plugin.json`)
//!
//! ```json
//! {
//!   "version": "1.0.0",
//!   "description": "Shows how permissions are declared",
//!   "permissions": ["user:read", "message:read"],
//!   "dependencies": ["hello-world"],
//!   "entry": "example-permission"
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 유닛의 진입점 디스크립터 파일명 (없으면 유효한 유닛이 아님)
pub const ENTRY_FILE: &str = "plugin.json";

/// 유닛 로컬 설정 파일명 (선택)
pub const CONFIG_FILE: &str = "config.json";

/// 플러그인 메타데이터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginMetadata {
    /// 버전
    #[serde(default = "default_version")]
    pub version: String,

    /// 설명
    #[serde(default)]
    pub description: String,

    /// 작성자
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// 활성화에 필요한 권한
    #[serde(default)]
    pub permissions: Vec<String>,

    /// 먼저 로드되어야 하는 플러그인 이름
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// 카탈로그 팩토리 이름 (없으면 디렉토리 이름)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,

    /// 그 밖의 필드 (그대로 보존)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_version() -> String {
    "0.0.0".to_string()
}

impl Default for PluginMetadata {
    fn default() -> Self {
        Self {
            version: default_version(),
            description: String::new(),
            author: None,
            permissions: Vec::new(),
            dependencies: Vec::new(),
            entry: None,
            extra: Map::new(),
        }
    }
}

impl PluginMetadata {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = Some(entry.into());
        self
    }

    /// 카탈로그에서 찾을 팩토리 이름
    pub fn entry_name<'a>(&'a self, unit_name: &'a str) -> &'a str {
        self.entry.as_deref().unwrap_or(unit_name)
    }

    /// 메타데이터 안의 표시 이름 (`displayName`), 없으면 유닛 이름
    pub fn display_name<'a>(&'a self, unit_name: &'a str) -> &'a str {
        self.extra
            .get("displayName")
            .and_then(Value::as_str)
            .unwrap_or(unit_name)
    }
}
