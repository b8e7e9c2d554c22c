//! Plugin Discovery - 플러그인 디렉토리 스캔과 유닛 읽기
//!
//! `<plugin_dir>/<name>/plugin.json`이 있는 디렉토리만 유닛으로 인정합니다.

use super::manifest::{PluginMetadata, CONFIG_FILE, ENTRY_FILE};
use chatplus_foundation::{Error, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

// ============================================================================
// PluginUnit - 읽어 들인 유닛
// ============================================================================

/// 디스크에서 읽은 플러그인 유닛
#[derive(Debug, Clone)]
pub struct PluginUnit {
    /// 디렉토리 이름 = 플러그인 이름
    pub name: String,

    /// 유닛 디렉토리
    pub path: PathBuf,

    /// plugin.json
    pub metadata: PluginMetadata,

    /// config.json (없으면 빈 맵)
    pub config: Map<String, Value>,
}

// ============================================================================
// PluginDiscovery
// ============================================================================

/// 플러그인 발견 시스템
#[derive(Debug, Clone)]
pub struct PluginDiscovery {
    plugin_dir: PathBuf,
}

impl PluginDiscovery {
    pub fn new(plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
        }
    }

    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    /// 유닛 디렉토리 경로
    pub fn unit_path(&self, name: &str) -> PathBuf {
        self.plugin_dir.join(name)
    }

    /// 유효한 유닛 이름 목록 (정렬)
    ///
    /// 디렉토리가 없으면 경고 후 빈 목록을 돌려줍니다.
    pub async fn discover(&self) -> Vec<String> {
        let mut entries = match fs::read_dir(&self.plugin_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.plugin_dir.display(), error = %e, "Plugin directory is not readable");
                return Vec::new();
            }
        };

        let mut names = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %self.plugin_dir.display(), error = %e, "Failed to read plugin directory entry");
                    break;
                }
            };

            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if fs::metadata(entry.path().join(ENTRY_FILE)).await.is_ok() {
                names.push(name);
            } else {
                debug!(unit = %name, "Skipping directory without {}", ENTRY_FILE);
            }
        }

        names.sort();
        debug!(dir = %self.plugin_dir.display(), count = names.len(), "Discovered plugin units");
        names
    }

    /// 유닛 읽기: plugin.json(필수) + config.json(선택)
    pub async fn read_unit(&self, name: &str) -> Result<PluginUnit> {
        validate_unit_name(name)?;

        let path = self.unit_path(name);
        let entry_path = path.join(ENTRY_FILE);

        let content = fs::read_to_string(&entry_path).await.map_err(|e| {
            Error::Discovery(format!(
                "plugin '{}' has no readable {} at {}: {}",
                name,
                ENTRY_FILE,
                entry_path.display(),
                e
            ))
        })?;

        let metadata: PluginMetadata = serde_json::from_str(&content).map_err(|e| {
            Error::Discovery(format!("plugin '{}' has malformed {}: {}", name, ENTRY_FILE, e))
        })?;

        let config = read_config(name, &path.join(CONFIG_FILE)).await?;

        Ok(PluginUnit {
            name: name.to_string(),
            path,
            metadata,
            config,
        })
    }
}

/// 유닛 이름은 디렉토리 한 단계만 가리켜야 함
fn validate_unit_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(Error::InvalidInput(format!("invalid plugin name '{}'", name)));
    }
    Ok(())
}

async fn read_config(name: &str, path: &Path) -> Result<Map<String, Value>> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::Discovery(format!(
            "plugin '{}' has a {} that is not a JSON object",
            name, CONFIG_FILE
        ))),
        Err(e) => Err(Error::Discovery(format!(
            "plugin '{}' has malformed {}: {}",
            name, CONFIG_FILE, e
        ))),
    }
}
