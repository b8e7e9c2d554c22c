//! Permission Store - 플러그인별 승인된 권한
//!
//! 로드/언로드와 무관하게 프로세스가 살아 있는 동안 유지됩니다.
//! 아직 로드되지 않은 이름에도 미리 승인할 수 있습니다 (설정 파일의 `grants`).

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

#[derive(Debug, Default)]
pub struct PermissionStore {
    grants: RwLock<HashMap<String, BTreeSet<String>>>,
}

impl PermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 권한 추가, 새로 추가된 수 반환
    pub fn grant<I, S>(&self, name: &str, permissions: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut grants = self.grants.write();
        let set = grants.entry(name.to_string()).or_default();
        let added = permissions
            .into_iter()
            .map(Into::into)
            .filter(|p: &String| set.insert(p.clone()))
            .count();

        debug!(plugin = %name, added, total = set.len(), "Granted permissions");
        added
    }

    /// 권한 제거, 실제로 제거된 수 반환
    pub fn revoke<I, S>(&self, name: &str, permissions: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut grants = self.grants.write();
        let Some(set) = grants.get_mut(name) else {
            return 0;
        };

        let removed = permissions
            .into_iter()
            .filter(|p| set.remove(p.as_ref()))
            .count();
        if set.is_empty() {
            grants.remove(name);
        }

        debug!(plugin = %name, removed, "Revoked permissions");
        removed
    }

    /// 승인된 권한 (정렬)
    pub fn granted(&self, name: &str) -> Vec<String> {
        self.grants
            .read()
            .get(name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// `required` 중 승인되지 않은 것 (입력 순서 유지)
    pub fn missing(&self, name: &str, required: &[String]) -> Vec<String> {
        let grants = self.grants.read();
        let set = grants.get(name);
        required
            .iter()
            .filter(|p| !set.map(|s| s.contains(p.as_str())).unwrap_or(false))
            .cloned()
            .collect()
    }
}
