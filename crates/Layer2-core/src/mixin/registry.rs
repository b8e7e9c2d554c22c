//! Mixin Registry - 이름 붙은 번들의 등록/적용/복원

use super::bundle::MixinBundle;
use super::target::{Member, MixinTarget};
use chatplus_foundation::{Error, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// mixin 등록 옵션
#[derive(Debug, Clone, Default)]
pub struct MixinOptions {
    /// 설명
    pub description: Option<String>,

    /// 등록한 플러그인 이름
    pub owner: Option<String>,
}

impl MixinOptions {
    pub fn owned_by(owner: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// 등록된 mixin
#[derive(Debug, Clone)]
pub struct MixinDescriptor {
    pub name: String,
    pub bundle: MixinBundle,
    pub options: MixinOptions,
    pub registered_at: DateTime<Utc>,
}

/// 적용 중인 mixin의 복원 정보
///
/// `originals`의 `None`은 "적용 전에는 멤버가 없었음"을 뜻하며,
/// 복원 시 해당 멤버를 삭제합니다.
#[derive(Debug, Clone)]
pub struct AppliedMixinState {
    /// 적용 대상
    pub target: MixinTarget,

    /// 대상 안의 프로퍼티 객체 (있으면 여기에 멤버를 붙임)
    pub target_property: Option<String>,

    /// 실제로 멤버가 붙은 객체
    receiver: MixinTarget,

    /// 적용 시 프로퍼티 객체를 새로 만들었는지
    created_property: bool,

    /// 멤버 이름 -> 이전 멤버 (적용 순서)
    originals: Vec<(String, Option<Member>)>,

    pub applied_at: DateTime<Utc>,
}

impl AppliedMixinState {
    /// 멤버가 붙은 객체
    pub fn receiver(&self) -> &MixinTarget {
        &self.receiver
    }

    /// 이 mixin이 건드린 멤버 이름
    pub fn member_names(&self) -> Vec<&str> {
        self.originals.iter().map(|(n, _)| n.as_str()).collect()
    }
}

// ============================================================================
// MixinRegistry
// ============================================================================

/// mixin 레지스트리
///
/// 같은 mixin은 한 번에 하나의 대상에만 적용될 수 있습니다.
/// `remove`는 적용 전 상태를 정확히 복원합니다.
#[derive(Default)]
pub struct MixinRegistry {
    mixins: RwLock<HashMap<String, Arc<MixinDescriptor>>>,
    applied: RwLock<HashMap<String, AppliedMixinState>>,
}

impl MixinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // 등록
    // ========================================================================

    /// mixin 등록 (이미 있으면 false)
    pub fn register(&self, name: impl Into<String>, bundle: MixinBundle) -> bool {
        self.register_with_options(name, bundle, MixinOptions::default())
    }

    pub fn register_with_options(
        &self,
        name: impl Into<String>,
        bundle: MixinBundle,
        options: MixinOptions,
    ) -> bool {
        let name = name.into();
        let mut mixins = self.mixins.write();

        if mixins.contains_key(&name) {
            warn!(mixin = %name, "Mixin is already registered");
            return false;
        }

        debug!(mixin = %name, members = ?bundle.member_names(), "Registering mixin");
        mixins.insert(
            name.clone(),
            Arc::new(MixinDescriptor {
                name,
                bundle,
                options,
                registered_at: Utc::now(),
            }),
        );
        true
    }

    /// mixin 등록 해제 (적용 중이면 먼저 복원)
    pub fn unregister(&self, name: &str) -> bool {
        if self.is_applied(name) && !self.remove(name) {
            return false;
        }

        let removed = self.mixins.write().remove(name).is_some();
        if removed {
            debug!(mixin = %name, "Unregistered mixin");
        }
        removed
    }

    // ========================================================================
    // 적용 / 복원
    // ========================================================================

    /// mixin 적용, 실패 시 로그 후 false
    pub fn apply(&self, name: &str, target: &MixinTarget, target_property: Option<&str>) -> bool {
        match self.try_apply(name, target, target_property) {
            Ok(()) => true,
            Err(e) => {
                warn!(mixin = %name, error = %e, "Failed to apply mixin");
                false
            }
        }
    }

    pub fn try_apply(
        &self,
        name: &str,
        target: &MixinTarget,
        target_property: Option<&str>,
    ) -> Result<()> {
        let descriptor = self
            .descriptor(name)
            .ok_or_else(|| Error::NotFound(format!("mixin '{}'", name)))?;

        let mut applied = self.applied.write();
        if applied.contains_key(name) {
            return Err(Error::Mixin(format!("mixin '{}' is already applied", name)));
        }

        let (receiver, created_property) = match target_property {
            None => (target.clone(), false),
            Some(prop) => match target.get(prop) {
                Some(Member::Object(obj)) => (obj, false),
                Some(_) => {
                    return Err(Error::Mixin(format!(
                        "property '{}' of the target is not an object",
                        prop
                    )))
                }
                None => {
                    let obj = MixinTarget::new();
                    target.set_object(prop, obj.clone());
                    (obj, true)
                }
            },
        };

        let mut originals = Vec::with_capacity(descriptor.bundle.len());
        for (member_name, member) in descriptor.bundle.members() {
            let previous = receiver.insert(member_name.clone(), member.bind_to(&receiver));
            originals.push((member_name.clone(), previous));
        }

        applied.insert(
            name.to_string(),
            AppliedMixinState {
                target: target.clone(),
                target_property: target_property.map(str::to_string),
                receiver,
                created_property,
                originals,
                applied_at: Utc::now(),
            },
        );

        info!(mixin = %name, property = ?target_property, "Mixin applied");
        Ok(())
    }

    /// 적용된 mixin 복원, 실패 시 로그 후 false
    pub fn remove(&self, name: &str) -> bool {
        match self.try_remove(name) {
            Ok(()) => true,
            Err(e) => {
                warn!(mixin = %name, error = %e, "Failed to remove mixin");
                false
            }
        }
    }

    pub fn try_remove(&self, name: &str) -> Result<()> {
        let state = self
            .applied
            .write()
            .remove(name)
            .ok_or_else(|| Error::InvalidState(format!("mixin '{}' is not applied", name)))?;

        for (member_name, original) in state.originals.into_iter().rev() {
            match original {
                Some(member) => {
                    state.receiver.insert(member_name, member);
                }
                None => {
                    state.receiver.remove(&member_name);
                }
            }
        }

        if let (true, Some(prop)) = (state.created_property, state.target_property.as_deref()) {
            let still_ours = state
                .target
                .object(prop)
                .map(|obj| obj.ptr_eq(&state.receiver))
                .unwrap_or(false);
            if still_ours && state.receiver.is_empty() {
                state.target.remove(prop);
            }
        }

        info!(mixin = %name, "Mixin removed");
        Ok(())
    }

    // ========================================================================
    // 조회
    // ========================================================================

    pub fn is_registered(&self, name: &str) -> bool {
        self.mixins.read().contains_key(name)
    }

    pub fn is_applied(&self, name: &str) -> bool {
        self.applied.read().contains_key(name)
    }

    pub fn descriptor(&self, name: &str) -> Option<Arc<MixinDescriptor>> {
        self.mixins.read().get(name).cloned()
    }

    pub fn applied_state(&self, name: &str) -> Option<AppliedMixinState> {
        self.applied.read().get(name).cloned()
    }

    /// 등록된 mixin 이름 (정렬)
    pub fn list_registered(&self) -> Vec<String> {
        let mut names: Vec<String> = self.mixins.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// 적용 중인 mixin 이름 (정렬)
    pub fn list_applied(&self) -> Vec<String> {
        let mut names: Vec<String> = self.applied.read().keys().cloned().collect();
        names.sort();
        names
    }
}
