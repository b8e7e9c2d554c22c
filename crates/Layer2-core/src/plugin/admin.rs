//! Plugin Admin - 운영자용 관리 명령
//!
//! 각 명령은 성공 여부와 사람이 읽을 상태 문자열을 돌려줍니다.

use super::manager::PluginManager;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// 관리 명령
#[derive(Debug, Clone, PartialEq)]
pub enum AdminCommand {
    List,
    Show { name: String },
    Activate { name: String },
    Deactivate { name: String },
    Reload { name: String },
    Grant { name: String, permissions: Vec<String> },
    Revoke { name: String, permissions: Vec<String> },
    UpdateConfig { name: String, patch: Map<String, Value> },
}

/// 명령 결과
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    pub success: bool,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CommandOutcome {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// 관리 명령 실행기
pub struct PluginAdmin {
    manager: Arc<PluginManager>,
}

impl PluginAdmin {
    pub fn new(manager: Arc<PluginManager>) -> Self {
        Self { manager }
    }

    pub async fn execute(&self, command: AdminCommand) -> CommandOutcome {
        match command {
            AdminCommand::List => {
                let infos = self.manager.list().await;
                let message = format!("{} plugin(s) loaded", infos.len());
                CommandOutcome::ok(message).with_data(serde_json::to_value(&infos).unwrap_or(Value::Null))
            }
            AdminCommand::Show { name } => match self.manager.info(&name).await {
                Some(info) => CommandOutcome::ok(format!("Plugin '{}' is {}", name, info.state))
                    .with_data(serde_json::to_value(&info).unwrap_or(Value::Null)),
                None => CommandOutcome::failed(format!("Plugin '{}' is not loaded", name)),
            },
            AdminCommand::Activate { name } => {
                Self::transition(&name, "activated", self.manager.try_activate(&name).await)
            }
            AdminCommand::Deactivate { name } => {
                Self::transition(&name, "deactivated", self.manager.try_deactivate(&name).await)
            }
            AdminCommand::Reload { name } => {
                Self::transition(&name, "reloaded", self.manager.try_reload(&name).await)
            }
            AdminCommand::Grant { name, permissions } => {
                let listed = permissions.join(", ");
                self.manager.grant_permissions(&name, permissions);
                CommandOutcome::ok(format!("Granted [{}] to '{}'", listed, name))
                    .with_data(Value::from(self.manager.permissions(&name)))
            }
            AdminCommand::Revoke { name, permissions } => {
                let listed = permissions.join(", ");
                self.manager.revoke_permissions(&name, &permissions);
                CommandOutcome::ok(format!("Revoked [{}] from '{}'", listed, name))
                    .with_data(Value::from(self.manager.permissions(&name)))
            }
            AdminCommand::UpdateConfig { name, patch } => Self::transition(
                &name,
                "reconfigured",
                self.manager.try_update_config(&name, patch).await,
            ),
        }
    }

    fn transition(name: &str, done: &str, result: chatplus_foundation::Result<()>) -> CommandOutcome {
        match result {
            Ok(()) => CommandOutcome::ok(format!("Plugin '{}' {}", name, done)),
            Err(e) => CommandOutcome::failed(format!("Plugin '{}' was not {}: {}", name, done, e)),
        }
    }
}
