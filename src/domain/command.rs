use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CaseId, CommandId, DeviceId, DeviceStatus};
use crate::error::{GridError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    Open,
    Close,
}

impl CommandKind {
    /// Device status after the command is acknowledged
    pub fn resulting_status(self) -> DeviceStatus {
        match self {
            CommandKind::Open => DeviceStatus::Open,
            CommandKind::Close => DeviceStatus::Closed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Actor {
    System,
    Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Sent,
    Acknowledged,
    Failed,
}

/// One switching instruction. Created SENT, settles exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: CommandId,
    pub issued_at: DateTime<Utc>,
    pub kind: CommandKind,
    pub target_device: DeviceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_ref: Option<CaseId>,
    pub actor: Actor,
    pub status: CommandStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<DateTime<Utc>>,
}

impl Command {
    pub fn sent(kind: CommandKind, target_device: DeviceId, actor: Actor, case_ref: Option<CaseId>) -> Self {
        Self {
            id: CommandId::generate(),
            issued_at: Utc::now(),
            kind,
            target_device,
            case_ref,
            actor,
            status: CommandStatus::Sent,
            response_note: None,
            settled_at: None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status != CommandStatus::Sent
    }

    /// Record the device's answer. A settled command is immutable.
    pub fn settle(&mut self, status: CommandStatus, note: impl Into<String>) -> Result<()> {
        if status == CommandStatus::Sent {
            return Err(GridError::validation("a command cannot settle back to SENT"));
        }
        if self.is_settled() {
            return Err(GridError::invalid_state(format!(
                "command {} already settled as {}",
                self.id, self.status
            )));
        }
        self.status = status;
        self.response_note = Some(note.into());
        self.settled_at = Some(Utc::now());
        Ok(())
    }
}
