use parking_lot::RwLock;
use std::collections::HashMap;

use crate::domain::{CaseId, Command, CommandId, CommandStatus};
use crate::error::{GridError, Result};

#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: RwLock<HashMap<CommandId, Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, command: Command) {
        self.commands.write().insert(command.id.clone(), command);
    }

    pub fn get(&self, id: &CommandId) -> Option<Command> {
        self.commands.read().get(id).cloned()
    }

    /// Settle a SENT command; fails if it already settled.
    pub fn settle(&self, id: &CommandId, status: CommandStatus, note: impl Into<String>) -> Result<Command> {
        let mut commands = self.commands.write();
        let command = commands
            .get_mut(id)
            .ok_or_else(|| GridError::not_found("Command", id))?;
        command.settle(status, note)?;
        Ok(command.clone())
    }

    /// Commands, optionally restricted to one case, oldest first
    pub fn list(&self, case: Option<&CaseId>) -> Vec<Command> {
        let mut commands: Vec<Command> = self
            .commands
            .read()
            .values()
            .filter(|c| case.map_or(true, |id| c.case_ref.as_ref() == Some(id)))
            .cloned()
            .collect();
        commands.sort_by(|a, b| a.issued_at.cmp(&b.issued_at).then_with(|| a.id.cmp(&b.id)));
        commands
    }
}
