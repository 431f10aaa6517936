//! Command registry - catalog of routable commands
//!
//! Commands are declared in a tree of groups. Only leaf commands are
//! routable; groups exist for organisation and are flattened depth-first in
//! declaration order.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::command::CommandDescriptor;

/// Problems found while building the registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Duplicate command name: {0}")]
    DuplicateCommand(String),

    #[error("Command name '{0}' cannot be used as a route segment")]
    InvalidName(String),

    #[error("Duplicate option name '{option}' in command '{command}'")]
    DuplicateOption { command: String, option: String },

    #[error("Option '{option}' in command '{command}' has no choices")]
    EmptyChoices { command: String, option: String },
}

/// A node in the command tree
#[derive(Debug, Clone)]
pub enum Entry {
    Command(Arc<CommandDescriptor>),
    Group(Group),
}

/// A named collection of commands and nested groups
#[derive(Debug, Clone)]
pub struct Group {
    name: String,
    entries: Vec<Entry>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn command(mut self, command: CommandDescriptor) -> Self {
        self.entries.push(Entry::Command(Arc::new(command)));
        self
    }

    pub fn group(mut self, group: Group) -> Self {
        self.entries.push(Entry::Group(group));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Leaf commands, depth-first
    pub fn leaves(&self) -> Vec<Arc<CommandDescriptor>> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect(&self, out: &mut Vec<Arc<CommandDescriptor>>) {
        for entry in &self.entries {
            match entry {
                Entry::Command(command) => out.push(Arc::clone(command)),
                Entry::Group(group) => {
                    debug!(group = group.name(), parent = self.name(), "walking subgroup");
                    group.collect(out);
                }
            }
        }
    }
}

/// Validated, immutable set of routable commands
#[derive(Debug, Clone)]
pub struct Registry {
    commands: Vec<Arc<CommandDescriptor>>,
    by_name: HashMap<String, usize>,
}

impl Registry {
    /// Build a registry from a command tree, checking every declaration
    pub fn new(root: Group) -> Result<Self, RegistryError> {
        let commands = root.leaves();
        let mut by_name = HashMap::new();

        for (idx, command) in commands.iter().enumerate() {
            command.validate()?;
            if by_name.insert(command.name().to_string(), idx).is_some() {
                return Err(RegistryError::DuplicateCommand(command.name().to_string()));
            }
        }

        Ok(Self { commands, by_name })
    }

    /// All routable commands in declaration order
    pub fn commands(&self) -> &[Arc<CommandDescriptor>] {
        &self.commands
    }

    pub fn get(&self, name: &str) -> Option<&Arc<CommandDescriptor>> {
        self.by_name.get(name).map(|&idx| &self.commands[idx])
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
