//! Command descriptors and the invocation contract
//!
//! A command is a name, an ordered set of options and a handler. Handlers
//! receive an [`Invocation`] with the resolved option values and return an
//! [`Outcome`], or fail with any error.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};

use crate::adapter::ResolvedOptions;
use crate::option::{OptionDescriptor, OptionKind};
use crate::registry::RegistryError;

/// Handler signature shared by all commands
pub type Handler = Arc<dyn Fn(&Invocation<'_>) -> Result<Outcome> + Send + Sync>;

/// What a command handed back
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Plain text, wrapped as `{"message": ...}`
    Text(String),
    /// A key/value payload, returned verbatim
    Fields(Map<String, Value>),
    /// Anything else; reported as an unsupported return type
    Other(Value),
}

impl From<String> for Outcome {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Outcome {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Map<String, Value>> for Outcome {
    fn from(map: Map<String, Value>) -> Self {
        Self::Fields(map)
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s),
            Value::Object(map) => Self::Fields(map),
            other => Self::Other(other),
        }
    }
}

impl From<()> for Outcome {
    fn from(_: ()) -> Self {
        Self::Other(Value::Null)
    }
}

/// How the response payload is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// The handler's return value is the payload
    #[default]
    Return,
    /// Lines echoed through [`Invocation::echo`] are joined into the message
    Capture,
}

/// Request-scoped sink for echoed output
#[derive(Debug, Default)]
pub struct Output {
    lines: RefCell<Vec<String>>,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn echo(&self, text: impl Into<String>) {
        self.lines.borrow_mut().push(text.into());
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn into_text(self) -> String {
        self.lines.into_inner().join("\n")
    }
}

/// Everything a handler sees for one call
pub struct Invocation<'a> {
    command: &'a str,
    options: &'a ResolvedOptions,
    output: &'a Output,
}

impl<'a> Invocation<'a> {
    pub fn new(command: &'a str, options: &'a ResolvedOptions, output: &'a Output) -> Self {
        Self {
            command,
            options,
            output,
        }
    }

    pub fn command(&self) -> &str {
        self.command
    }

    pub fn options(&self) -> &ResolvedOptions {
        self.options
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.options.get(name).and_then(|v| v.as_str())
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.options.get(name).and_then(|v| v.as_i64())
    }

    /// Flags that never resolved read as `false`
    pub fn get_flag(&self, name: &str) -> bool {
        self.options
            .get(name)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn require_str(&self, name: &str) -> Result<&str> {
        self.get_str(name)
            .with_context(|| format!("Missing value for --{}", name))
    }

    /// Write a line to the request's output sink
    pub fn echo(&self, text: impl Into<String>) {
        self.output.echo(text);
    }
}

/// Static metadata plus the invocation target for one routable operation
#[derive(Clone)]
pub struct CommandDescriptor {
    name: String,
    help: Option<String>,
    options: Vec<OptionDescriptor>,
    output_mode: OutputMode,
    handler: Handler,
}

impl CommandDescriptor {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<Outcome> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            help: None,
            options: Vec::new(),
            output_mode: OutputMode::Return,
            handler: Arc::new(handler),
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn option(mut self, option: OptionDescriptor) -> Self {
        self.options.push(option);
        self
    }

    /// Respond with the lines the handler echoes instead of its return value
    pub fn capture_output(mut self) -> Self {
        self.output_mode = OutputMode::Capture;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn options(&self) -> &[OptionDescriptor] {
        &self.options
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    pub fn invoke(&self, invocation: &Invocation<'_>) -> Result<Outcome> {
        (self.handler)(invocation)
    }

    /// Check the declaration invariants: the name is a usable route
    /// segment, option names and aliases are unique, and choice options
    /// offer at least one value.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if !is_route_segment(&self.name) {
            return Err(RegistryError::InvalidName(self.name.clone()));
        }
        let mut seen: Vec<&str> = Vec::new();
        for option in &self.options {
            for name in option.names() {
                if seen.contains(&name) {
                    return Err(RegistryError::DuplicateOption {
                        command: self.name.clone(),
                        option: name.to_string(),
                    });
                }
                seen.push(name);
            }
            if let OptionKind::Choice(choices) = option.kind() {
                if choices.is_empty() {
                    return Err(RegistryError::EmptyChoices {
                        command: self.name.clone(),
                        option: option.name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// JSON description used by the route index
    pub fn describe(&self) -> Value {
        json!({
            "name": self.name,
            "help": self.help,
            "capture_output": self.output_mode == OutputMode::Capture,
            "options": self.options.iter().map(OptionDescriptor::describe).collect::<Vec<_>>(),
        })
    }
}

/// Non-empty, without path separators, route captures or whitespace
fn is_route_segment(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| matches!(c, '/' | '{' | '}' | '*' | '?' | '#') || c.is_whitespace())
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("output_mode", &self.output_mode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::OptionValue;

    fn noop(_: &Invocation<'_>) -> Result<Outcome> {
        Ok(Outcome::from("ok"))
    }

    #[test]
    fn test_outcome_from_value() {
        assert_eq!(Outcome::from(json!("hi")), Outcome::Text("hi".into()));
        assert!(matches!(Outcome::from(json!({"a": 1})), Outcome::Fields(_)));
        assert_eq!(Outcome::from(json!([1, 2])), Outcome::Other(json!([1, 2])));
        assert_eq!(Outcome::from(()), Outcome::Other(Value::Null));
    }

    #[test]
    fn test_output_collects_lines() {
        let output = Output::new();
        output.echo("one");
        output.echo("two");
        assert_eq!(output.lines(), vec!["one", "two"]);
        assert_eq!(output.into_text(), "one\ntwo");
    }

    #[test]
    fn test_invocation_accessors() {
        let mut options = ResolvedOptions::default();
        options.insert("name", OptionValue::Text("John".into()));
        options.insert("age", OptionValue::Integer(30));
        options.insert("cc", OptionValue::Flag(true));
        let output = Output::new();
        let inv = Invocation::new("greet", &options, &output);

        assert_eq!(inv.command(), "greet");
        assert_eq!(inv.get_str("name"), Some("John"));
        assert_eq!(inv.get_int("age"), Some(30));
        assert!(inv.get_flag("cc"));
        assert!(!inv.get_flag("missing"));
        assert!(inv.require_str("street").is_err());
    }

    #[test]
    fn test_validate_duplicate_alias() {
        let cmd = CommandDescriptor::new("greet", noop)
            .option(OptionDescriptor::text("name").alias("n"))
            .option(OptionDescriptor::text("nick").alias("-n"));
        let err = cmd.validate().unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateOption { ref option, .. } if option == "n"));
    }

    #[test]
    fn test_validate_route_name() {
        let cmd = CommandDescriptor::new("users/{id}", noop);
        assert_eq!(cmd.validate(), Err(RegistryError::InvalidName("users/{id}".into())));
    }

    #[test]
    fn test_validate_empty_choices() {
        let cmd = CommandDescriptor::new("greet", noop)
            .option(OptionDescriptor::choice("level", Vec::<String>::new()));
        assert!(matches!(cmd.validate(), Err(RegistryError::EmptyChoices { .. })));
    }

    #[test]
    fn test_describe() {
        let cmd = CommandDescriptor::new("echo", noop)
            .help("Echo text")
            .capture_output()
            .option(OptionDescriptor::text("text").required());
        let desc = cmd.describe();
        assert_eq!(desc["name"], "echo");
        assert_eq!(desc["capture_output"], true);
        assert_eq!(desc["options"][0]["name"], "text");
        assert_eq!(desc["options"][0]["required"], true);
    }
}
