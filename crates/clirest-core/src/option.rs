//! Option descriptors
//!
//! Static metadata for one named command input: its kind, the alternate
//! names it answers to, its default and whether it must be supplied.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};

/// Semantic conversion for text values, run when the command is invoked
pub type Converter = Arc<dyn Fn(&str) -> anyhow::Result<String> + Send + Sync>;

/// The shape of value an option accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionKind {
    Text,
    Integer,
    Flag,
    Choice(Vec<String>),
}

impl OptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Flag => "flag",
            Self::Choice(_) => "choice",
        }
    }
}

/// A value after coercion, ready to hand to a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Text(String),
    Integer(i64),
    Flag(bool),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Integer(n) => Value::from(*n),
            Self::Flag(b) => Value::Bool(*b),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Flag(b) => write!(f, "{}", b),
        }
    }
}

/// Strip leading option markers (`--name`, `-n`) down to the bare name
fn strip_markers(name: &str) -> String {
    name.trim_start_matches('-').to_string()
}

/// Describes one configurable input to a command
#[derive(Clone)]
pub struct OptionDescriptor {
    name: String,
    aliases: Vec<String>,
    kind: OptionKind,
    default: Option<Value>,
    required: bool,
    help: Option<String>,
    converter: Option<Converter>,
}

impl OptionDescriptor {
    fn new(name: &str, kind: OptionKind) -> Self {
        Self {
            name: strip_markers(name),
            aliases: Vec::new(),
            kind,
            default: None,
            required: false,
            help: None,
            converter: None,
        }
    }

    /// A free-form string option
    pub fn text(name: &str) -> Self {
        Self::new(name, OptionKind::Text)
    }

    /// An option whose value must parse as a signed integer
    pub fn integer(name: &str) -> Self {
        Self::new(name, OptionKind::Integer)
    }

    /// A boolean flag; present means `true`
    pub fn flag(name: &str) -> Self {
        Self::new(name, OptionKind::Flag)
    }

    /// An option restricted to a fixed set of values
    pub fn choice<I, S>(name: &str, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, OptionKind::Choice(choices.into_iter().map(Into::into).collect()))
    }

    /// Accept the value under an alternate name as well
    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(strip_markers(alias));
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Attach a semantic conversion, e.g. an email syntax check.
    ///
    /// The converter runs as part of the invocation, so a failure surfaces
    /// as a command failure rather than as a validation error.
    pub fn converter<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        self.converter = Some(Arc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn kind(&self) -> &OptionKind {
        &self.kind
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn converter_fn(&self) -> Option<&Converter> {
        self.converter.as_ref()
    }

    pub fn is_flag(&self) -> bool {
        self.kind == OptionKind::Flag
    }

    pub fn choices(&self) -> Option<&[String]> {
        match &self.kind {
            OptionKind::Choice(choices) => Some(choices),
            _ => None,
        }
    }

    /// Canonical name followed by aliases, in lookup order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// JSON description used by the route index
    pub fn describe(&self) -> Value {
        let mut desc = json!({
            "name": self.name,
            "aliases": self.aliases,
            "kind": self.kind.as_str(),
            "required": self.required,
        });
        if let Some(choices) = self.choices() {
            desc["choices"] = json!(choices);
        }
        if let Some(default) = &self.default {
            desc["default"] = default.clone();
        }
        if let Some(help) = &self.help {
            desc["help"] = json!(help);
        }
        desc
    }
}

impl fmt::Debug for OptionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionDescriptor")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("required", &self.required)
            .field("converter", &self.converter.is_some())
            .finish()
    }
}
