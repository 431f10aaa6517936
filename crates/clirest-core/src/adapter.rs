//! Request adapter
//!
//! Turns a raw parameter map (query string or JSON body) into resolved,
//! typed option values for one command. Validation stops at the first
//! offending option.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::command::CommandDescriptor;
use crate::option::{OptionDescriptor, OptionKind, OptionValue};

/// Raw parameters as received, keyed by whatever name the caller used
pub type RawParams = Map<String, Value>;

/// Where raw parameters were read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    /// Query string of a GET request
    Query,
    /// JSON body of a POST request
    Body,
    /// Arguments given on the local command line
    CommandLine,
}

impl ParamSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Body => "body",
            Self::CommandLine => "command-line",
        }
    }
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejection of a request before the command runs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required option: --{0}")]
    MissingRequired(String),

    #[error("Invalid value for --{name}. Choose from [{}].", .choices.join(", "))]
    InvalidChoice { name: String, choices: Vec<String> },

    #[error("Invalid value for --{name}. '{value}' is not a valid integer.")]
    InvalidInteger { name: String, value: String },

    #[error("Invalid value for --{name}. Expected a plain value.")]
    NotScalar { name: String },
}

/// Option values for one request, keyed by canonical option name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedOptions {
    values: BTreeMap<String, OptionValue>,
}

impl ResolvedOptions {
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: OptionValue) {
        self.values.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolved values as a JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

/// Resolve raw parameters against a command's declared options.
///
/// Options are processed in declaration order: lookup by canonical name then
/// by alias, default substitution, coercion, required check. The first
/// failure is returned and later options are not examined.
pub fn resolve(
    command: &CommandDescriptor,
    raw: &RawParams,
    source: ParamSource,
) -> Result<ResolvedOptions, ValidationError> {
    let mut resolved = ResolvedOptions::default();

    for option in command.options() {
        let value = lookup(option, raw).or(option.default());

        match coerce(option, value)? {
            Some(v) => resolved.insert(option.name(), v),
            None if option.is_required() => {
                debug!(command = command.name(), option = option.name(), "missing required option");
                return Err(ValidationError::MissingRequired(option.name().to_string()));
            }
            None => {}
        }
    }

    debug!(
        command = command.name(),
        source = %source,
        resolved = resolved.len(),
        "resolved options"
    );
    Ok(resolved)
}

/// First non-null value under the canonical name or one of the aliases
fn lookup<'a>(option: &OptionDescriptor, raw: &'a RawParams) -> Option<&'a Value> {
    option
        .names()
        .filter_map(|name| raw.get(name))
        .find(|v| !v.is_null())
}

/// Scalar JSON values as text; arrays and objects have no text form
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn coerce(
    option: &OptionDescriptor,
    value: Option<&Value>,
) -> Result<Option<OptionValue>, ValidationError> {
    let name = option.name();

    match option.kind() {
        OptionKind::Flag => {
            // Presence alone sets a flag; only an explicit JSON boolean can clear it.
            let on = match value {
                Some(Value::Bool(b)) => *b,
                Some(_) => true,
                None => false,
            };
            Ok(Some(OptionValue::Flag(on)))
        }
        OptionKind::Choice(choices) => {
            let Some(value) = value else {
                return Ok(None);
            };
            match scalar_text(value) {
                Some(text) if choices.contains(&text) => Ok(Some(OptionValue::Text(text))),
                _ => Err(ValidationError::InvalidChoice {
                    name: name.to_string(),
                    choices: choices.clone(),
                }),
            }
        }
        OptionKind::Integer => {
            let Some(value) = value else {
                return Ok(None);
            };
            let parsed = match value {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            parsed
                .map(|n| Some(OptionValue::Integer(n)))
                .ok_or_else(|| ValidationError::InvalidInteger {
                    name: name.to_string(),
                    value: scalar_text(value).unwrap_or_else(|| value.to_string()),
                })
        }
        OptionKind::Text => match value {
            None => Ok(None),
            Some(value) => scalar_text(value)
                .map(|s| Some(OptionValue::Text(s)))
                .ok_or_else(|| ValidationError::NotScalar {
                    name: name.to_string(),
                }),
        },
    }
}
