//! Command dispatcher
//!
//! Invokes a command with resolved options and maps the outcome, or the
//! failure, to a status and a JSON envelope.

use std::fmt;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::adapter::{resolve, ParamSource, RawParams, ResolvedOptions, ValidationError};
use crate::command::{CommandDescriptor, Invocation, Outcome, Output, OutputMode};
use crate::option::OptionValue;

/// Response status, independent of any HTTP library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    InternalError,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::InternalError => 500,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == Self::Ok
    }
}

/// Status plus JSON envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: Status,
    pub body: Value,
}

impl Reply {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            body: json!({ "message": text.into() }),
        }
    }

    pub fn fields(map: Map<String, Value>) -> Self {
        Self {
            status: Status::Ok,
            body: Value::Object(map),
        }
    }

    pub fn error(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    /// A failure raised while the command ran
    pub fn exception(err: impl fmt::Display) -> Self {
        Self::error(Status::InternalError, format!("Exception: {}", err))
    }

    /// The command returned something that is neither text nor a map.
    ///
    /// Reported with a success status; clients have come to rely on it.
    pub fn unsupported() -> Self {
        Self::error(Status::Ok, "Unsupported return type from command")
    }
}

impl From<ValidationError> for Reply {
    fn from(err: ValidationError) -> Self {
        Self::error(Status::BadRequest, err.to_string())
    }
}

/// Run semantic converters over resolved text values
fn convert(command: &CommandDescriptor, options: &mut ResolvedOptions) -> anyhow::Result<()> {
    for option in command.options() {
        let Some(converter) = option.converter_fn() else {
            continue;
        };
        let Some(text) = options.get(option.name()).and_then(|v| v.as_str()) else {
            continue;
        };
        let converted = converter(text)?;
        options.insert(option.name(), OptionValue::Text(converted));
    }
    Ok(())
}

/// Invoke a command and format its result.
///
/// The output sink lives for this call only; nothing is shared between
/// requests.
pub fn dispatch(command: &CommandDescriptor, mut options: ResolvedOptions) -> Reply {
    if let Err(e) = convert(command, &mut options) {
        warn!(command = command.name(), error = %e, "option conversion failed");
        return Reply::exception(e);
    }

    let output = Output::new();
    let result = command.invoke(&Invocation::new(command.name(), &options, &output));

    match (result, command.output_mode()) {
        (Err(e), _) => {
            warn!(command = command.name(), error = %e, "command failed");
            Reply::exception(e)
        }
        (Ok(_), OutputMode::Capture) => {
            debug!(command = command.name(), "returning captured output");
            Reply::message(output.into_text())
        }
        (Ok(Outcome::Text(text)), OutputMode::Return) => Reply::message(text),
        (Ok(Outcome::Fields(map)), OutputMode::Return) => Reply::fields(map),
        (Ok(Outcome::Other(value)), OutputMode::Return) => {
            warn!(command = command.name(), returned = %value, "unsupported return type");
            Reply::unsupported()
        }
    }
}

/// Resolve raw parameters and dispatch, short-circuiting on validation errors
pub fn execute(command: &CommandDescriptor, raw: &RawParams, source: ParamSource) -> Reply {
    match resolve(command, raw, source) {
        Ok(options) => dispatch(command, options),
        Err(e) => {
            debug!(command = command.name(), error = %e, "validation failed");
            Reply::from(e)
        }
    }
}
