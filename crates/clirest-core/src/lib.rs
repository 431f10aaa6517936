//! clirest core - declarative commands exposed over HTTP
//!
//! Describes commands as typed option sets, resolves raw request parameters
//! against them and turns the command's result into a response envelope.
//! The HTTP layer and the command line both sit on top of this crate.

pub mod adapter;
pub mod command;
pub mod dispatch;
pub mod option;
pub mod registry;

pub use adapter::{resolve, ParamSource, RawParams, ResolvedOptions, ValidationError};
pub use command::{CommandDescriptor, Invocation, Outcome, Output, OutputMode};
pub use dispatch::{dispatch, execute, Reply, Status};
pub use option::{OptionDescriptor, OptionKind, OptionValue};
pub use registry::{Entry, Group, Registry, RegistryError};
