//! clirest - serve declaratively-defined commands over HTTP
//!
//! Every command in the registry becomes `GET|POST <prefix>/<name>`. The
//! same declarations drive the local `clirest run` command line.

pub mod cli;
pub mod commands;
pub mod config;
pub mod server;
pub mod validators;

pub use config::Config;
pub use server::{build_router, serve};
