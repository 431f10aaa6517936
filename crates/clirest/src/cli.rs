//! Command line front end built from the registry
//!
//! Each registered command becomes a clap subcommand of `clirest run`.
//! Parsed arguments are fed through the same adapter and dispatcher as HTTP
//! requests, so validation messages match.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::Value;

use clirest_core::{
    execute, CommandDescriptor, OptionDescriptor, ParamSource, RawParams, Registry, Reply,
};

/// Build one clap argument from an option descriptor.
///
/// Only the shape is declared here; required and choice checks are left to
/// the adapter.
fn build_arg(option: &OptionDescriptor) -> Arg {
    let name = option.name().to_string();
    let mut arg = Arg::new(name.clone()).long(name.clone());

    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        arg = arg.short(c);
    }

    for alias in option.aliases() {
        let mut chars = alias.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => arg = arg.visible_short_alias(c),
            _ => arg = arg.visible_alias(alias.clone()),
        }
    }

    let mut help = option.help_text().unwrap_or_default().to_string();
    if let Some(choices) = option.choices() {
        help.push_str(&format!(" [choices: {}]", choices.join(", ")));
    }
    match option.default() {
        Some(Value::String(s)) => help.push_str(&format!(" [default: {}]", s)),
        Some(default) => help.push_str(&format!(" [default: {}]", default)),
        None => {}
    }
    if option.is_required() {
        help.push_str(" [required]");
    }
    arg = arg.help(help.trim().to_string());

    if option.is_flag() {
        arg.action(ArgAction::SetTrue)
    } else {
        arg.action(ArgAction::Set).value_name("VALUE")
    }
}

fn build_subcommand(command: &CommandDescriptor) -> Command {
    let mut cmd = Command::new(command.name().to_string());
    if let Some(help) = command.help_text() {
        cmd = cmd.about(help.to_string());
    }
    for option in command.options() {
        cmd = cmd.arg(build_arg(option));
    }
    cmd
}

/// The `run` command with one subcommand per registered command
pub fn run_command(registry: &Registry) -> Command {
    let mut run = Command::new("run")
        .about("Run a registered command locally")
        .subcommand_required(true)
        .arg_required_else_help(true);
    for command in registry.commands() {
        run = run.subcommand(build_subcommand(command));
    }
    run
}

/// Convert parsed arguments into the raw map the adapter expects
fn raw_params(command: &CommandDescriptor, matches: &ArgMatches) -> RawParams {
    let mut raw = RawParams::new();
    for option in command.options() {
        let id = option.name();
        if option.is_flag() {
            if matches.get_flag(id) {
                raw.insert(id.to_string(), Value::Bool(true));
            }
        } else if let Some(value) = matches.get_one::<String>(id) {
            raw.insert(id.to_string(), Value::String(value.clone()));
        }
    }
    raw
}

/// Parse `clirest run` arguments into a command and its raw parameters
pub fn parse_args(
    registry: &Registry,
    args: &[String],
) -> Result<(Arc<CommandDescriptor>, RawParams), clap::Error> {
    let argv = std::iter::once("run".to_string()).chain(args.iter().cloned());
    let matches = run_command(registry).try_get_matches_from(argv)?;

    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| clap::Error::new(clap::error::ErrorKind::MissingSubcommand))?;
    let command = registry
        .get(name)
        .cloned()
        .ok_or_else(|| clap::Error::new(clap::error::ErrorKind::InvalidSubcommand))?;
    let raw = raw_params(&command, sub);
    Ok((command, raw))
}

/// Run a command from command line arguments
pub fn run(registry: &Registry, args: &[String]) -> Result<Reply> {
    let (command, raw) = match parse_args(registry, args) {
        Ok(parsed) => parsed,
        Err(e) => e.exit(),
    };
    Ok(execute(&command, &raw, ParamSource::CommandLine))
}

/// Pretty-print a reply's envelope
pub fn render(reply: &Reply) -> Result<String> {
    serde_json::to_string_pretty(&reply.body).context("Failed to serialize reply")
}
