//! Built-in commands
//!
//! The stock command set served by the `clirest` binary. Each command is a
//! plain function behind a declarative option list.

use anyhow::{bail, Result};
use serde_json::json;
use tracing::info;

use clirest_core::{CommandDescriptor, Group, Invocation, OptionDescriptor, Outcome, Registry};

use crate::validators;

/// Verbosity levels accepted by `greet`
pub const VERBOSITY_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

/// Upper bound on `echo --repeat`; captured lines are held in memory
pub const MAX_REPEAT: i64 = 100;

/// Capitalized booleans; existing clients match on this wording
fn yes_no(flag: bool) -> &'static str {
    if flag {
        "True"
    } else {
        "False"
    }
}

fn greet(inv: &Invocation<'_>) -> Result<Outcome> {
    let name = inv.require_str("name")?;
    let age = inv
        .get_int("age")
        .map(|a| a.to_string())
        .unwrap_or_else(|| "an unknown number of".to_string());
    let street = inv.get_str("s").unwrap_or("unknown");
    let verbose = inv.get_str("verbose").unwrap_or("INFO");

    let greeting = format!(
        "Hello, {}. You are {} years old. Your burth street is {}. You are from California: {}. Verbose: {}",
        name,
        age,
        street,
        yes_no(inv.get_flag("cc")),
        verbose
    );
    info!(greeted = name, age = inv.get_int("age"), "greet command executed");
    inv.echo(greeting.as_str());
    Ok(Outcome::from(greeting))
}

fn send_email(inv: &Invocation<'_>) -> Result<Outcome> {
    let email = inv.require_str("email")?;
    let message = format!("Sending an email to {}", email);
    info!("{}", message);
    inv.echo(message);
    Ok(Outcome::from(json!({ "message": format!("Email sent to {}", email) })))
}

fn exception_text(_inv: &Invocation<'_>) -> Result<Outcome> {
    bail!("This is an exception")
}

fn echo(inv: &Invocation<'_>) -> Result<Outcome> {
    let text = inv.require_str("text")?;
    let times = inv.get_int("repeat").unwrap_or(1);
    if !(0..=MAX_REPEAT).contains(&times) {
        bail!("repeat must be between 0 and {}, got {}", MAX_REPEAT, times);
    }
    for _ in 0..times {
        inv.echo(text);
    }
    Ok(Outcome::from(()))
}

/// The command tree served by default
pub fn command_tree() -> Group {
    Group::new("cli")
        .command(
            CommandDescriptor::new("greet", greet)
                .help("Greet someone by name")
                .option(OptionDescriptor::text("--name").alias("-n").required().help("Your name"))
                .option(OptionDescriptor::text("-s").default_value("unknown").help("Your burth street"))
                .option(OptionDescriptor::flag("-cc").default_value(false).help("You from california"))
                .option(
                    OptionDescriptor::choice("--verbose", VERBOSITY_LEVELS.iter().copied())
                        .alias("-v")
                        .default_value("INFO")
                        .help("Set the level of verbosity"),
                )
                .option(OptionDescriptor::integer("--age").help("Your age")),
        )
        .group(
            Group::new("mail").command(
                CommandDescriptor::new("send-email", send_email)
                    .help("Send an email")
                    .option(
                        OptionDescriptor::text("--email")
                            .required()
                            .converter(validators::email)
                            .help("Your email address"),
                    ),
            ),
        )
        .command(CommandDescriptor::new("exception-text", exception_text).help("Always fails"))
        .command(
            CommandDescriptor::new("echo", echo)
                .help("Echo text, optionally several times")
                .capture_output()
                .option(OptionDescriptor::text("--text").alias("-t").required().help("Text to echo"))
                .option(OptionDescriptor::integer("--repeat").alias("-r").default_value(1).help("How many times")),
        )
}

/// Build the default registry
pub fn registry() -> Result<Registry> {
    Ok(Registry::new(command_tree())?)
}
