//! clirest - serve declaratively-defined commands as HTTP endpoints
//!
//! Usage:
//!   clirest serve [--listen ADDR] [--prefix PATH] [--config FILE]
//!   clirest routes [--json]
//!   clirest run <command> [options]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use clirest::config::{self, normalize_prefix};
use clirest::{cli, commands, server};
use clirest_core::Registry;

#[derive(Parser)]
#[command(name = "clirest")]
#[command(about = "Serve declaratively-defined commands as HTTP endpoints")]
#[command(version)]
#[command(after_help = "\
Every registered command is reachable as GET or POST <prefix>/<command>.
GET reads options from the query string, POST from a JSON object body.

EXAMPLES:
    clirest serve --listen 0.0.0.0:8080
    clirest routes
    clirest run greet --name John --age 30
    curl 'http://127.0.0.1:5000/api/greet?name=John&age=30'")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise (give before the subcommand)
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind, overrides config and CLIREST_LISTEN
        #[arg(short, long)]
        listen: Option<String>,

        /// Route prefix, overrides config
        #[arg(short, long)]
        prefix: Option<String>,

        /// Config file (default: ~/.config/clirest/config.yaml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List routes and their options
    Routes {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Config file used to find the route prefix
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run a command locally
    Run {
        /// Command name followed by its options
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 1..)]
        args: Vec<String>,
    },
}

fn init_logging(verbose: bool) {
    // Logs go to stderr so `run` output stays clean on stdout
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let registry = Arc::new(commands::registry()?);

    match cli.command {
        Commands::Serve { listen, prefix, config } => {
            cmd_serve(registry, listen, prefix, config).await
        }
        Commands::Routes { json, config } => cmd_routes(&registry, json, config),
        Commands::Run { args } => cmd_run(&registry, &args),
    }
}

async fn cmd_serve(
    registry: Arc<Registry>,
    listen: Option<String>,
    prefix: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let mut config = config::load_config(config_path.as_deref())?;
    if let Some(listen) = listen {
        config.listen = listen;
    }
    if let Some(prefix) = prefix {
        config.api_prefix = normalize_prefix(&prefix);
    }

    info!(listen = %config.listen, prefix = %config.api_prefix, "Starting clirest");
    server::serve(&config, registry).await
}

fn cmd_routes(registry: &Registry, json: bool, config_path: Option<PathBuf>) -> Result<()> {
    let config = config::load_config(config_path.as_deref())?;

    if json {
        let routes: Vec<_> = registry
            .commands()
            .iter()
            .map(|c| {
                let mut desc = c.describe();
                desc["route"] = serde_json::json!(config.route_for(c.name()));
                desc
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&routes)?);
        return Ok(());
    }

    for command in registry.commands() {
        println!("GET|POST {}", config.route_for(command.name()));
        if let Some(help) = command.help_text() {
            println!("    {}", help);
        }
        for option in command.options() {
            let mut names = vec![format!("--{}", option.name())];
            names.extend(option.aliases().iter().map(|a| format!("-{}", a)));
            let mut line = format!("    {:<24} {}", names.join(", "), option.kind().as_str());
            if option.is_required() {
                line.push_str(" (required)");
            }
            if let Some(choices) = option.choices() {
                line.push_str(&format!(" [{}]", choices.join("|")));
            }
            println!("{}", line);
        }
        println!();
    }
    Ok(())
}

fn cmd_run(registry: &Registry, args: &[String]) -> Result<()> {
    let reply = cli::run(registry, args)?;
    println!("{}", cli::render(&reply)?);
    if !reply.status.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
