use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use toolbridge_app::transport;
use toolbridge_app::{Operation, OperationDispatcher};
use toolbridge_core::BridgeConfig;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Parser)]
#[command(
    author,
    version,
    about = "Bridge between an AI orchestrator and local web3 security tools"
)]
struct Cli {
    /// Root directory holding installed tools (default: ~/tools).
    #[arg(long, global = true, env = "TOOLBRIDGE_TOOLS_DIR")]
    tools_dir: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum CliCommand {
    /// Serve JSON-lines requests on stdin/stdout.
    Serve,
    /// Run a single operation and print its report.
    Call {
        /// Operation name, e.g. execute_command.
        operation: String,
        /// Arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,
    },
    /// Print the operation catalog as JSON.
    Operations,
    /// Print the effective configuration as JSON.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = BridgeConfig::from_env().context("failed to load configuration")?;
    if let Some(dir) = &cli.tools_dir {
        let scanner_override = std::env::var_os(toolbridge_core::config::SCANNER_DIR_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        config = config.with_tools_root(dir);
        if let Some(scanner_dir) = scanner_override {
            config.scanner_dir = scanner_dir;
        }
    }
    info!(
        "Tools root: {}, scanner: {}",
        config.tools_root.display(),
        config.scanner_dir.display()
    );

    match cli.command.unwrap_or(CliCommand::Serve) {
        CliCommand::Serve => {
            let dispatcher = OperationDispatcher::new(config);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let stdout = tokio::io::stdout();
            if let Err(e) = transport::serve(&dispatcher, stdin, stdout).await {
                error!("Transport failed: {:#}", e);
                return Err(e);
            }
        }
        CliCommand::Call { operation, args } => {
            let arguments: Value =
                serde_json::from_str(&args).context("--args must be a JSON object")?;
            let dispatcher = OperationDispatcher::new(config);
            let reply = dispatcher.dispatch(&operation, arguments).await;
            println!("{}", reply.text);
            if reply.is_error {
                std::process::exit(1);
            }
        }
        CliCommand::Operations => {
            println!("{}", serde_json::to_string_pretty(&Operation::catalog())?);
        }
        CliCommand::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();
}
