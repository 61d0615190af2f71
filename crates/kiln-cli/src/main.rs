#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_precision_loss)]

mod commands;
mod logging;

use clap::Parser;
use kiln_core::Config;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kiln")]
#[command(author, version, about = "A front-end build pipeline", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Scaffold a new project in the working directory
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Build the project for production
    Build {
        /// Environment name (selects the output subdirectory; staging
        /// also enables source maps)
        #[arg(long, env = "NODE_ENV")]
        node_env: Option<String>,

        /// Write a bundle-size report (same as ANALYZE=true)
        #[arg(long)]
        analyze: bool,
    },

    /// Start the development server with hot reload
    Dev {
        /// Port to listen on
        #[arg(long, short = 'p', default_value = "8000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "localhost")]
        host: String,
    },

    /// Show the test plan and apply the coverage gate
    Test {
        /// Coverage summary JSON produced by the test runner
        #[arg(long, value_name = "FILE")]
        coverage: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine working directory
    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd.clone())
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(cli.json),
        Some(Commands::Init { force }) => commands::init::run(&cwd, force, cli.json),
        Some(Commands::Build { node_env, analyze }) => {
            let action = commands::build::BuildAction {
                cwd,
                node_env,
                analyze,
            };
            commands::build::run(&action, cli.json)
        }
        Some(Commands::Dev { port, host }) => {
            let action = commands::dev::DevAction { cwd, port, host };
            let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
            rt.block_on(commands::dev::run(action))
        }
        Some(Commands::Test { coverage }) => {
            commands::test::run(&config, coverage.as_deref(), cli.json)
        }
    }
}
