mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::dir::DirSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "dirmap",
    about = "Directory assignment state machine for mirror peers: inspect the transition table and move directories between peers",
    version,
    propagate_version = true
)]
struct Cli {
    /// Site root holding .dirmap/ (default: auto-detect upward from cwd)
    #[arg(long, global = true, env = "DIRMAP_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .dirmap/ config and state
    Init {
        /// Mirror peer allowed to own directories (repeatable)
        #[arg(long = "peer")]
        peers: Vec<String>,
    },

    /// Print the full transition table
    Table,

    /// Look up the step after ACTION completed in STATE
    Transit { state: String, action: String },

    /// Print every step an entered STATE runs through
    Walk { state: String },

    /// Report whether STATE is idle
    Idle { state: String },

    /// Track and move mirrored directories
    Dir {
        #[command(subcommand)]
        subcommand: DirSubcommand,
    },

    /// Show every tracked directory
    Status,

    /// Validate the configuration
    Check,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { peers } => cmd::init::run(&root, &peers, cli.json),
        Commands::Table => cmd::fsm::table(cli.json),
        Commands::Transit { state, action } => cmd::fsm::transit(&state, &action, cli.json),
        Commands::Walk { state } => cmd::fsm::walk(&state, cli.json),
        Commands::Idle { state } => cmd::fsm::idle(&state, cli.json),
        Commands::Dir { subcommand } => cmd::dir::run(&root, subcommand, cli.json),
        Commands::Status => cmd::status::run(&root, cli.json),
        Commands::Check => cmd::init::check(&root, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
