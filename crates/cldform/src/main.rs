mod commands;
mod config;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cldform")]
#[command(about = "Declarative Cloudinary account settings", long_about = None)]
struct Cli {
    /// Desired configuration file
    #[arg(
        short = 'f',
        long = "file",
        env = "CLDFORM_CONFIG",
        default_value = config::DEFAULT_CONFIG_FILE,
        global = true
    )]
    file: PathBuf,

    /// Project directory holding `.cldform/state.json` (defaults to the config file's directory)
    #[arg(short = 'C', long = "dir", env = "CLDFORM_DIR", global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the changes apply would make
    Plan,
    /// Create, update and delete upload mappings to match the configuration
    Apply {
        /// Apply without stopping at the plan
        #[arg(short, long)]
        yes: bool,
    },
    /// Start tracking an existing upload mapping
    Import {
        /// Name of the mapping in the configuration
        name: String,
        /// Folder of the existing mapping
        folder: String,
    },
    /// Print the account usage report
    Usage,
    /// Look up the upload mapping of a folder
    Mapping {
        /// Folder name
        folder: String,
    },
    /// List tracked objects
    State,
    /// Delete every tracked upload mapping
    Destroy {
        /// Delete without stopping at the list
        #[arg(short, long)]
        yes: bool,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let project_root = utils::project_root(cli.dir, &cli.file);
    tracing::debug!(config = %cli.file.display(), root = %project_root.display(), "Starting");

    match cli.command {
        Commands::Plan => commands::plan::handle(&cli.file, &project_root).await,
        Commands::Apply { yes } => commands::apply::handle(&cli.file, &project_root, yes).await,
        Commands::Import { name, folder } => {
            commands::import::handle(&cli.file, &project_root, &name, &folder).await
        }
        Commands::Usage => commands::usage::handle(&cli.file, &project_root).await,
        Commands::Mapping { folder } => commands::mapping::handle(&cli.file, &folder).await,
        Commands::State => commands::state::handle(&project_root).await,
        Commands::Destroy { yes } => {
            commands::destroy::handle(&cli.file, &project_root, yes).await
        }
        Commands::Version => {
            println!("cldform {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
