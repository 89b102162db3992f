//! Groundwork CLI tool.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "groundwork")]
#[command(about = "Groundwork stack composition CLI", long_about = None)]
struct Cli {
    /// Path to the stack configuration file
    #[arg(long, env = "GROUNDWORK_CONFIG", default_value = "groundwork.kdl")]
    config: String,

    /// Environment variant to compose (defaults to the first declared)
    #[arg(long, env = "GROUNDWORK_ENVIRONMENT")]
    environment: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the stack configuration and composition
    Validate,
    /// Show the provisioning plan in dependency order
    Plan {
        /// Emit the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply the stack against the in-memory provisioner
    Apply,
    /// Destroy the stack in reverse dependency order
    Destroy,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let environment = cli.environment.as_deref();

    match cli.command {
        Commands::Validate => {
            commands::validate(&cli.config, environment)?;
        }
        Commands::Plan { json } => {
            commands::plan(&cli.config, environment, json)?;
        }
        Commands::Apply => {
            commands::apply(&cli.config, environment).await?;
        }
        Commands::Destroy => {
            commands::destroy(&cli.config, environment).await?;
        }
    }

    Ok(())
}
