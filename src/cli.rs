use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// FOMOD installer - walk a mod package's installer without a GUI
#[derive(Parser)]
#[command(name = "fomod-installer")]
#[command(about = "Interprets FOMOD installer scripts and prints the resulting file mapping")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the package's module information
    Info {
        /// Package folder (containing `fomod/`) or the `fomod` folder itself
        path: PathBuf,
    },
    /// Check that the installer configuration parses
    Validate {
        /// Package folder (containing `fomod/`) or the `fomod` folder itself
        path: PathBuf,
    },
    /// Run the installer unattended and print the files and flags as JSON
    Run {
        /// Package folder (containing `fomod/`) or the `fomod` folder itself
        path: PathBuf,

        /// Installation folder, enables file dependency checks
        #[arg(short, long)]
        dest: Option<PathBuf>,

        /// Target application version, enables version dependency checks
        #[arg(short, long)]
        game_version: Option<String>,

        /// JSON answer script (steps not listed use default choices)
        #[arg(short, long)]
        answers: Option<PathBuf>,

        /// Save the choices that were made as an answer script
        #[arg(long)]
        save_answers: Option<PathBuf>,

        /// Go back once when this step is first shown (repeatable)
        #[arg(long = "back-at", value_name = "STEP")]
        back_at: Vec<String>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
