//! FOMOD installer - command line entry point
//!
//! Logs go to stderr; stdout only carries the requested output.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use fomod_installer::answers::AnswerScript;
use fomod_installer::cli::{Cli, Commands};
use fomod_installer::discovery::find_installer_files;
use fomod_installer::{Environment, Installer, ModuleConfig, ModuleMetadata, Response};

/// Initialize the tracing subscriber with appropriate settings
fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse_args();
    init_logger(cli.verbose);
    debug!("CLI arguments parsed");

    if let Err(err) = run_command(cli.command) {
        error!("{:#}", err);
        eprintln!("✗ {:#}", err);
        std::process::exit(1);
    }
}

fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Info { path } => show_info(&path),
        Commands::Validate { path } => validate(&path),
        Commands::Run {
            path,
            dest,
            game_version,
            answers,
            save_answers,
            back_at,
        } => {
            let environment = Environment {
                destination: dest,
                game_version,
            };
            run_installer(&path, environment, answers, save_answers, back_at)
        }
    }
}

fn show_info(path: &Path) -> Result<()> {
    let files = find_installer_files(path)?;
    let config = ModuleConfig::load_from_file(&files.module_config)?;
    let metadata = ModuleMetadata::load_from_file(&files.info, &config)?;
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}

fn validate(path: &Path) -> Result<()> {
    let files = find_installer_files(path)?;
    info!("Validating installer configuration: {:?}", files.module_config);
    let config = ModuleConfig::load_from_file(&files.module_config)?;
    println!(
        "✓ Installer configuration is valid: {} ({} steps, {} conditional installs)",
        config.module_name,
        config.install_steps.items.len(),
        config.conditional_installs.len()
    );
    Ok(())
}

fn run_installer(
    path: &Path,
    environment: Environment,
    answers: Option<PathBuf>,
    save_answers: Option<PathBuf>,
    mut back_at: Vec<String>,
) -> Result<()> {
    let mut installer = Installer::from_path(path, environment)?;
    info!("Running installer for {}", installer.metadata().name);

    installer.prime().context("Installer cannot run")?;

    let script = match answers {
        Some(file) => AnswerScript::load_from_file(file)?,
        None => AnswerScript::new(),
    };
    let mut recorded = AnswerScript::new();

    while let Some(step) = installer.next_step()? {
        if let Some(pos) = back_at.iter().position(|name| *name == step.name) {
            back_at.remove(pos);
            info!("Going back from step \"{}\"", step.name);
            installer.submit(Response::Back)?;
            continue;
        }

        let answer = script
            .answer_for(&step)
            .with_context(|| format!("No usable answer for step \"{}\"", step.name))?;
        recorded.record(&step, &answer);
        installer.submit(answer)?;
    }

    let result = installer
        .result()
        .context("Installer stopped before finishing")?;

    if let Some(file) = save_answers {
        recorded.save_to_file(&file)?;
        info!("Saved answers to {:?}", file);
    }

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
