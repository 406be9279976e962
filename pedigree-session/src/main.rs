//! pedigree - inspect and import stored family pedigrees

use clap::{Parser, Subcommand};
use pedigree_core::PedigreeError;
use pedigree_session::{logging, PedigreeSession, SessionConfig};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "pedigree")]
#[command(about = "Inspect and import stored family pedigrees")]
#[command(version)]
struct Cli {
    /// Configuration file, read when it exists
    #[arg(short, long, default_value = "pedigree.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List stored family ids
    List,
    /// Print a family's document as clinical JSON
    Show { family: String },
    /// Print validation findings; exits non-zero when errors exist
    Validate { family: String },
    /// Seed an empty family from legacy member and parent-map files
    ImportLegacy {
        family: String,
        members: PathBuf,
        parents: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.exists().then_some(cli.config.as_path());
    let config = SessionConfig::load(config_path).unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        SessionConfig::default()
    });

    if let Err(e) = logging::init(&config.log) {
        eprintln!("{}", e);
    }

    match run(&config, cli.command) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &SessionConfig, command: Command) -> pedigree_session::Result<ExitCode> {
    let store = config.open_store()?;

    match command {
        Command::List => {
            for family in store.list_families()? {
                println!("{}", family);
            }
        }
        Command::Show { family } => {
            let session = PedigreeSession::open(store, &family, config)?;
            let export = session.engine().to_clinical_json()?;
            let text = serde_json::to_string_pretty(&export).map_err(PedigreeError::from)?;
            println!("{}", text);
        }
        Command::Validate { family } => {
            let session = PedigreeSession::open(store, &family, config)?;
            for finding in &session.validation_summary() {
                let path = finding.path.as_deref().unwrap_or("-");
                println!(
                    "{:?}\t{}\t{}\t{}",
                    finding.level, finding.code, path, finding.message
                );
            }
            if session.validation_report().has_errors() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::ImportLegacy {
            family,
            members,
            parents,
        } => {
            let members = read_json(&members)?;
            let parents = read_json(&parents)?;
            let mut session = PedigreeSession::open(store, &family, config)?;
            if session.bootstrap_from_legacy(&members, &parents)? {
                session.apply_metadata_defaults("")?;
                println!("imported {} individuals", session.state().individuals.len());
            } else {
                println!("nothing imported");
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn read_json(path: &Path) -> pedigree_session::Result<Value> {
    let text = std::fs::read_to_string(path)?;
    let value = serde_json::from_str(&text).map_err(PedigreeError::from)?;
    Ok(value)
}
