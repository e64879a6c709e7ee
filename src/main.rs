//! cwa-triage: Chemical warfare agent exposure matcher
//!
//! Main entry point for the command-line front end.
//!
//! ```text
//! cwa-triage predict <observation.json | ->
//! cwa-triage agents
//! cwa-triage symptoms [system]
//! cwa-triage systems
//! cwa-triage agent <name>
//! ```
//!
//! Output is JSON on stdout; logs go to stderr or a file.

use std::io::Read;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cwa_triage::adapters::sanitize::{self, SanitizingMakeWriter};
use cwa_triage::adapters::{CsvDatasetStore, JsonArtifactStore};
use cwa_triage::{PatientObservation, PredictionService, PredictorConfig, StoreConfig};

const USAGE: &str = "Usage: cwa-triage <predict <file|->|agents|symptoms [system]|systems|agent <name>>";

enum Command {
    Predict(String),
    Agents,
    Symptoms(Option<String>),
    Systems,
    Agent(String),
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["predict", source] => Command::Predict((*source).to_string()),
        ["agents"] => Command::Agents,
        ["symptoms"] => Command::Symptoms(None),
        ["symptoms", system] => Command::Symptoms(Some((*system).to_string())),
        ["systems"] => Command::Systems,
        ["agent", name @ ..] if !name.is_empty() => Command::Agent(name.join(" ")),
        _ => bail!(USAGE),
    };
    Ok(command)
}

fn read_observation(source: &str) -> Result<PatientObservation> {
    let content = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read observation from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read observation file {source:?}"))?
    };
    serde_json::from_str(&content).context("Observation must be a JSON object of field values")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging.
    //
    // stdout carries the JSON result, so logs default to stderr.
    // CWA_LOG_MODE=file sends them to CWA_LOG_FILE instead.
    let log_mode = std::env::var("CWA_LOG_MODE").unwrap_or_else(|_| "stderr".to_string());

    let (writer, _guard) = if log_mode == "file" {
        let log_file =
            std::env::var("CWA_LOG_FILE").unwrap_or_else(|_| "logs/cwa-triage.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            // Best-effort: don't fail startup just because the directory is missing.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stderr())
    };

    sanitize::check_rules().context("Log redaction rules failed to compile")?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    let command = parse_args()?;

    let stores = StoreConfig::from_env_or_default();
    let artifacts =
        JsonArtifactStore::new(&stores.artifact_path).require_manifest(stores.require_manifest);
    let datasets = CsvDatasetStore::new(&stores.dataset_path);
    let service = PredictionService::load(&artifacts, &datasets, PredictorConfig::from_env_or_default())
        .context("Failed to load prediction context")?;

    match command {
        Command::Predict(source) => {
            let observation = read_observation(&source)?;
            print_json(&service.predict(&observation)?)?;
        }
        Command::Agents => print_json(&service.list_agents())?,
        Command::Symptoms(None) => print_json(&service.list_symptoms())?,
        Command::Symptoms(Some(system)) => print_json(&service.symptoms_for_system(&system)?)?,
        Command::Systems => print_json(&service.list_systems())?,
        Command::Agent(name) => print_json(&service.agent_details(&name)?)?,
    }

    Ok(())
}
