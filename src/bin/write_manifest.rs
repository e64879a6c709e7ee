//! Manifest writer for the artifact directory.
//!
//! Hashes the artifact and reference dataset and writes `manifest.json`
//! next to them, so the loader can detect tampered or swapped files.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin write_manifest -- <model_dir> [file ...]
//! ```
//!
//! Without file names, binds whichever of `cwa_artifact.json` and
//! `cwa_dataset.csv` exist in the directory.

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use cwa_triage::adapters::manifest::{Manifest, MANIFEST_FILE};

const DEFAULT_FILES: [&str; 2] = ["cwa_artifact.json", "cwa_dataset.csv"];

fn usage() -> String {
    "Usage: write_manifest <model_dir> [file ...]".to_string()
}

fn parse_args() -> Result<(PathBuf, Vec<String>)> {
    let mut model_dir: Option<PathBuf> = None;
    let mut files = Vec::new();

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-h" | "--help" => bail!(usage()),
            _ if model_dir.is_none() => model_dir = Some(PathBuf::from(arg)),
            _ => files.push(arg),
        }
    }

    let model_dir = model_dir.with_context(usage)?;
    Ok((model_dir, files))
}

fn main() -> Result<()> {
    let (model_dir, mut files) = parse_args()?;

    let model_dir = if model_dir.is_file() {
        model_dir
            .parent()
            .context("Model path has no parent directory")?
            .to_path_buf()
    } else {
        model_dir
    };

    if files.is_empty() {
        files = DEFAULT_FILES
            .iter()
            .filter(|name| model_dir.join(name).exists())
            .map(|name| (*name).to_string())
            .collect();
    }
    if files.is_empty() {
        bail!(
            "No model files found in {model_dir:?} (expected {})",
            DEFAULT_FILES.join(" or ")
        );
    }

    let manifest = Manifest::for_files(&model_dir, &files)
        .with_context(|| format!("Failed to hash files in {model_dir:?}"))?;
    manifest
        .write(&model_dir)
        .with_context(|| format!("Failed to write {MANIFEST_FILE}"))?;

    println!("Wrote {:?}", model_dir.join(MANIFEST_FILE));
    for name in &files {
        println!("  bound {name}");
    }
    Ok(())
}
