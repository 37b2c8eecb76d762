//! Module for the `obfuscate` subcommand, which flattens the control flow of every method in a
//! smali file.
//!
//! The file is read whole, transformed in memory through `tangle-transform`'s pipeline, and
//! written in a single step: to stdout, or atomically to `--output` through a temporary file
//! in the destination directory.

use crate::commands::{read_source, ObfuscateError};
use async_trait::async_trait;
use clap::Args;
use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};
use tangle_core::seed::Seed;
use tangle_transform::flatten::{Flatten, FlattenConfig};
use tangle_transform::obfuscator::{obfuscate_source, ObfuscationConfig};
use tangle_transform::Transform;
use tracing::info;

/// Arguments for the `obfuscate` subcommand.
#[derive(Args)]
pub struct ObfuscateArgs {
    /// Input smali file.
    pub input: PathBuf,
    /// Output path; the result is printed to stdout when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Cryptographic seed (64 hex chars) for deterministic obfuscation
    #[arg(long)]
    pub seed: Option<String>,
    /// Comma-separated list of transforms to apply.
    #[arg(long, default_value = "flatten")]
    pub passes: String,
    /// Prefix of the labels introduced by the flattener.
    #[arg(long, default_value = "flat_")]
    pub label_prefix: String,
    /// Keep fields, comments and other text between methods.
    #[arg(long)]
    pub preserve_interstitial: bool,
    /// Replay each flattened method and check it against the original body.
    #[arg(long)]
    pub verify: bool,
    /// Path to emit the run report as JSON (optional).
    #[arg(long)]
    pub emit: Option<PathBuf>,
}

/// Executes the `obfuscate` subcommand using the obfuscation pipeline.
#[async_trait]
impl super::Command for ObfuscateArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        let ObfuscateArgs {
            input,
            output,
            seed,
            passes,
            label_prefix,
            preserve_interstitial,
            verify,
            emit,
        } = self;

        // Step 1: Read input
        let source = read_source(&input).await?;

        // Step 2: Build transforms from CLI args
        let flatten = FlattenConfig {
            label_prefix,
            ..FlattenConfig::default()
        };
        let transforms = build_passes(&passes, &flatten)?;

        // Step 3: Configure obfuscation
        let seed = match seed {
            Some(seed_hex) => seed_hex
                .parse::<Seed>()
                .map_err(|e| ObfuscateError::InvalidSeed(e.to_string()))?,
            None => {
                let seed = Seed::generate();
                info!("generated seed {seed}; pass it with --seed to reproduce this run");
                seed
            }
        };
        let mut config = ObfuscationConfig::with_seed(seed);
        config.transforms = transforms;
        config.flatten = flatten;
        config.preserve_interstitial = preserve_interstitial;
        config.verify = verify;

        // Step 4: Run obfuscation pipeline
        let result = obfuscate_source(&source, config).map_err(ObfuscateError::from)?;
        info!(
            "flattened {}/{} methods of {}",
            result.report.methods_changed,
            result.report.methods_total,
            input.display()
        );

        // Step 5: Output transformed source
        match output.as_ref() {
            Some(path) => {
                write_atomic(path, &result.output)?;
                info!("wrote {}", path.display());
            }
            None => print!("{}", result.output),
        }

        // Step 6: Write report once the output is in place
        if let Some(path) = emit.as_ref() {
            write_atomic(path, &result.report.to_json()?)?;
            info!("wrote report to {}", path.display());
        }

        Ok(())
    }
}

/// Builds a list of transform passes from a comma-separated string.
pub(crate) fn build_passes(
    list: &str,
    flatten: &FlattenConfig,
) -> Result<Vec<Box<dyn Transform>>, ObfuscateError> {
    list.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|name| match name.trim() {
            "flatten" | "cff" => Ok(Box::new(Flatten::with_config(flatten.clone())?) as Box<dyn Transform>),
            _ => Err(ObfuscateError::InvalidPass(name.to_string())),
        })
        .collect()
}

/// Writes `contents` to `path` through a temporary file renamed into place.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<(), ObfuscateError> {
    let wrap = |source: std::io::Error| ObfuscateError::Output {
        path: path.display().to_string(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(wrap)?;
    file.write_all(contents.as_bytes()).map_err(wrap)?;
    file.persist(path).map_err(|e| wrap(e.error))?;
    Ok(())
}
