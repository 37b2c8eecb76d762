use async_trait::async_trait;
use clap::Subcommand;
use std::error::Error;
use std::path::Path;

pub mod blocks;
pub mod obfuscate;

use thiserror::Error;

/// Errors that can occur during obfuscation.
#[derive(Debug, Error)]
pub enum ObfuscateError {
    /// Input could not be read.
    #[error(transparent)]
    Input(#[from] tangle_core::result::Error),
    /// Output file could not be written.
    #[error("could not write '{path}': {source}")]
    Output {
        /// Destination path.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Transform application failed.
    #[error("transform error: {0}")]
    Transform(#[from] tangle_transform::Error),
    /// Invalid transform pass specified.
    #[error("invalid pass: {0}")]
    InvalidPass(String),
    /// Invalid seed.
    #[error("invalid seed: {0}")]
    InvalidSeed(String),
    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// CLI subcommands for Tangle.
#[derive(Subcommand)]
pub enum Cmd {
    /// Flatten the control flow of every method in a smali file.
    Obfuscate(obfuscate::ObfuscateArgs),
    /// Print the `.line` block partition of every method.
    Blocks(blocks::BlocksArgs),
}

/// Trait for executing CLI subcommands.
///
/// Implementors read a smali file, process it, and write their result to stdout or a file.
#[async_trait]
pub trait Command {
    /// Executes the subcommand.
    ///
    /// # Returns
    /// A `Result` indicating success or an error if execution fails.
    async fn execute(self) -> Result<(), Box<dyn Error>>;
}

#[async_trait]
impl Command for Cmd {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        match self {
            Cmd::Obfuscate(args) => args.execute().await,
            Cmd::Blocks(args) => args.execute().await,
        }
    }
}

/// Reads a smali file as text.
pub(crate) async fn read_source(path: &Path) -> Result<String, ObfuscateError> {
    tokio::fs::read_to_string(path).await.map_err(|source| {
        ObfuscateError::Input(tangle_core::result::Error::FileRead {
            path: path.display().to_string(),
            source,
        })
    })
}
