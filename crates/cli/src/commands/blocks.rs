//! Module for the `blocks` subcommand, which prints how each method of a smali file is split
//! into `.line` blocks before flattening.

use crate::commands::{read_source, ObfuscateError};
use async_trait::async_trait;
use clap::Args;
use std::error::Error;
use std::fmt::Write;
use std::path::PathBuf;
use tangle_core::registers::find_locals;
use tangle_core::{scan_source, split_method, BlockKind, Method};

/// Arguments for the `blocks` subcommand.
#[derive(Args)]
pub struct BlocksArgs {
    /// Input smali file.
    pub input: PathBuf,
}

/// Executes the `blocks` subcommand.
#[async_trait]
impl super::Command for BlocksArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        let source = read_source(&self.input).await?;
        let scanned = scan_source(&source).map_err(ObfuscateError::from)?;

        println!("header: {} lines", scanned.header.len());
        for method_source in scanned.methods() {
            let method = split_method(method_source).map_err(ObfuscateError::from)?;
            print!("{}", describe(&method));
        }
        Ok(())
    }
}

/// One-paragraph description of a method's block partition.
pub(crate) fn describe(method: &Method) -> String {
    let mut out = String::new();
    let locals = find_locals(method)
        .map(|l| format!(".locals {}", l.count))
        .unwrap_or_else(|_| "no .locals".to_string());
    let _ = writeln!(out, "{} (line {}, {})", method.name(), method.line, locals);

    for (idx, block) in method.blocks.iter().enumerate() {
        let label = match block.kind {
            BlockKind::Prologue => "prologue".to_string(),
            _ => block
                .marker()
                .map(|marker| marker.trim().to_string())
                .unwrap_or_else(|| format!("{:?}", block.kind).to_lowercase()),
        };
        let _ = writeln!(out, "  [{idx}] {label}: {} lines", block.len());
    }
    out
}
