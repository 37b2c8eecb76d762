use clap::Parser;
use tangle_cli::commands::{Cmd, Command};

/// Tangle CLI
///
/// Tangle flattens the control flow of smali methods: every `.line` block of a method becomes
/// a case of a `packed-switch` dispatch loop, laid out in random order, with a dedicated
/// register replaying the original execution order at run time.
#[derive(Parser)]
#[command(name = "tangle", version)]
#[command(about = "Tangle: smali control-flow flattener")]
struct Cli {
    /// Log per-method and per-block details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Cmd,
}

/// Runs the Tangle CLI with the provided arguments.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    cli.command.execute().await
}
