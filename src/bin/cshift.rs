//! cshift CLI binary entry point.

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use codeshift::cli::{read_source, run_analyze, run_refactor, OutputFormat};

/// Source-to-source transformation engine for Python code.
#[derive(Parser)]
#[command(name = "cshift")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Output format for command results.
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Log output format (logs go to stderr; RUST_LOG controls level).
    #[arg(long, global = true, value_enum, default_value = "compact")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Compact,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a file and report findings. Pass `-` to read stdin.
    Analyze {
        /// Path to the Python file.
        file: String,
    },
    /// Refactor a file and print the result. Pass `-` to read stdin.
    Refactor {
        /// Path to the Python file.
        file: String,

        /// Write the refactored source back to the file.
        #[arg(long)]
        write: bool,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    match format {
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let result = match &cli.command {
        Commands::Analyze { file } => read_source(file).map(|src| run_analyze(&src, cli.format)),
        Commands::Refactor { file, write } => read_source(file).and_then(|src| {
            let write_path = if *write && file != "-" {
                Some(file.as_str())
            } else {
                None
            };
            run_refactor(&src, cli.format, write_path)
        }),
    };

    match result {
        Ok(report) => {
            println!("{}", report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
