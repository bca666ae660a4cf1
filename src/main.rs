//! # docbundle - Document to PDF batch converter
//!
//! Converts a batch of word-processing documents (.docx, .doc, .odt, .rtf) to
//! PDF and bundles the results into a single ZIP archive, optionally
//! AES-256 encrypted with a password.
//!
//! ## Features
//!
//! - **Parallel Conversion**: Bounded worker pool (1-16 workers) sharing one task queue
//! - **Fallback Converter**: Files LibreOffice cannot convert are retried once through MS Word automation
//! - **Encrypted Archives**: AES-256 ZIP entries when a password is given
//! - **Atomic Output**: The archive only appears once every entry is written
//! - **Detailed Report**: Converted, retried and failed files with reasons
//! - **Signal Handling**: Ctrl-C stops dispatching new conversions
//!
//! ## Usage
//!
//! ```bash
//! # Convert two documents and a whole folder into an encrypted archive
//! docbundle convert a.docx b.odt ./contracts -o bundle.zip -p secret -j 4
//!
//! # Type the password instead of putting it on the command line
//! docbundle convert ./contracts -o bundle.zip --ask-password
//!
//! # Check which converters are available
//! docbundle check
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docbundle::commands::check::CheckCommand;
use docbundle::commands::convert::{resolve_password, ConvertCommand};
use docbundle::config::Config;
use docbundle::job::{MAX_WORKERS, MIN_WORKERS};

/// docbundle - Convert documents to PDF and bundle them into a ZIP
#[derive(Parser)]
#[command(
    name = "docbundle",
    about = "Convert documents to PDF and bundle them into a password-protected ZIP",
    long_about = "Converts word-processing documents to PDF in parallel and packs the PDFs into one ZIP archive, optionally AES-encrypted.",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Convert documents to PDF and package them into a ZIP archive
    Convert {
        /// Documents, directories or glob patterns to convert
        #[arg(required = true)]
        inputs: Vec<String>,
        /// Path of the ZIP archive (defaults to documents_<timestamp>.zip)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Password for AES encryption of the archive entries
        #[arg(long, short = 'p', env = "DOCBUNDLE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Type the password on the terminal (asked twice) instead of passing it as an argument
        #[arg(long)]
        ask_password: bool,
        /// Number of parallel conversions (1-16)
        #[arg(long, short = 'j', value_parser = clap::value_parser!(u8).range(MIN_WORKERS as i64..=MAX_WORKERS as i64))]
        workers: Option<u8>,
        /// Keep the converted PDFs in this directory instead of a temporary one
        #[arg(long)]
        pdf_dir: Option<PathBuf>,
        /// Save the final report to this file (.json for JSON)
        #[arg(long, short = 'r')]
        report: Option<PathBuf>,
    },
    /// Check which conversion mechanisms are available
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docbundle=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            inputs,
            output,
            password,
            ask_password,
            workers,
            pdf_dir,
            report,
        } => match resolve_password(password, ask_password) {
            Ok(password) => {
                let output = output.unwrap_or_else(default_archive_name);
                info!(
                    "Starting convert command for {} input(s), output: {:?}, workers: {:?}",
                    inputs.len(),
                    output,
                    workers
                );
                ConvertCommand::new(
                    inputs,
                    output,
                    password,
                    workers.map(usize::from),
                    pdf_dir,
                    report,
                )
                .execute()
                .await
                .map(|_| ())
            }
            Err(e) => Err(e),
        },
        Commands::Check => CheckCommand::new(Config::from_env()).execute().await,
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn default_archive_name() -> PathBuf {
    PathBuf::from(format!(
        "documents_{}.zip",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ))
}
