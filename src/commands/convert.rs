use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;
use tokio::signal;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};

use crate::archive;
use crate::config::Config;
use crate::converter::{SofficeConverter, WordAutomationConverter};
use crate::coordinator::Coordinator;
use crate::enumerate::collect_documents;
use crate::error::BatchError;
use crate::job::{BatchJob, TaskStatus};
use crate::progress::{self, CancelFlag, ProgressEvent};
use crate::report::Report;

/// Command to convert documents to PDF and bundle them into a ZIP archive
pub struct ConvertCommand {
    inputs: Vec<String>,
    output: PathBuf,
    password: Option<String>,
    workers: Option<usize>,
    pdf_dir: Option<PathBuf>,
    report_path: Option<PathBuf>,
}

/// Where the PDFs live until they are packaged
enum Staging {
    /// User-chosen directory, never removed
    Kept(PathBuf),
    /// Removed once the archive is written
    Temporary(TempDir),
}

impl Staging {
    fn path(&self) -> &Path {
        match self {
            Staging::Kept(dir) => dir,
            Staging::Temporary(dir) => dir.path(),
        }
    }
}

impl ConvertCommand {
    pub fn new(
        inputs: Vec<String>,
        output: PathBuf,
        password: Option<String>,
        workers: Option<usize>,
        pdf_dir: Option<PathBuf>,
        report_path: Option<PathBuf>,
    ) -> Self {
        Self {
            inputs,
            output,
            password,
            workers,
            pdf_dir,
            report_path,
        }
    }

    pub async fn execute(&self) -> Result<Report> {
        if self.output.is_dir() {
            return Err(anyhow!(
                "Archive destination is a directory: {:?}",
                self.output
            ));
        }

        let documents = collect_documents(&self.inputs)?;
        let config = Config::from_env();
        let workers = self.workers.unwrap_or(config.default_workers);

        let staging = match &self.pdf_dir {
            Some(dir) => Staging::Kept(dir.clone()),
            None => Staging::Temporary(tempfile::Builder::new().prefix("docbundle-").tempdir()?),
        };

        // Rejects empty input and bad settings before any worker exists
        let mut job = BatchJob::new(
            documents,
            workers,
            self.password.clone(),
            self.output.clone(),
            staging.path().to_path_buf(),
        )?;

        info!(
            "🚀 Converting {} document(s) with {} worker(s) into {:?}",
            job.len(),
            job.worker_limit,
            job.archive_path
        );

        let cancel = CancelFlag::new();
        let ctrl_c = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if signal::ctrl_c().await.is_ok() {
                    warn!("🛑 Cancel requested. Waiting for running conversions to finish...");
                    cancel.cancel();
                }
            })
        };

        let bar = ProgressBar::new(job.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {wide_msg}")?
                .progress_chars("=> "),
        );
        let (tx, rx) = progress::channel();
        let ui = tokio::spawn(show_progress(bar, rx));

        let started = Instant::now();
        let coordinator = Coordinator::new(
            SofficeConverter::from_config(&config),
            WordAutomationConverter::from_config(&config),
            cancel.clone(),
        )
        .with_progress(tx);
        let summary = coordinator.run(&mut job).await;
        // Closes the progress channel
        drop(coordinator);
        if let Err(e) = ui.await {
            warn!("Progress display stopped unexpectedly: {}", e);
        }
        ctrl_c.abort();
        let summary = summary.map_err(|e| {
            anyhow!(
                "Could not create PDF directory {:?}: {}",
                staging.path(),
                e
            )
        })?;

        let result = if summary.cancelled {
            Err(anyhow!("Conversion cancelled by user"))
        } else if job.successful_outputs().is_empty() {
            Err(anyhow!("No file could be converted"))
        } else {
            self.package(&job, staging).await
        };

        let report = Report::build(&job.tasks, started.elapsed(), summary.cancelled);
        println!("\n{}", report.render());

        if let Some(path) = &self.report_path {
            match report.save(path) {
                Ok(()) => info!("💾 Report saved to {:?}", path),
                Err(e) => warn!("Failed to save report to {:?}: {}", path, e),
            }
        }

        result.map(|()| report)
    }

    async fn package(&self, job: &BatchJob, staging: Staging) -> Result<()> {
        let pdfs = job.successful_outputs();
        let password = job.password.clone();
        let destination = job.archive_path.clone();

        let bar = ProgressBar::new(pdfs.len() as u64);
        bar.set_style(ProgressStyle::with_template("📦 [{bar:30}] {pos}/{len} entries")?);
        let entry_bar = bar.clone();

        let packaged = tokio::task::spawn_blocking(move || {
            archive::package(&pdfs, password.as_deref(), &destination, |done, _| {
                entry_bar.set_position(done as u64)
            })
        })
        .await?;
        bar.finish_and_clear();

        match packaged {
            Ok(path) => {
                info!("✅ Archive ready: {:?}", path);
                Ok(())
            }
            Err(e) => {
                // Completed conversions stay on disk
                let kept = match staging {
                    Staging::Kept(dir) => dir,
                    Staging::Temporary(dir) => dir.keep(),
                };
                error!("Converted PDFs were kept in {:?}", kept);
                Err(anyhow!("Failed to create archive: {}", e))
            }
        }
    }
}

/// Password for the archive: the one given on the command line, or one typed twice on the terminal
pub fn resolve_password(given: Option<String>, ask: bool) -> Result<Option<String>> {
    if !ask {
        return Ok(given);
    }
    if given.is_some() {
        warn!("Ignoring --password/DOCBUNDLE_PASSWORD in favour of the interactive prompt");
    }

    let password = rpassword::prompt_password("Archive password: ")?;
    let confirmation = rpassword::prompt_password("Repeat password: ")?;
    Ok(Some(confirm_password(password, &confirmation)?))
}

/// Accept a typed password only when its confirmation matches
pub fn confirm_password(password: String, confirmation: &str) -> Result<String, BatchError> {
    if password.is_empty() {
        return Err(BatchError::EmptyPassword);
    }
    if password != confirmation {
        return Err(BatchError::PasswordMismatch);
    }
    Ok(password)
}

async fn show_progress(bar: ProgressBar, mut events: UnboundedReceiver<ProgressEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ProgressEvent::BatchStarted { total, workers } => {
                bar.set_length(total as u64);
                bar.set_message(format!("{workers} worker(s)"));
            }
            ProgressEvent::TaskStarted { source, .. } => {
                bar.set_message(display(&source));
            }
            ProgressEvent::TaskFinished { source, status, .. } => {
                bar.inc(1);
                match status {
                    TaskStatus::Failed => bar.println(format!("✗ {}", display(&source))),
                    TaskStatus::SucceededViaRetry => {
                        bar.println(format!("✓ {} (alternate converter)", display(&source)))
                    }
                    _ => {}
                }
            }
            ProgressEvent::BatchFinished { .. } => bar.finish_and_clear(),
        }
    }
}

fn display(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
