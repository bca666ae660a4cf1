//! External document-to-PDF conversion mechanisms.
//!
//! The coordinator only sees the [`Converter`] trait. Two host implementations
//! exist: LibreOffice in headless mode (primary) and Microsoft Word driven via
//! PowerShell COM automation (alternate, Windows only).

#[cfg(test)]
pub(crate) mod fake;
mod soffice;
mod word;

pub use soffice::SofficeConverter;
pub use word::WordAutomationConverter;

use std::env;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error};

use crate::error::ConversionError;

/// A mechanism that turns one source document into one PDF
pub trait Converter: Send + Sync + 'static {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Whether the mechanism can run on this host
    fn is_available(&self) -> bool;

    /// Write a PDF rendition of `source` to `destination`
    fn convert(
        &self,
        source: &Path,
        destination: &Path,
    ) -> impl Future<Output = Result<(), ConversionError>> + Send;
}

/// Resolve a program name against PATH, or check it directly when it contains a separator
pub fn locate_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let paths = env::var_os("PATH")?;
    env::split_paths(&paths).find_map(|dir| {
        let full = dir.join(program);
        if full.is_file() {
            return Some(full);
        }
        if cfg!(windows) {
            let exe = full.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

/// Run a converter process to completion, killing it if it outlives `timeout`
pub(crate) async fn run_converter(
    program: &str,
    mut cmd: Command,
    timeout: Duration,
) -> Result<(), ConversionError> {
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    debug!("Executing converter command: {:?}", cmd);

    let child = cmd
        .spawn()
        .map_err(|e| ConversionError::spawn(program, e))?;

    // Dropping the wait future on timeout drops the child, which kills it
    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| ConversionError::TimedOut {
            program: program.to_string(),
            timeout,
        })??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!("{} failed: {}", program, stderr);
        return Err(ConversionError::Failed {
            program: program.to_string(),
            status: output.status,
            stderr,
        });
    }

    Ok(())
}

/// Fail early when the source document is gone
pub(crate) async fn ensure_source(source: &Path) -> Result<(), ConversionError> {
    match tokio::fs::metadata(source).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(ConversionError::MissingSource(source.to_path_buf())),
    }
}
