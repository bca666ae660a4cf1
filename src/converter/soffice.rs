use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use super::{ensure_source, locate_program, run_converter, Converter};
use crate::config::Config;
use crate::error::ConversionError;

/// LibreOffice running headless
pub struct SofficeConverter {
    program: String,
    timeout: Duration,
}

impl SofficeConverter {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.soffice_path.clone(), config.conversion_timeout)
    }

    fn build_command(&self, source: &Path, profile_dir: &Path, out_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        // A private profile per call lets several instances run side by side
        cmd.arg(format!("-env:UserInstallation={}", file_url(profile_dir)));
        cmd.args(["--headless", "--norestore", "--nolockcheck"]);
        cmd.args(["--convert-to", "pdf", "--outdir"]);
        cmd.arg(out_dir);
        cmd.arg(source);
        cmd
    }
}

impl Converter for SofficeConverter {
    fn name(&self) -> &str {
        "libreoffice"
    }

    fn is_available(&self) -> bool {
        locate_program(&self.program).is_some()
    }

    async fn convert(&self, source: &Path, destination: &Path) -> Result<(), ConversionError> {
        ensure_source(source).await?;

        let parent = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(parent).await?;

        // Scratch space next to the destination so the final rename stays on one filesystem
        let scratch = tempfile::Builder::new()
            .prefix(".docbundle-")
            .tempdir_in(parent)?;
        let profile_dir = scratch.path().join("profile");
        let out_dir = scratch.path().join("out");
        tokio::fs::create_dir_all(&out_dir).await?;

        info!("🔄 Converting {:?} with {}", source, self.name());
        let cmd = self.build_command(source, &profile_dir, &out_dir);
        run_converter(&self.program, cmd, self.timeout).await?;

        let produced = produced_pdf(source, &out_dir);
        if !produced.is_file() {
            return Err(ConversionError::EmptyOutput(destination.to_path_buf()));
        }

        tokio::fs::rename(&produced, destination).await?;
        debug!("Moved {:?} -> {:?}", produced, destination);
        Ok(())
    }
}

/// LibreOffice names its output after the source stem
fn produced_pdf(source: &Path, out_dir: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    out_dir.join(format!("{stem}.pdf"))
}

fn file_url(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    if raw.starts_with('/') {
        format!("file://{raw}")
    } else {
        format!("file:///{raw}")
    }
}
