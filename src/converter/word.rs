use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::info;

use super::{ensure_source, locate_program, run_converter, Converter};
use crate::config::Config;
use crate::error::ConversionError;

const SOURCE_VAR: &str = "DOCBUNDLE_SRC";
const DESTINATION_VAR: &str = "DOCBUNDLE_DST";

/// Opens the document invisibly and saves it as PDF (17 is Word's wdFormatPDF).
/// Both paths are read from the environment.
const AUTOMATION_SCRIPT: &str = "$ErrorActionPreference = 'Stop'; \
    $word = New-Object -ComObject Word.Application; \
    $word.Visible = $false; \
    $word.DisplayAlerts = 0; \
    try { \
      $doc = $word.Documents.Open($env:DOCBUNDLE_SRC, $false, $true); \
      try { $doc.SaveAs([ref] $env:DOCBUNDLE_DST, [ref] 17) } finally { $doc.Close($false) } \
    } finally { $word.Quit() }";

/// Microsoft Word driven through PowerShell COM automation
pub struct WordAutomationConverter {
    program: String,
    timeout: Duration,
}

impl WordAutomationConverter {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.powershell_path.clone(), config.conversion_timeout)
    }

    fn build_command(&self, source: &Path, destination: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-NoProfile", "-NonInteractive", "-Command", AUTOMATION_SCRIPT]);
        // Paths never become part of the script text
        cmd.env(SOURCE_VAR, source);
        cmd.env(DESTINATION_VAR, destination);
        cmd
    }
}

impl Converter for WordAutomationConverter {
    fn name(&self) -> &str {
        "word"
    }

    fn is_available(&self) -> bool {
        cfg!(windows) && locate_program(&self.program).is_some()
    }

    async fn convert(&self, source: &Path, destination: &Path) -> Result<(), ConversionError> {
        ensure_source(source).await?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Word resolves relative paths against its own working directory
        let source = std::path::absolute(source)?;
        let destination = std::path::absolute(destination)?;

        info!("🔄 Converting {:?} with {}", source, self.name());
        let cmd = self.build_command(&source, &destination);
        run_converter(&self.program, cmd, self.timeout).await
    }
}
