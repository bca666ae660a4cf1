use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use docbundle::converter::Converter;
use docbundle::error::ConversionError;

/// Converter double that fails for selected file names and jitters completion order
pub struct ScriptedConverter {
    available: bool,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl ScriptedConverter {
    pub fn new(failing: &[&str]) -> Self {
        Self {
            available: true,
            failing: failing.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(&[])
        }
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Converter for ScriptedConverter {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn convert(&self, source: &Path, destination: &Path) -> Result<(), ConversionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        // Later calls finish first so completion order differs from input order
        tokio::time::sleep(Duration::from_millis(30u64.saturating_sub(call as u64 * 5))).await;

        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.failing.contains(&name) {
            return Err(ConversionError::EmptyOutput(destination.to_path_buf()));
        }
        tokio::fs::write(destination, format!("%PDF-1.4 {name}")).await?;
        Ok(())
    }
}

/// Create empty source documents and return their paths in the given order
pub fn create_documents(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| {
            let path = dir.join(name);
            std::fs::write(&path, "fake document").unwrap();
            path
        })
        .collect()
}
