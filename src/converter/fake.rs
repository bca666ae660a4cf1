use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::Converter;
use crate::error::ConversionError;

/// Scriptable converter for unit tests
pub struct FakeConverter {
    pub available: bool,
    pub failing: HashSet<String>,
    pub empty_output: bool,
    pub delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeConverter {
    pub fn ok() -> Self {
        Self {
            available: true,
            failing: HashSet::new(),
            empty_output: false,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::ok()
        }
    }

    pub fn failing_on(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
            ..Self::ok()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Report success but leave a zero-byte PDF behind
    pub fn with_empty_output(mut self) -> Self {
        self.empty_output = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Converter for FakeConverter {
    fn name(&self) -> &str {
        "fake"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn convert(&self, source: &Path, destination: &Path) -> Result<(), ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let result = if self.failing.contains(&name) {
            Err(ConversionError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("simulated failure for {name}"),
            )))
        } else {
            let body: &[u8] = if self.empty_output { b"" } else { b"%PDF-1.4 fake" };
            tokio::fs::write(destination, body).await.map_err(Into::into)
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
