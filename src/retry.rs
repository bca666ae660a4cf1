use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::converter::Converter;
use crate::error::{ConversionError, TaskError};
use crate::job::ConversionTask;
use crate::progress::CancelFlag;

/// Primary conversion with at most one fallback attempt on the alternate mechanism
pub struct RetryPolicy<P, A> {
    primary: Arc<P>,
    alternate: Arc<A>,
    cancel: CancelFlag,
}

impl<P: Converter, A: Converter> RetryPolicy<P, A> {
    pub fn new(primary: Arc<P>, alternate: Arc<A>, cancel: CancelFlag) -> Self {
        Self {
            primary,
            alternate,
            cancel,
        }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn alternate(&self) -> &A {
        &self.alternate
    }

    /// Drive a claimed task to a terminal status
    pub async fn execute(&self, task: &mut ConversionTask) {
        let name = task.display_name();

        let primary_error =
            match attempt(&*self.primary, &task.source_path, &task.destination_path).await {
                Ok(()) => {
                    info!("✅ Converted: {}", name);
                    task.succeed();
                    return;
                }
                Err(e) => e,
            };

        warn!(
            "⚠️ {} failed for {}: {}",
            self.primary.name(),
            name,
            primary_error
        );

        if self.cancel.is_cancelled() {
            task.fail(TaskError::CancelledAfterFailure {
                primary: primary_error,
            });
            return;
        }

        if !self.alternate.is_available() {
            task.fail(TaskError::RetryUnavailable {
                primary: primary_error,
            });
            return;
        }

        info!("🔄 Retrying {} with {}", name, self.alternate.name());
        match attempt(&*self.alternate, &task.source_path, &task.destination_path).await {
            Ok(()) => {
                info!("✅ Converted via {}: {}", self.alternate.name(), name);
                task.succeed_via_retry();
            }
            Err(retry_error) => {
                warn!("❌ Conversion FAILED for {}: {}", name, retry_error);
                task.fail(TaskError::RetryFailed(retry_error));
            }
        }
    }
}

/// One conversion call: clear leftovers, convert, then insist on a non-empty PDF
async fn attempt<C: Converter>(
    converter: &C,
    source: &Path,
    destination: &Path,
) -> Result<(), ConversionError> {
    remove_stale_output(destination).await?;
    converter.convert(source, destination).await?;

    match tokio::fs::metadata(destination).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => {
            let _ = tokio::fs::remove_file(destination).await;
            Err(ConversionError::EmptyOutput(destination.to_path_buf()))
        }
    }
}

async fn remove_stale_output(destination: &Path) -> Result<(), ConversionError> {
    match tokio::fs::remove_file(destination).await {
        Ok(()) => {
            warn!("Removed stale PDF before conversion: {:?}", destination);
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
