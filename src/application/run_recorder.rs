// Fire-and-forget submission of run summaries to the history store

use crate::infrastructure::history::{RunHistory, RunSummary};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::warn;

/// Writes run summaries on blocking tasks so persistence never delays a response.
///
/// Failures are logged and otherwise ignored.
#[derive(Default)]
pub struct RunRecorder {
    history: Option<Arc<dyn RunHistory>>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl RunRecorder {
    pub fn new(history: Arc<dyn RunHistory>) -> Self {
        Self {
            history: Some(history),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn submit(&self, summary: RunSummary) {
        let Some(history) = self.history.clone() else {
            return;
        };
        let handle = tokio::task::spawn_blocking(move || {
            if let Err(e) = history.record_run(&summary) {
                warn!(error = %e, "failed to record run summary");
            }
        });
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    /// Waits for every submitted write to finish.
    pub async fn drain(&self) {
        let handles: Vec<_> = std::mem::take(
            &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "run history task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::history::{PersistError, RunMode};

    #[derive(Default)]
    struct Collecting {
        runs: Mutex<Vec<bool>>,
        fail: bool,
    }

    impl RunHistory for Collecting {
        fn record_run(&self, summary: &RunSummary) -> Result<(), PersistError> {
            if self.fail {
                return Err(PersistError::Io(std::io::Error::other("disk full")));
            }
            self.runs.lock().unwrap().push(summary.success);
            Ok(())
        }
    }

    #[tokio::test]
    async fn drains_submitted_runs() {
        let store = Arc::new(Collecting::default());
        let recorder = RunRecorder::new(store.clone());
        recorder.submit(RunSummary::new(RunMode::Schedule, true));
        recorder.submit(RunSummary::new(RunMode::Model, false));
        recorder.drain().await;

        // Blocking tasks may finish in any order.
        let mut runs = store.runs.lock().unwrap().clone();
        runs.sort();
        assert_eq!(runs, vec![false, true]);
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let store = Arc::new(Collecting {
            fail: true,
            ..Collecting::default()
        });
        let recorder = RunRecorder::new(store.clone());
        recorder.submit(RunSummary::new(RunMode::Schedule, true));
        recorder.drain().await;
        assert!(store.runs.lock().unwrap().is_empty());

        RunRecorder::disabled().submit(RunSummary::new(RunMode::Schedule, true));
    }
}
