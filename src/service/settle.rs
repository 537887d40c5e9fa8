//! Kill settle timer
//!
//! Mirrors the workflow's armed `PendingReturn` with a sleeping task. When
//! the armed token changes (re-armed, settled, or cancelled by navigation)
//! the old task is aborted. The workflow's token check keeps the return
//! idempotent even if an abort loses the race with the wake-up.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::workflow::{DecisionWorkflow, PendingReturn};

struct Armed {
    token: u64,
    handle: JoinHandle<()>,
}

pub(crate) struct SettleTimer {
    workflow: Arc<Mutex<DecisionWorkflow>>,
    delay: Duration,
    armed: StdMutex<Option<Armed>>,
}

impl SettleTimer {
    pub(crate) fn new(workflow: Arc<Mutex<DecisionWorkflow>>, delay: Duration) -> Self {
        Self {
            workflow,
            delay,
            armed: StdMutex::new(None),
        }
    }

    /// Align the sleeping task with the workflow's pending return.
    pub(crate) fn sync(&self, pending: Option<PendingReturn>) {
        let mut armed = self.armed.lock().unwrap_or_else(|e| e.into_inner());

        let current = armed.as_ref().map(|a| a.token);
        let wanted = pending.map(|p| p.token);
        if current == wanted {
            return;
        }

        if let Some(old) = armed.take() {
            old.handle.abort();
        }

        if let Some(pending) = pending {
            let workflow = Arc::clone(&self.workflow);
            let delay = self.delay;
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                workflow.lock().await.settle_kill_return(pending.token);
            });
            *armed = Some(Armed {
                token: pending.token,
                handle,
            });
        }
    }

    /// Abort whatever is sleeping.
    pub(crate) fn cancel(&self) {
        let mut armed = self.armed.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = armed.take() {
            old.handle.abort();
        }
    }

    #[cfg(test)]
    pub(crate) fn armed_token(&self) -> Option<u64> {
        self.armed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|a| a.token)
    }
}
