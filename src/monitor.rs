// src/monitor.rs
//! Passive realtime observability: a spawned task that logs store events.
//! The returned handle must be released; `stop()` (or dropping the handle)
//! aborts the subscription so repeated initializations never leak listeners.

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::store::types::StoreEvent;
use crate::store::Store;

pub struct MonitorHandle {
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Subscribe to article/log events and report them at log level.
pub fn start_realtime_monitoring(store: &Store) -> MonitorHandle {
    let mut rx = store.subscribe();
    let task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(StoreEvent::ArticleInserted { id, source_name }) => {
                    tracing::info!(target: "monitor", id, source = %source_name, "article inserted");
                }
                Ok(StoreEvent::ArticleStatusChanged { id, status }) => {
                    tracing::info!(target: "monitor", id, status = status.as_str(), "article status changed");
                }
                Ok(StoreEvent::LogAppended { operation, status }) => {
                    tracing::debug!(target: "monitor", operation = %operation, status = status.as_str(), "pipeline log appended");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(target: "monitor", skipped, "monitor lagged behind event stream");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
    MonitorHandle { task }
}
