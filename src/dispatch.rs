//! Hand-off of validated imports from listener workers to the GUI thread.
//!
//! ```text
//!  worker ─┐
//!  worker ─┼─▶ UiDispatcher ──mpsc──▶ UiInbox ──▶ ImportApplier (GUI thread)
//!  worker ─┘        │
//!                   └─▶ waker (optional, asks the toolkit to drain soon)
//! ```
//!
//! [`UiDispatcher::dispatch`] never blocks and never waits for the GUI. The
//! queue is FIFO, and the inbox is drained on one thread only, so imports are
//! applied in the order they were enqueued and never concurrently.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::entry::{ApplyReport, ImportApplier};
use crate::models::ImportRequest;

/// Called after each successful enqueue, from the worker thread.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The GUI event loop is not running (its inbox has been dropped).
    #[error("client not ready")]
    NotReady,
}

/// Sending half, held by the import listener. Cheap to clone.
#[derive(Clone)]
pub struct UiDispatcher {
    tx: Sender<ImportRequest>,
    waker: Option<Waker>,
}

/// Receiving half, owned by the GUI thread.
pub struct UiInbox {
    rx: Receiver<ImportRequest>,
}

pub fn ui_channel() -> (UiDispatcher, UiInbox) {
    let (tx, rx) = mpsc::channel();
    (UiDispatcher { tx, waker: None }, UiInbox { rx })
}

/// Like [`ui_channel`], with a callback that tells the GUI toolkit to wake up
/// and drain the inbox on its own thread.
pub fn ui_channel_with_waker(waker: Waker) -> (UiDispatcher, UiInbox) {
    let (tx, rx) = mpsc::channel();
    (
        UiDispatcher {
            tx,
            waker: Some(waker),
        },
        UiInbox { rx },
    )
}

impl UiDispatcher {
    /// Queues `request` for the GUI thread.
    pub fn dispatch(&self, request: ImportRequest) -> Result<(), DispatchError> {
        self.tx.send(request).map_err(|_| DispatchError::NotReady)?;
        if let Some(waker) = &self.waker {
            waker();
        }
        Ok(())
    }
}

impl UiInbox {
    pub fn try_next(&self) -> Option<ImportRequest> {
        self.rx.try_recv().ok()
    }

    /// Blocks until a request arrives; `None` once every dispatcher is gone.
    pub fn recv(&self) -> Option<ImportRequest> {
        self.rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<ImportRequest> {
        match self.rx.recv_timeout(timeout) {
            Ok(request) => Some(request),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Applies everything queued so far, oldest first.
    pub fn drain(&self, applier: &mut ImportApplier) -> Vec<ApplyReport> {
        let mut reports = Vec::new();
        while let Some(request) = self.try_next() {
            reports.push(applier.apply(request));
        }
        reports
    }
}
