//! Execution context threaded through an update traversal.
//!
//! Instead of process-wide abort/progress callbacks, every `update` call
//! carries an explicit context: a cancellation flag polled between fragments
//! and an optional status channel. Long-running filters check the flag
//! cooperatively; nothing is preempted.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Status messages emitted during execution.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    UpdateStarted {
        pipeline_index: usize,
    },
    NodeExecuted {
        node: String,
        fragments: usize,
    },
    /// A node produced an empty tree — user-visible, non-fatal.
    YieldedNoData {
        node: String,
    },
    UpdateFinished {
        changed: bool,
    },
    Aborted,
}

/// Cancellation token + progress sink + streaming options.
#[derive(Clone)]
pub struct ExecutionContext {
    cancel: Arc<AtomicBool>,
    progress: Option<Sender<EngineMessage>>,
    /// When true, consumed input fragments are kept alive (debug dumps).
    retain_inputs: bool,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            cancel: Arc::new(AtomicBool::new(false)),
            progress: None,
            retain_inputs: false,
        }
    }

    /// Derive streaming options from configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            cancel: Arc::new(AtomicBool::new(false)),
            progress: None,
            retain_inputs: !config.streaming.release_fragments,
        }
    }

    /// Share a cancellation flag owned by the caller (e.g. a UI thread).
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, sender: Sender<EngineMessage>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn with_retain_inputs(mut self, retain: bool) -> Self {
        self.retain_inputs = retain;
        self
    }

    #[inline]
    pub fn retain_inputs(&self) -> bool {
        self.retain_inputs
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn request_abort(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Poll the cancellation flag. Called between fragments.
    pub fn check_abort(&self) -> Result<()> {
        if self.cancel.load(Ordering::Relaxed) {
            Err(EngineError::Aborted)
        } else {
            Ok(())
        }
    }

    /// Emit a status message; dropped receivers are ignored.
    pub fn report(&self, message: EngineMessage) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(message);
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_abort_flag() {
        let ctx = ExecutionContext::new();
        assert!(ctx.check_abort().is_ok());
        ctx.request_abort();
        assert!(matches!(ctx.check_abort(), Err(EngineError::Aborted)));
    }

    #[test]
    fn test_shared_cancel() {
        let flag = Arc::new(AtomicBool::new(false));
        let ctx = ExecutionContext::new().with_cancel(Arc::clone(&flag));
        flag.store(true, Ordering::Relaxed);
        assert!(ctx.check_abort().is_err());
    }

    #[test]
    fn test_report() {
        let (tx, rx) = unbounded();
        let ctx = ExecutionContext::new().with_progress(tx);
        ctx.report(EngineMessage::UpdateStarted { pipeline_index: 0 });
        assert_eq!(
            rx.try_recv().unwrap(),
            EngineMessage::UpdateStarted { pipeline_index: 0 }
        );
    }

    #[test]
    fn test_report_without_receiver_is_noop() {
        let (tx, rx) = unbounded();
        drop(rx);
        let ctx = ExecutionContext::new().with_progress(tx);
        ctx.report(EngineMessage::Aborted);
    }
}
