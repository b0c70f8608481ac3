//! Request-scoped context shared by the streams of one query.

use std::cell::RefCell;
use std::rc::Rc;
use tracing::warn;

/// Advisory channel for non-fatal diagnostics raised while streaming.
///
/// Cloning is cheap and every clone appends to the same warning list. The
/// context never influences iteration: a stream that has no context bound
/// behaves identically apart from the missing messages.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    warnings: Rc<RefCell<Vec<String>>>,
}

impl RequestContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning and mirrors it to the log.
    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(%message, "query warning");
        self.warnings.borrow_mut().push(message);
    }

    /// Returns a snapshot of the recorded warnings.
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }

    /// Returns true if no warning has been recorded.
    pub fn is_clean(&self) -> bool {
        self.warnings.borrow().is_empty()
    }
}
