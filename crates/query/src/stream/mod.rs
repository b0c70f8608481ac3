//! Pull-based row stream protocol.
//!
//! Every operator is a decorator over one (unary) or two (binary) child
//! streams and exposes the same [`RowStream`] contract, so a plan tree is
//! executed by nothing more than repeated `has_next()`/`next()` calls on
//! its root:
//!
//! ```text
//!   consumer ── has_next()/next() ──▶ Limit
//!                                      │
//!                                   HashInnerJoin ── build: drained once
//!                                   │           │
//!                                 Select      Table
//!                                   │
//!                                 Table
//! ```
//!
//! A call returns only after it has done all the child pulling it needs,
//! which for blocking operators (Sort, GroupBy, hash build sides) means
//! draining a child completely.

mod table;

pub use table::Table;

use crate::context::RequestContext;
use quarry_core::schema::HeaderRef;
use quarry_core::{Error, Result, Row};
use tracing::warn;

/// The pull-iterator contract all operators implement and consume.
pub trait RowStream {
    /// Returns the stream header. Idempotent; may pull from children the
    /// first time when the schema depends on scanned values.
    fn header(&mut self) -> Result<HeaderRef>;

    /// Returns true if `next()` will yield a row. May pull and buffer.
    fn has_next(&mut self) -> Result<bool>;

    /// Returns the next row, or [`Error::StreamExhausted`] when `has_next()`
    /// is false.
    fn next(&mut self) -> Result<Row>;

    /// Releases child streams.
    fn close(&mut self) -> Result<()>;

    /// Binds the advisory request context. Most streams ignore it.
    fn set_context(&mut self, _context: &RequestContext) {}
}

/// Owned, type-erased stream.
pub type BoxedStream = Box<dyn RowStream>;

/// Lazy-initialization state of a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StreamState {
    /// Header and caches not built yet.
    #[default]
    Uninitialized,
    /// Ready to produce rows.
    Initialized,
    /// No further rows will be produced.
    Exhausted,
}

impl StreamState {
    #[inline]
    pub fn is_initialized(&self) -> bool {
        !matches!(self, StreamState::Uninitialized)
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, StreamState::Exhausted)
    }
}

/// Closes both children of a binary stream.
///
/// The second child is closed even if the first fails; the first failure
/// is returned and a second one is logged.
pub fn close_pair(left: &mut dyn RowStream, right: &mut dyn RowStream) -> Result<()> {
    let first = left.close();
    let second = right.close();
    match (first, second) {
        (Err(e), Err(other)) => {
            warn!(error = %other, "second child failed to close");
            Err(e)
        }
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Ok(()), Ok(())) => Ok(()),
    }
}

/// Pulls every remaining row of `stream`.
pub fn drain(stream: &mut dyn RowStream) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    while stream.has_next()? {
        rows.push(stream.next()?);
    }
    Ok(rows)
}

/// Drains a stream into a vector and closes it.
pub fn collect_rows(mut stream: BoxedStream) -> Result<Vec<Row>> {
    let rows = drain(stream.as_mut());
    let closed = stream.close();
    let rows = rows?;
    closed?;
    Ok(rows)
}
