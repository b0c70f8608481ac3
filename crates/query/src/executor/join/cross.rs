//! Cross join.

use super::layout::JoinLayout;
use crate::stream::{close_pair, drain, BoxedStream, RowStream};
use quarry_core::schema::HeaderRef;
use quarry_core::{Error, Result, Row};
use tracing::debug;

/// Cartesian product of two streams.
///
/// The right side is drained once into a buffer in arrival order; each left
/// row is paired with every buffered right row.
pub struct CrossJoinStream {
    a: BoxedStream,
    b: BoxedStream,
    prefix_a: Option<String>,
    prefix_b: Option<String>,
    layout: Option<JoinLayout>,
    right: Vec<Row>,
    current: Option<Row>,
    position: usize,
}

impl CrossJoinStream {
    pub fn new(
        a: BoxedStream,
        b: BoxedStream,
        prefix_a: Option<String>,
        prefix_b: Option<String>,
    ) -> Self {
        Self {
            a,
            b,
            prefix_a,
            prefix_b,
            layout: None,
            right: Vec::new(),
            current: None,
            position: 0,
        }
    }

    fn init(&mut self) -> Result<&JoinLayout> {
        if self.layout.is_none() {
            let header_a = self.a.header()?;
            let header_b = self.b.header()?;
            self.right = drain(self.b.as_mut())?;
            debug!(rows = self.right.len(), "cross join buffered right side");
            self.layout = Some(JoinLayout::new(
                &header_a,
                &header_b,
                self.prefix_a.as_deref(),
                self.prefix_b.as_deref(),
                &[],
                &[],
            ));
        }
        self.layout
            .as_ref()
            .ok_or_else(|| Error::execution("cross join layout missing"))
    }
}

impl RowStream for CrossJoinStream {
    fn header(&mut self) -> Result<HeaderRef> {
        Ok(self.init()?.header().clone())
    }

    fn has_next(&mut self) -> Result<bool> {
        self.init()?;
        if self.right.is_empty() {
            return Ok(false);
        }
        while self.current.is_none() || self.position >= self.right.len() {
            if !self.a.has_next()? {
                self.current = None;
                return Ok(false);
            }
            self.current = Some(self.a.next()?);
            self.position = 0;
        }
        Ok(true)
    }

    fn next(&mut self) -> Result<Row> {
        if !self.has_next()? {
            return Err(Error::StreamExhausted);
        }
        let (Some(layout), Some(left)) = (self.layout.as_ref(), self.current.as_ref()) else {
            return Err(Error::StreamExhausted);
        };
        let row = layout.join(Some(left), Some(&self.right[self.position]));
        self.position += 1;
        Ok(row)
    }

    fn close(&mut self) -> Result<()> {
        close_pair(self.a.as_mut(), self.b.as_mut())
    }
}
