//! Column-wise join by key or by position.

use crate::stream::{close_pair, BoxedStream, RowStream};
use quarry_core::schema::{Header, HeaderRef};
use quarry_core::{Error, Result, Row, Value};
use std::fmt;
use std::str::FromStr;

/// What rows of the two inputs are paired on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinBy {
    /// Full outer merge of two keyed streams on ascending key.
    Key,
    /// Row `i` of A with row `i` of B.
    Ordinal,
}

impl FromStr for JoinBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "key" => Ok(JoinBy::Key),
            "ordinal" => Ok(JoinBy::Ordinal),
            other => Err(Error::invalid_parameter(format!(
                "join by {other} is not supported, expected key or ordinal"
            ))),
        }
    }
}

impl fmt::Display for JoinBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinBy::Key => f.write_str("key"),
            JoinBy::Ordinal => f.write_str("ordinal"),
        }
    }
}

/// Concatenates the columns of two streams: A's fields then B's.
///
/// Where one side has no row for a key (or position) its columns are null.
pub struct JoinByStream {
    a: BoxedStream,
    b: BoxedStream,
    join_by: JoinBy,
    header: Option<HeaderRef>,
    width_a: usize,
    width_b: usize,
    head_a: Option<Row>,
    head_b: Option<Row>,
}

impl JoinByStream {
    pub fn new(a: BoxedStream, b: BoxedStream, join_by: JoinBy) -> Self {
        Self {
            a,
            b,
            join_by,
            header: None,
            width_a: 0,
            width_b: 0,
            head_a: None,
            head_b: None,
        }
    }

    fn init(&mut self) -> Result<HeaderRef> {
        if let Some(header) = &self.header {
            return Ok(header.clone());
        }
        let header_a = self.a.header()?;
        let header_b = self.b.header()?;
        let keyed = self.join_by == JoinBy::Key;
        if keyed && !(header_a.has_key() && header_b.has_key()) {
            return Err(Error::invalid_parameter("join by key requires two keyed streams"));
        }
        let mut fields = header_a.fields().to_vec();
        fields.extend_from_slice(header_b.fields());
        let header = Header::of(keyed, fields).into_ref();
        self.width_a = header_a.len();
        self.width_b = header_b.len();
        self.header = Some(header.clone());
        Ok(header)
    }

    fn fill(stream: &mut BoxedStream, slot: &mut Option<Row>) -> Result<()> {
        if slot.is_none() && stream.has_next()? {
            *slot = Some(stream.next()?);
        }
        Ok(())
    }

    /// Takes the rows to combine next: both heads, or the one with the
    /// smaller key when joining by key.
    fn take_heads(&mut self) -> (Option<Row>, Option<Row>) {
        if self.join_by == JoinBy::Ordinal {
            return (self.head_a.take(), self.head_b.take());
        }
        let key_a = self.head_a.as_ref().and_then(Row::key);
        let key_b = self.head_b.as_ref().and_then(Row::key);
        match (key_a, key_b) {
            (Some(ka), Some(kb)) if ka < kb => (self.head_a.take(), None),
            (Some(ka), Some(kb)) if ka > kb => (None, self.head_b.take()),
            _ => (self.head_a.take(), self.head_b.take()),
        }
    }
}

impl RowStream for JoinByStream {
    fn header(&mut self) -> Result<HeaderRef> {
        self.init()
    }

    fn has_next(&mut self) -> Result<bool> {
        self.init()?;
        Self::fill(&mut self.a, &mut self.head_a)?;
        Self::fill(&mut self.b, &mut self.head_b)?;
        Ok(self.head_a.is_some() || self.head_b.is_some())
    }

    fn next(&mut self) -> Result<Row> {
        if !self.has_next()? {
            return Err(Error::StreamExhausted);
        }
        let header = self.init()?;
        let (row_a, row_b) = self.take_heads();
        let key = row_a.as_ref().or(row_b.as_ref()).and_then(Row::key);

        let mut values = Vec::with_capacity(header.len());
        match &row_a {
            Some(row) => values.extend_from_slice(row.values()),
            None => values.resize(self.width_a, Value::Null),
        }
        match row_b {
            Some(row) => values.extend(row.into_values()),
            None => values.resize(self.width_a + self.width_b, Value::Null),
        }
        Row::try_new(header, key, values)
    }

    fn close(&mut self) -> Result<()> {
        close_pair(self.a.as_mut(), self.b.as_mut())
    }
}
