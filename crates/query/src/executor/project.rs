//! Project stream.

use crate::stream::{BoxedStream, RowStream};
use quarry_core::pattern_match::PathPattern;
use quarry_core::schema::{Header, HeaderRef, KEY_NAME};
use quarry_core::{Error, Result, Row};

/// Keeps the fields matching any of the patterns, in header order.
///
/// Rows whose retained values are all null are dropped. With `remain_key`
/// set, fields named `key` or `*.key` (keys of joined inputs) are kept too.
pub struct ProjectStream {
    input: BoxedStream,
    patterns: Vec<PathPattern>,
    remain_key: bool,
    header: Option<HeaderRef>,
    indices: Vec<usize>,
    next_row: Option<Row>,
}

impl ProjectStream {
    pub fn new(input: BoxedStream, patterns: &[String], remain_key: bool) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| PathPattern::new(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            input,
            patterns,
            remain_key,
            header: None,
            indices: Vec::new(),
            next_row: None,
        })
    }

    fn init(&mut self) -> Result<HeaderRef> {
        if let Some(header) = &self.header {
            return Ok(header.clone());
        }
        let input = self.input.header()?;
        let key_suffix = format!(".{KEY_NAME}");
        self.indices = input
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| {
                self.patterns.iter().any(|p| p.matches(f.full_name()))
                    || (self.remain_key
                        && (f.name() == KEY_NAME || f.name().ends_with(&key_suffix)))
            })
            .map(|(i, _)| i)
            .collect();
        let fields = self
            .indices
            .iter()
            .filter_map(|&i| input.field(i).cloned())
            .collect();
        let header = Header::of(input.has_key(), fields).into_ref();
        self.header = Some(header.clone());
        Ok(header)
    }
}

impl RowStream for ProjectStream {
    fn header(&mut self) -> Result<HeaderRef> {
        self.init()
    }

    fn has_next(&mut self) -> Result<bool> {
        let header = self.init()?;
        while self.next_row.is_none() && self.input.has_next()? {
            let row = self.input.next()?;
            let values: Vec<_> = self
                .indices
                .iter()
                .map(|&i| row.values()[i].clone())
                .collect();
            if values.iter().all(|v| v.is_null()) {
                continue;
            }
            self.next_row = Some(Row::try_new(header.clone(), row.key(), values)?);
        }
        Ok(self.next_row.is_some())
    }

    fn next(&mut self) -> Result<Row> {
        if !self.has_next()? {
            return Err(Error::StreamExhausted);
        }
        self.next_row.take().ok_or(Error::StreamExhausted)
    }

    fn close(&mut self) -> Result<()> {
        self.input.close()
    }
}
