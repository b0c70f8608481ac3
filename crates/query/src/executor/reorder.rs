//! Reorder stream.

use crate::stream::{BoxedStream, RowStream};
use quarry_core::pattern_match::PathPattern;
use quarry_core::schema::{Header, HeaderRef};
use quarry_core::{Error, Result, Row};

/// Permutes fields into pattern order.
///
/// Each pattern contributes the fields it matches that no earlier pattern
/// claimed. Wildcard matches are sorted by full name unless the pattern's
/// `keep_order` flag is set, which is used for function-derived columns whose
/// order is meaningful. Unmatched fields are dropped.
pub struct ReorderStream {
    input: BoxedStream,
    patterns: Vec<(PathPattern, bool)>,
    header: Option<HeaderRef>,
    indices: Vec<usize>,
}

impl ReorderStream {
    pub fn new(input: BoxedStream, patterns: &[String], keep_order: &[bool]) -> Result<Self> {
        if !keep_order.is_empty() && keep_order.len() != patterns.len() {
            return Err(Error::invalid_parameter(format!(
                "reorder has {} patterns but {} order flags",
                patterns.len(),
                keep_order.len()
            )));
        }
        let patterns = patterns
            .iter()
            .enumerate()
            .map(|(i, p)| -> Result<(PathPattern, bool)> {
                Ok((PathPattern::new(p)?, keep_order.get(i).copied().unwrap_or(false)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            input,
            patterns,
            header: None,
            indices: Vec::new(),
        })
    }

    fn init(&mut self) -> Result<HeaderRef> {
        if let Some(header) = &self.header {
            return Ok(header.clone());
        }
        let input = self.input.header()?;
        let mut indices: Vec<usize> = Vec::with_capacity(input.len());
        for (pattern, keep_order) in &self.patterns {
            let mut matched: Vec<usize> = input
                .pattern_indices(pattern)
                .into_iter()
                .filter(|i| !indices.contains(i))
                .collect();
            if pattern.is_wildcard() && !keep_order {
                matched.sort_by(|a, b| {
                    let a = input.fields()[*a].full_name();
                    let b = input.fields()[*b].full_name();
                    a.cmp(b)
                });
            }
            indices.extend(matched);
        }
        let fields = indices
            .iter()
            .filter_map(|&i| input.field(i).cloned())
            .collect();
        let header = Header::of(input.has_key(), fields).into_ref();
        self.indices = indices;
        self.header = Some(header.clone());
        Ok(header)
    }
}

impl RowStream for ReorderStream {
    fn header(&mut self) -> Result<HeaderRef> {
        self.init()
    }

    fn has_next(&mut self) -> Result<bool> {
        self.init()?;
        self.input.has_next()
    }

    fn next(&mut self) -> Result<Row> {
        let header = self.init()?;
        let row = self.input.next()?;
        let values = self
            .indices
            .iter()
            .map(|&i| row.values()[i].clone())
            .collect();
        Row::try_new(header, row.key(), values)
    }

    fn close(&mut self) -> Result<()> {
        self.input.close()
    }
}
