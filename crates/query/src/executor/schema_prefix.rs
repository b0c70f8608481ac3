//! AddSchemaPrefix stream.

use crate::stream::{BoxedStream, RowStream};
use quarry_core::schema::{Header, HeaderRef};
use quarry_core::{Result, Row};

/// Prepends `prefix.` to every field name. Without a prefix the input
/// header is passed through.
pub struct AddSchemaPrefixStream {
    input: BoxedStream,
    prefix: Option<String>,
    header: Option<HeaderRef>,
}

impl AddSchemaPrefixStream {
    pub fn new(input: BoxedStream, prefix: Option<String>) -> Self {
        Self {
            input,
            prefix,
            header: None,
        }
    }

    fn init(&mut self) -> Result<HeaderRef> {
        if let Some(header) = &self.header {
            return Ok(header.clone());
        }
        let input = self.input.header()?;
        let header = match self.prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => {
                let fields = input
                    .fields()
                    .iter()
                    .map(|f| f.renamed(format!("{prefix}.{}", f.name())))
                    .collect();
                Header::of(input.has_key(), fields).into_ref()
            }
            _ => input,
        };
        self.header = Some(header.clone());
        Ok(header)
    }
}

impl RowStream for AddSchemaPrefixStream {
    fn header(&mut self) -> Result<HeaderRef> {
        self.init()
    }

    fn has_next(&mut self) -> Result<bool> {
        self.input.has_next()
    }

    fn next(&mut self) -> Result<Row> {
        let header = self.init()?;
        let row = self.input.next()?;
        Ok(row.rebind(header))
    }

    fn close(&mut self) -> Result<()> {
        self.input.close()
    }
}
