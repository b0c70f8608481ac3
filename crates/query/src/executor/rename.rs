//! Rename stream.

use crate::stream::{BoxedStream, RowStream};
use quarry_core::pattern_match::PathPattern;
use quarry_core::schema::{Field, Header, HeaderRef, KEY_NAME};
use quarry_core::{Error, Result, Row};
use hashbrown::HashSet;

/// Renames fields according to `(from, to)` aliases; the first matching alias wins.
///
/// - `*` -> `p.*` prefixes every field with `p.`
/// - `a.*` -> `b.*` replaces the leading `a.` with `b.`
/// - `a` -> `b` renames the field `a`
/// - `a` -> `key` turns the integral field `a` into the row key
///
/// Fields matching an ignore pattern keep their names.
pub struct RenameStream {
    input: BoxedStream,
    aliases: Vec<(String, String)>,
    ignore: Vec<PathPattern>,
    header: Option<HeaderRef>,
    key_index: Option<usize>,
}

impl RenameStream {
    pub fn new(
        input: BoxedStream,
        aliases: Vec<(String, String)>,
        ignore_patterns: &[String],
    ) -> Result<Self> {
        let ignore = ignore_patterns
            .iter()
            .map(|p| PathPattern::new(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            input,
            aliases,
            ignore,
            header: None,
            key_index: None,
        })
    }

    fn rename(&self, name: &str) -> Option<String> {
        for (from, to) in &self.aliases {
            if from == "*" {
                if let Some(prefix) = to.strip_suffix(".*") {
                    return Some(format!("{prefix}.{name}"));
                }
            } else if let (Some(old), Some(new)) = (from.strip_suffix(".*"), to.strip_suffix(".*"))
            {
                if let Some(rest) = name.strip_prefix(old).and_then(|r| r.strip_prefix('.')) {
                    return Some(format!("{new}.{rest}"));
                }
            } else if from == name {
                return Some(to.clone());
            }
        }
        None
    }

    fn init(&mut self) -> Result<HeaderRef> {
        if let Some(header) = &self.header {
            return Ok(header.clone());
        }
        let input = self.input.header()?;
        let mut fields = Vec::with_capacity(input.len());
        let mut key_index = None;
        for (i, field) in input.fields().iter().enumerate() {
            if self.ignore.iter().any(|p| p.matches(field.full_name())) {
                fields.push(field.clone());
                continue;
            }
            match self.rename(field.name()) {
                Some(new) if new == KEY_NAME => {
                    if input.has_key() || key_index.is_some() {
                        return Err(Error::invalid_parameter(format!(
                            "cannot rename {} to key: stream already has a key",
                            field.full_name()
                        )));
                    }
                    if !field.data_type().is_integral() {
                        return Err(Error::invalid_parameter(format!(
                            "cannot rename {} column {} to key",
                            field.data_type(),
                            field.full_name()
                        )));
                    }
                    key_index = Some(i);
                }
                Some(new) => fields.push(field.renamed(new)),
                None => fields.push(field.clone()),
            }
        }

        check_unique(&fields)?;
        let header = Header::of(input.has_key() || key_index.is_some(), fields).into_ref();
        self.key_index = key_index;
        self.header = Some(header.clone());
        Ok(header)
    }
}

/// Fails if two fields share a full name.
fn check_unique(fields: &[Field]) -> Result<()> {
    let mut seen = HashSet::with_capacity(fields.len());
    match fields.iter().map(Field::full_name).find(|n| !seen.insert(*n)) {
        Some(dup) => Err(Error::invalid_parameter(format!(
            "duplicate column {dup} after rename"
        ))),
        None => Ok(()),
    }
}

impl RowStream for RenameStream {
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
        match self.key_index {
            None => Row::try_new(header, row.key(), row.into_values()),
            Some(index) => {
                let key = row.values()[index].as_i64().ok_or_else(|| {
                    Error::execution(format!("null value in column renamed to {KEY_NAME}"))
                })?;
                let mut values = row.into_values();
                values.remove(index);
                Row::try_new(header, Some(key), values)
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.input.close()
    }
}
