//! Field definition for stream headers.

use crate::types::DataType;
use std::collections::BTreeMap;
use std::fmt;

/// Name of the synthetic key field.
pub const KEY_NAME: &str = "key";

/// A named, typed column in a stream header.
///
/// Tags disambiguate columns sharing a name. The full name is the name
/// followed by the tags in key order, e.g. `cpu.usage{host=a,region=eu}`.
/// Two fields are equal iff name, type and tags match.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    /// Dotted path.
    name: String,
    /// Declared type.
    data_type: DataType,
    /// Tag set, kept sorted so the full name is stable.
    tags: BTreeMap<String, String>,
    /// Cached `name{tags}`.
    full_name: String,
}

impl Field {
    /// Creates an untagged field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self::with_tags(name, data_type, BTreeMap::new())
    }

    /// Creates a tagged field.
    pub fn with_tags(
        name: impl Into<String>,
        data_type: DataType,
        tags: BTreeMap<String, String>,
    ) -> Self {
        let name = name.into();
        let full_name = full_name_of(&name, &tags);
        Self {
            name,
            data_type,
            tags,
            full_name,
        }
    }

    /// The synthetic key field.
    pub fn key() -> Self {
        Self::new(KEY_NAME, DataType::Int64)
    }

    /// Returns the field name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the full name including tags.
    #[inline]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Returns the data type.
    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns the tag set.
    #[inline]
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Returns a copy of this field under a new name, keeping type and tags.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self::with_tags(name, self.data_type, self.tags.clone())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.full_name, self.data_type)
    }
}

fn full_name_of(name: &str, tags: &BTreeMap<String, String>) -> String {
    if tags.is_empty() {
        return name.to_string();
    }
    let tags: Vec<String> = tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{name}{{{}}}", tags.join(","))
}
