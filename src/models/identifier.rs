//! Document identifiers and the ordered lists they come in.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Opaque name of one fetchable document, e.g. an article title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Ordered, read-only sequence of identifiers.
///
/// On disk this is UTF-8 text with one identifier per line and no header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierList {
    items: Vec<Identifier>,
}

impl IdentifierList {
    pub fn new(items: Vec<Identifier>) -> Self {
        Self { items }
    }

    /// Parse line-delimited text. Trailing `\r` is stripped and blank lines
    /// are skipped; everything else is kept verbatim and in order.
    pub fn parse(content: &str) -> Self {
        let items = content
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty())
            .map(Identifier::from)
            .collect();
        Self { items }
    }

    /// Read a list file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| AppError::ListFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    /// Render back to the on-disk format, newline terminated.
    pub fn to_lines(&self) -> String {
        let mut out = String::new();
        for id in &self.items {
            out.push_str(id.as_str());
            out.push('\n');
        }
        out
    }

    /// The first `limit` identifiers. `None`, zero, or a negative limit
    /// selects the whole list.
    pub fn first(&self, limit: Option<i64>) -> &[Identifier] {
        match limit {
            Some(n) if n > 0 => {
                let n = usize::try_from(n).unwrap_or(usize::MAX);
                &self.items[..n.min(self.items.len())]
            }
            _ => &self.items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identifier> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Identifier] {
        &self.items
    }
}

impl FromIterator<Identifier> for IdentifierList {
    fn from_iter<T: IntoIterator<Item = Identifier>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
