use std::path::PathBuf;

use thiserror::Error;

use crate::parser::layout::Field;

/// A page could not be loaded or retrieved. Never fatal to a run: the page
/// simply contributes no rows.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("page {page}: no file at {}", path.display())]
    Missing { page: u32, path: PathBuf },

    #[error("page {page}: {source}")]
    Io {
        page: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("page {page}: request failed: {source}")]
    Http {
        page: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("page {page}: server returned {status}")]
    Status { page: u32, status: u16 },
}

impl FetchError {
    pub fn page(&self) -> u32 {
        match self {
            FetchError::Missing { page, .. }
            | FetchError::Io { page, .. }
            | FetchError::Http { page, .. }
            | FetchError::Status { page, .. } => *page,
        }
    }
}

/// Failure of a single variable block, without page context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    #[error("unrecognized layout: {0} tables (expected 3 or 4)")]
    UnrecognizedVariant(usize),

    #[error("{field} table (index {table}) is malformed: {reason}")]
    MalformedTable {
        field: Field,
        table: usize,
        reason: String,
    },
}

impl BlockError {
    pub fn malformed(field: Field, table: usize, reason: impl Into<String>) -> Self {
        BlockError::MalformedTable {
            field,
            table,
            reason: reason.into(),
        }
    }
}

/// A block failure located within the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("page {page}, block {block}: {kind}")]
pub struct ParseError {
    pub page: u32,
    pub block: usize,
    #[source]
    pub kind: BlockError,
}

#[derive(Debug, Error)]
#[error("invalid selector {selector:?}: {reason}")]
pub struct SelectorError {
    pub selector: String,
    pub reason: String,
}
