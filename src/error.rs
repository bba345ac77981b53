//! Error types for the import pipeline.
//!
//! Only [`ImportError`] ever escapes an import call. Everything else here is
//! recovered locally and turned into a [`Diagnostic`](crate::Diagnostic) on the
//! record being imported.

use thiserror::Error;

/// Field name constants for consistent diagnostic text.
pub mod fields {
    pub const KIND: &str = "kind";
    pub const DATE: &str = "date";
    pub const YEAR: &str = "year";
    pub const JOURNAL: &str = "journal";
    pub const JOURNAL_ABBR: &str = "journal abbreviation";
    pub const ISSN: &str = "ISSN";
    pub const ISBN: &str = "ISBN";
    pub const DOI: &str = "DOI";
    pub const PMID: &str = "PMID";
    pub const PMC_ID: &str = "PMCID";
    pub const PUBLISHER: &str = "publisher";
    pub const TAG: &str = "tag";
}

/// Call-level failure: the input stream could not be read any further.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to read RIS input at line {line}: {source}")]
    Io {
        /// 1-based number of the line that could not be read
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

/// Failure reported by the persistence collaborator for a single creation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    /// A unique key already holds an equal value.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Any other integrity constraint (not-null, foreign key, check) failed.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("{0}")]
    Other(String),
}

impl PersistenceError {
    /// Whether this failure means the entity already exists.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, PersistenceError::DuplicateKey(_))
    }

    /// The underlying message with technical SQL detail removed.
    pub fn sanitized_message(&self) -> String {
        let raw = match self {
            PersistenceError::DuplicateKey(msg)
            | PersistenceError::ConstraintViolation(msg)
            | PersistenceError::Other(msg) => msg,
        };
        crate::utils::clean_persistence_message(raw)
    }
}

/// Value-level problems found while interpreting a tag.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("Invalid content: \"{0}\"")]
    Syntax(String),

    #[error("Missing value for {key}")]
    MissingValue {
        field: &'static str,
        key: &'static str,
    },

    #[error("Bad value for {key}: \"{value}\" ({reason})")]
    BadValue {
        field: &'static str,
        key: String,
        value: String,
        reason: String,
    },
}
