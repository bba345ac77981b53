//! Import RIS citations into an evidence store.
//!
//! `evidence-ris` reads RIS records from a text stream, resolves each record's
//! journal and publisher against existing data, creates whatever is missing,
//! persists the publication and links it to caller-supplied master entities.
//! Every record yields an [`ImportOutcome`] carrying line-numbered
//! [`Diagnostic`]s, so one malformed citation never stops the rest of a file.
//!
//! # Features
//!
//! - `regex` - Use the `regex` crate (enabled by default)
//! - `lite` - Use `regex-lite` instead, for smaller binaries
//! - `diagnostics` - Render import reports against the source with `ariadne`
//!
//! # Basic Usage
//!
//! ```rust
//! use evidence_ris::{ImportResult, Iso4Abbreviator, InMemoryStore};
//! use evidence_ris::ris::{ImportContext, RisImporter};
//!
//! let input = "TY  - JOUR\nTI  - A Study of Things\nER  - \n";
//!
//! let store = InMemoryStore::new();
//! let abbreviator = Iso4Abbreviator::new();
//! let importer = RisImporter::with_store(&store, &abbreviator);
//!
//! let outcomes = importer.import_str(input, &ImportContext::default());
//! assert_eq!(outcomes.len(), 1);
//! assert_eq!(outcomes[0].result, ImportResult::Imported);
//! assert_eq!(outcomes[0].label.as_deref(), Some("A Study of Things"));
//! ```
//!
//! # Error Handling
//!
//! Per-tag and per-record problems never fail the call; they end up as
//! diagnostics on the record's outcome. Only a failure to read the stream
//! itself is returned as an [`ImportError`]:
//!
//! ```rust
//! use evidence_ris::{ImportError, Iso4Abbreviator, InMemoryStore};
//! use evidence_ris::ris::{ImportContext, RisImporter};
//!
//! let bytes: &[u8] = b"TY  - JOUR\nTI  - \xff\xfe\nER  - \n";
//! let store = InMemoryStore::new();
//! let abbreviator = Iso4Abbreviator::new();
//! let result = RisImporter::with_store(&store, &abbreviator)
//!     .import(bytes, &ImportContext::default());
//! assert!(matches!(result, Err(ImportError::Io { line: 2, .. })));
//! ```
//!
//! # Partial Failure
//!
//! There is no transaction around an import. A journal created for a record
//! stays created even when that record's publication is rejected, and later
//! records reuse it.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod abbreviation;
#[cfg(feature = "diagnostics")]
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod ris;
pub mod store;
pub mod utils;

mod regex;

// Reexports
pub use abbreviation::Iso4Abbreviator;
#[cfg(feature = "diagnostics")]
pub use diagnostics::render_report;
pub use error::{ImportError, PersistenceError, ValueError};
pub use model::{EntityId, EntityKind, EntityRef, PublicationKind};
pub use ris::{ImportConfig, ImportContext, MasterRecord, RisImporter};
pub use store::{Abbreviator, InMemoryStore, LinkCompatibility, Lookup, Mutation};

/// How seriously a diagnostic should be taken. Advisory only: nothing in the
/// pipeline escalates on severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation made while importing a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 1-based source line at which the condition was observed
    pub line_number: usize,
    pub severity: Severity,
    pub text: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}: {}", self.line_number, self.severity, self.text)
    }
}

/// Final state of an imported record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportResult {
    Imported,
    /// The store already held an equal publication.
    Duplicate,
    Error,
}

/// The report for one input record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportOutcome {
    /// Identifier of the created publication, absent on failure
    pub id: Option<EntityId>,
    /// Title of the record, once known
    pub label: Option<String>,
    pub result: ImportResult,
    /// Append-only, in the order the conditions were observed
    pub messages: Vec<Diagnostic>,
}

impl Default for ImportOutcome {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportOutcome {
    /// A fresh outcome. It stays `Error` until the record is imported.
    pub fn new() -> Self {
        Self {
            id: None,
            label: None,
            result: ImportResult::Error,
            messages: Vec::new(),
        }
    }

    pub fn add_message(&mut self, line_number: usize, severity: Severity, text: impl Into<String>) {
        self.messages.push(Diagnostic {
            line_number,
            severity,
            text: text.into(),
        });
    }

    pub fn info(&mut self, line_number: usize, text: impl Into<String>) {
        self.add_message(line_number, Severity::Info, text);
    }

    pub fn warning(&mut self, line_number: usize, text: impl Into<String>) {
        self.add_message(line_number, Severity::Warning, text);
    }

    pub fn error(&mut self, line_number: usize, text: impl Into<String>) {
        self.add_message(line_number, Severity::Error, text);
    }

    /// Number of diagnostics with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.messages.iter().filter(|m| m.severity == severity).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_outcome_starts_as_error() {
        let outcome = ImportOutcome::new();
        assert_eq!(outcome.result, ImportResult::Error);
        assert!(outcome.id.is_none());
        assert!(outcome.messages.is_empty());
    }

    #[test]
    fn test_messages_keep_insertion_order() {
        let mut outcome = ImportOutcome::new();
        outcome.error(3, "third line");
        outcome.info(1, "first line");
        outcome.warning(2, "second line");

        let lines: Vec<usize> = outcome.messages.iter().map(|m| m.line_number).collect();
        assert_eq!(lines, vec![3, 1, 2]);
        assert_eq!(outcome.count(Severity::Info), 1);
        assert_eq!(outcome.count(Severity::Warning), 1);
        assert!(outcome.has_errors());
    }

    #[test]
    fn test_diagnostic_display() {
        let diagnostic = Diagnostic {
            line_number: 7,
            severity: Severity::Warning,
            text: "skipping unknown tag XX".to_string(),
        };
        assert_eq!(diagnostic.to_string(), "line 7: warning: skipping unknown tag XX");
    }
}
