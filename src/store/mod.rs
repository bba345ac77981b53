//! Contracts for the collaborators the importer talks to.
//!
//! The importer never owns persisted entities. It asks a [`Lookup`] whether
//! something already exists, asks a [`Mutation`] to create what is missing,
//! and keeps only the identifiers it gets back.
//!
//! All methods take `&self`: a single store object usually serves both roles
//! and handles its own synchronization.

mod memory;

pub use memory::InMemoryStore;

use crate::error::PersistenceError;
use crate::model::{
    EntityKind, EntityLink, EntityLinkInput, Journal, JournalInput, Publication,
    PublicationInput, Publisher, PublisherInput,
};

/// Read-only queries against existing data. Each returns at most one match.
pub trait Lookup {
    fn find_journal_by_title(&self, title: &str) -> Option<Journal>;

    fn find_journal_by_abbreviation(&self, abbreviation: &str) -> Option<Journal>;

    /// `issn` is always passed in normalized `NNNN-NNNC` form.
    fn find_journal_by_issn(&self, issn: &str) -> Option<Journal>;

    fn find_publisher_by_name(&self, name: &str) -> Option<Publisher>;
}

/// Entity creation. Every call is its own independent persistence operation.
pub trait Mutation {
    fn create_publisher(&self, input: PublisherInput) -> Result<Publisher, PersistenceError>;

    fn create_journal(&self, input: JournalInput) -> Result<Journal, PersistenceError>;

    fn create_publication(&self, input: PublicationInput) -> Result<Publication, PersistenceError>;

    fn create_entity_link(&self, input: EntityLinkInput) -> Result<EntityLink, PersistenceError>;
}

/// Journal title abbreviation service.
pub trait Abbreviator {
    /// Derive an ISO-4 abbreviation from a full journal title.
    fn abbreviate(&self, title: &str) -> String;

    /// Canonicalize an abbreviation supplied by the source.
    fn normalize_abbreviation(&self, raw: &str) -> String;
}

/// Which directed links between entity kinds the data model permits.
pub trait LinkCompatibility {
    fn can_link(&self, from: EntityKind, to: EntityKind) -> bool;
}

impl<F> LinkCompatibility for F
where
    F: Fn(EntityKind, EntityKind) -> bool,
{
    fn can_link(&self, from: EntityKind, to: EntityKind) -> bool {
        self(from, to)
    }
}

/// The outcome of one creation request, as inspected by the importer.
#[derive(Debug, Clone, PartialEq)]
pub enum Creation<T> {
    Created(T),
    /// A unique key already held the value; carries the sanitized message.
    DuplicateConflict(String),
    /// Any other failure; carries the sanitized message.
    Failed(String),
}

impl<T> From<Result<T, PersistenceError>> for Creation<T> {
    fn from(result: Result<T, PersistenceError>) -> Self {
        match result {
            Ok(entity) => Creation::Created(entity),
            Err(err) if err.is_duplicate() => Creation::DuplicateConflict(err.sanitized_message()),
            Err(err) => Creation::Failed(err.sanitized_message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_creation_from_result() {
        let ok: Creation<u32> = Ok(7).into();
        assert_eq!(ok, Creation::Created(7));

        let dup: Creation<u32> = Err(PersistenceError::DuplicateKey(
            "duplicate key; SQL [insert]".to_string(),
        ))
        .into();
        assert_eq!(dup, Creation::DuplicateConflict("duplicate key".to_string()));

        let failed: Creation<u32> =
            Err(PersistenceError::ConstraintViolation("title must not be null".to_string())).into();
        assert_eq!(failed, Creation::Failed("title must not be null".to_string()));
    }
}
