//! A reference store that keeps everything in memory.
//!
//! It enforces the same unique keys and references a relational backend
//! would, so the importer's duplicate and failure paths can be exercised
//! without a database.

use super::{Lookup, Mutation};
use crate::error::PersistenceError;
use crate::model::{
    EntityId, EntityKind, EntityLink, EntityLinkInput, EntityRef, Journal, JournalInput,
    Publication, PublicationInput, Publisher, PublisherInput,
};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;

/// In-memory implementation of [`Lookup`] and [`Mutation`].
///
/// Unique keys: publisher name, journal title and ISSN, publication DOI,
/// and each (from, to) link pair. Names and titles compare case-insensitively.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    next_id: Cell<u64>,
    publishers: RefCell<Vec<Publisher>>,
    journals: RefCell<Vec<Journal>>,
    publications: RefCell<Vec<Publication>>,
    links: RefCell<Vec<EntityLink>>,
    /// Entities owned by other parts of the system, e.g. topics.
    external: RefCell<HashSet<EntityRef>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> EntityId {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        EntityId(id)
    }

    /// Make an entity that lives elsewhere linkable, returning its reference.
    pub fn register(&self, kind: EntityKind) -> EntityRef {
        let entity = EntityRef::new(kind, self.allocate_id());
        self.external.borrow_mut().insert(entity);
        entity
    }

    /// Seed a journal directly, bypassing uniqueness checks.
    pub fn insert_journal(&self, input: JournalInput, peer_reviewed: Option<bool>) -> Journal {
        let journal = Journal {
            id: self.allocate_id(),
            title: input.title,
            abbreviation: input.abbreviation,
            issn: input.issn,
            publisher_id: input.publisher_id,
            peer_reviewed,
        };
        self.journals.borrow_mut().push(journal.clone());
        journal
    }

    /// Seed a publisher directly, bypassing uniqueness checks.
    pub fn insert_publisher(&self, input: PublisherInput) -> Publisher {
        let publisher = Publisher {
            id: self.allocate_id(),
            name: input.name,
            location: input.location,
        };
        self.publishers.borrow_mut().push(publisher.clone());
        publisher
    }

    pub fn publishers(&self) -> Vec<Publisher> {
        self.publishers.borrow().clone()
    }

    pub fn journals(&self) -> Vec<Journal> {
        self.journals.borrow().clone()
    }

    pub fn publications(&self) -> Vec<Publication> {
        self.publications.borrow().clone()
    }

    pub fn links(&self) -> Vec<EntityLink> {
        self.links.borrow().clone()
    }

    fn exists(&self, entity: &EntityRef) -> bool {
        let id = entity.id;
        match entity.kind {
            EntityKind::Publication => self.publications.borrow().iter().any(|p| p.id == id),
            EntityKind::Journal => self.journals.borrow().iter().any(|j| j.id == id),
            EntityKind::Publisher => self.publishers.borrow().iter().any(|p| p.id == id),
            _ => self.external.borrow().contains(entity),
        }
    }

    fn require_journal(&self, id: Option<EntityId>) -> Result<(), PersistenceError> {
        match id {
            Some(id) if !self.journals.borrow().iter().any(|j| j.id == id) => Err(
                PersistenceError::ConstraintViolation(format!("journal {} does not exist", id)),
            ),
            _ => Ok(()),
        }
    }

    fn require_publisher(&self, id: Option<EntityId>) -> Result<(), PersistenceError> {
        match id {
            Some(id) if !self.publishers.borrow().iter().any(|p| p.id == id) => Err(
                PersistenceError::ConstraintViolation(format!("publisher {} does not exist", id)),
            ),
            _ => Ok(()),
        }
    }
}

fn require_text(value: &str, what: &str) -> Result<(), PersistenceError> {
    if value.trim().is_empty() {
        Err(PersistenceError::ConstraintViolation(format!(
            "{} must not be empty",
            what
        )))
    } else {
        Ok(())
    }
}

impl Lookup for InMemoryStore {
    fn find_journal_by_title(&self, title: &str) -> Option<Journal> {
        self.journals
            .borrow()
            .iter()
            .find(|j| j.title.eq_ignore_ascii_case(title.trim()))
            .cloned()
    }

    fn find_journal_by_abbreviation(&self, abbreviation: &str) -> Option<Journal> {
        self.journals
            .borrow()
            .iter()
            .find(|j| {
                j.abbreviation
                    .as_deref()
                    .is_some_and(|a| a.eq_ignore_ascii_case(abbreviation.trim()))
            })
            .cloned()
    }

    fn find_journal_by_issn(&self, issn: &str) -> Option<Journal> {
        self.journals
            .borrow()
            .iter()
            .find(|j| j.issn.as_deref() == Some(issn))
            .cloned()
    }

    fn find_publisher_by_name(&self, name: &str) -> Option<Publisher> {
        self.publishers
            .borrow()
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
            .cloned()
    }
}

impl Mutation for InMemoryStore {
    fn create_publisher(&self, input: PublisherInput) -> Result<Publisher, PersistenceError> {
        require_text(&input.name, "publisher name")?;
        if self.find_publisher_by_name(&input.name).is_some() {
            return Err(PersistenceError::DuplicateKey(format!(
                "publisher \"{}\" already exists; SQL [insert into publisher (name, location) values (?, ?)]",
                input.name
            )));
        }
        Ok(self.insert_publisher(input))
    }

    fn create_journal(&self, input: JournalInput) -> Result<Journal, PersistenceError> {
        require_text(&input.title, "journal title")?;
        self.require_publisher(input.publisher_id)?;
        if self.find_journal_by_title(&input.title).is_some() {
            return Err(PersistenceError::DuplicateKey(format!(
                "journal \"{}\" already exists",
                input.title
            )));
        }
        if let Some(issn) = input.issn.as_deref()
            && self.find_journal_by_issn(issn).is_some()
        {
            return Err(PersistenceError::DuplicateKey(format!(
                "journal with ISSN {} already exists",
                issn
            )));
        }
        Ok(self.insert_journal(input, None))
    }

    fn create_publication(&self, input: PublicationInput) -> Result<Publication, PersistenceError> {
        require_text(&input.title, "publication title")?;
        self.require_journal(input.journal_id)?;
        self.require_publisher(input.publisher_id)?;
        if let Some(doi) = input.doi.as_deref()
            && self
                .publications
                .borrow()
                .iter()
                .any(|p| p.details.doi.as_deref() == Some(doi))
        {
            return Err(PersistenceError::DuplicateKey(format!(
                "duplicate key value violates unique constraint \"uk_publication_doi\"\n  Detail: Key (doi)=({}) already exists.",
                doi
            )));
        }

        let publication = Publication {
            id: self.allocate_id(),
            details: input,
        };
        self.publications.borrow_mut().push(publication.clone());
        Ok(publication)
    }

    fn create_entity_link(&self, input: EntityLinkInput) -> Result<EntityLink, PersistenceError> {
        for end in [&input.from, &input.to] {
            if !self.exists(end) {
                return Err(PersistenceError::ConstraintViolation(format!(
                    "{} does not exist",
                    end
                )));
            }
        }
        if self
            .links
            .borrow()
            .iter()
            .any(|l| l.from == input.from && l.to == input.to)
        {
            return Err(PersistenceError::DuplicateKey(format!(
                "link {} -> {} already exists",
                input.from, input.to
            )));
        }

        let link = EntityLink {
            id: self.allocate_id(),
            from: input.from,
            to: input.to,
        };
        self.links.borrow_mut().push(link);
        Ok(link)
    }
}
