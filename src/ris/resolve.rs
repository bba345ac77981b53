//! End-of-record resolution.
//!
//! Turns a finished [`RecordAccumulator`] into persisted entities: publisher,
//! journal, publication and the links to the caller's master entities. Each
//! creation stands on its own, so a failure late in the sequence leaves the
//! earlier entities in place.

use super::config::ImportConfig;
use super::structure::{JournalIdentity, PublisherIdentity, RecordAccumulator};
use super::{ImportContext, MasterRecord};
use crate::model::{
    EntityId, EntityKind, EntityLinkInput, EntityRef, Journal, JournalInput, PublicationInput,
    PublisherInput,
};
use crate::store::{Abbreviator, Creation, Lookup, Mutation};
use crate::utils::{format_page_numbers, truncate_chars};
use crate::{ImportOutcome, ImportResult};
use itertools::Itertools;
use tracing::{debug, warn};

pub(crate) const MISSING_TITLE: &str =
    "Cannot import record: missing or invalid TY and/or TI (no title)";

/// Collaborators and settings shared by every record of one import call.
pub(crate) struct Resolver<'r> {
    pub(crate) lookup: &'r dyn Lookup,
    pub(crate) mutation: &'r dyn Mutation,
    pub(crate) abbreviator: &'r dyn Abbreviator,
    pub(crate) config: &'r ImportConfig,
    pub(crate) context: &'r ImportContext,
}

impl Resolver<'_> {
    /// Persist a closed record. All diagnostics are reported at `line`, the
    /// line of the closing `ER`.
    pub(crate) fn finish(&self, record: RecordAccumulator, outcome: &mut ImportOutcome, line: usize) {
        let Some(title) = record.title.as_ref().map(|t| t.text.clone()) else {
            outcome.error(line, MISSING_TITLE);
            return;
        };
        outcome.label = Some(title.clone());

        let publisher_id = self.resolve_publisher(&record.publisher, outcome, line);
        self.cross_check_journal(&record.journal, outcome, line);
        let journal = self.resolve_journal(&record, publisher_id, outcome, line);

        let input = self.publication_input(record, title, journal.as_ref(), publisher_id);
        match Creation::from(self.mutation.create_publication(input)) {
            Creation::Created(publication) => {
                debug!("Created publication #{}", publication.id);
                outcome.id = Some(publication.id);
                outcome.result = ImportResult::Imported;
                outcome.info(line, format!("Created publication #{}", publication.id));
                self.link(publication.id, outcome, line);
            }
            Creation::DuplicateConflict(message) => {
                outcome.result = ImportResult::Duplicate;
                outcome.error(line, format!("Publication already exists: {}", message));
            }
            Creation::Failed(message) => {
                warn!("Failed to create publication at line {}: {}", line, message);
                outcome.result = ImportResult::Error;
                outcome.error(line, format!("Could not create publication: {}", message));
            }
        }
    }

    fn resolve_publisher(
        &self,
        publisher: &PublisherIdentity,
        outcome: &mut ImportOutcome,
        line: usize,
    ) -> Option<EntityId> {
        if let Some(candidate) = &publisher.candidate {
            return Some(candidate.id);
        }
        let name = publisher.name.as_deref()?;

        let input = PublisherInput {
            name: name.to_string(),
            location: publisher.location.clone(),
        };
        match Creation::from(self.mutation.create_publisher(input)) {
            Creation::Created(created) => {
                debug!("Created publisher #{} \"{}\"", created.id, created.name);
                outcome.info(line, format!("Created publisher #{} \"{}\"", created.id, created.name));
                Some(created.id)
            }
            // Somebody else created it since the lookup.
            Creation::DuplicateConflict(message) => match self.lookup.find_publisher_by_name(name) {
                Some(existing) => Some(existing.id),
                None => {
                    outcome.warning(line, format!("Could not create publisher \"{}\": {}", name, message));
                    None
                }
            },
            Creation::Failed(message) => {
                warn!("Failed to create publisher \"{}\": {}", name, message);
                outcome.warning(line, format!("Could not create publisher \"{}\": {}", name, message));
                None
            }
        }
    }

    /// Warn about every pair of journal keys that found different journals.
    fn cross_check_journal(&self, journal: &JournalIdentity, outcome: &mut ImportOutcome, line: usize) {
        let keys = [
            ("ISSN", journal.issn.as_deref(), journal.by_issn.as_ref()),
            ("title", journal.title.as_deref(), journal.by_title.as_ref()),
            ("abbreviation", journal.abbreviation.as_deref(), journal.by_abbreviation.as_ref()),
        ];

        for ((key_a, value_a, found_a), (key_b, value_b, found_b)) in keys.iter().tuple_combinations() {
            if let (Some(a), Some(b)) = (found_a, found_b)
                && a.id != b.id
            {
                outcome.warning(
                    line,
                    format!(
                        "Conflicting journals: {} \"{}\" matches journal #{} but {} \"{}\" matches journal #{}",
                        key_a,
                        value_a.unwrap_or_default(),
                        a.id,
                        key_b,
                        value_b.unwrap_or_default(),
                        b.id
                    ),
                );
            }
        }
    }

    fn resolve_journal(
        &self,
        record: &RecordAccumulator,
        publisher_id: Option<EntityId>,
        outcome: &mut ImportOutcome,
        line: usize,
    ) -> Option<Journal> {
        let journal = &record.journal;
        if let Some(found) = journal
            .by_issn
            .as_ref()
            .or(journal.by_title.as_ref())
            .or(journal.by_abbreviation.as_ref())
        {
            return Some(found.clone());
        }

        if journal.is_empty() {
            outcome.warning(line, "No journal title, abbreviation or ISSN; importing without a journal");
            return None;
        }

        let Some(title) = journal.title.as_ref().or(journal.abbreviation.as_ref()) else {
            outcome.warning(
                line,
                format!(
                    "No journal with ISSN {} and no title to create one; importing without a journal",
                    journal.issn.as_deref().unwrap_or_default()
                ),
            );
            return None;
        };

        let abbreviation = match &journal.abbreviation {
            Some(supplied) => supplied.clone(),
            None => self.abbreviator.abbreviate(title),
        };
        let input = JournalInput {
            title: title.clone(),
            abbreviation: (!abbreviation.is_empty()).then_some(abbreviation),
            issn: journal.issn.clone(),
            publisher_id,
        };

        match Creation::from(self.mutation.create_journal(input)) {
            Creation::Created(created) => {
                debug!("Created journal #{} \"{}\"", created.id, created.title);
                outcome.info(line, format!("Created journal #{} \"{}\"", created.id, created.title));
                Some(created)
            }
            Creation::DuplicateConflict(message) => {
                let existing = journal
                    .issn
                    .as_deref()
                    .and_then(|issn| self.lookup.find_journal_by_issn(issn))
                    .or_else(|| self.lookup.find_journal_by_title(title));
                if existing.is_none() {
                    outcome.warning(line, format!("Could not create journal \"{}\": {}", title, message));
                }
                existing
            }
            Creation::Failed(message) => {
                warn!("Failed to create journal \"{}\": {}", title, message);
                outcome.warning(line, format!("Could not create journal \"{}\": {}", title, message));
                None
            }
        }
    }

    fn publication_input(
        &self,
        record: RecordAccumulator,
        title: String,
        journal: Option<&Journal>,
        publisher_id: Option<EntityId>,
    ) -> PublicationInput {
        let authors = record.authors.join("\n");
        let keywords = record.keywords.join(&self.config.keyword_separator);
        let notes = record.notes.join(&self.config.notes_separator);
        let pages = match (record.start_page, record.end_page) {
            (Some(start), Some(end)) => Some(format_page_numbers(&format!("{}-{}", start, end))),
            (start, end) => start.or(end),
        };

        let mut input = PublicationInput::new(record.kind, title);
        input.authors = non_empty(truncate_chars(&authors, self.config.author_limit));
        input.keywords = non_empty(truncate_chars(&keywords, self.config.keyword_limit));
        input.notes = non_empty(&notes);
        input.journal_id = journal.map(|j| j.id);
        input.peer_reviewed = journal.and_then(|j| j.peer_reviewed);
        input.publisher_id = publisher_id;
        input.date = record.date;
        input.year = record.year;
        input.volume = record.volume;
        input.issue = record.issue;
        input.pages = pages;
        input.doi = record.doi;
        input.isbn = record.isbn;
        input.url = record.url;
        input.pmid = record.pmid;
        input.pmcid = record.pmcid;
        input.abstract_text = record.abstract_text;
        input.language = record.language;
        input
    }

    fn link(&self, publication: EntityId, outcome: &mut ImportOutcome, line: usize) {
        let publication = EntityRef::new(EntityKind::Publication, publication);

        if let Some(topic) = self.context.master_topic_id {
            self.create_link(EntityRef::new(EntityKind::Topic, topic), publication, outcome, line);
        }
        match self.context.master_record {
            Some(MasterRecord::From(record)) => self.create_link(record, publication, outcome, line),
            Some(MasterRecord::To(record)) => self.create_link(publication, record, outcome, line),
            None => {}
        }
    }

    fn create_link(&self, from: EntityRef, to: EntityRef, outcome: &mut ImportOutcome, line: usize) {
        match Creation::from(self.mutation.create_entity_link(EntityLinkInput { from, to })) {
            Creation::Created(link) => {
                debug!("Created link #{} {} -> {}", link.id, from, to);
                outcome.info(line, format!("Linked {} to {}", from, to));
            }
            Creation::DuplicateConflict(message) | Creation::Failed(message) => {
                warn!("Failed to link {} to {}: {}", from, to, message);
                outcome.error(line, format!("Could not link {} to {}: {}", from, to, message));
            }
        }
    }
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abbreviation::Iso4Abbreviator;
    use crate::error::PersistenceError;
    use crate::model::{Date, EntityLink, Publication, PublicationKind, Publisher};
    use crate::ris::structure::Title;
    use crate::store::InMemoryStore;
    use crate::Severity;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn titled(kind: PublicationKind, title: &str) -> RecordAccumulator {
        let mut record = RecordAccumulator::new(kind);
        record.title = Some(Title {
            text: title.to_string(),
            tag: "TI".to_string(),
            primary: true,
        });
        record
    }

    fn finish(store: &InMemoryStore, context: &ImportContext, record: RecordAccumulator) -> ImportOutcome {
        let abbreviator = Iso4Abbreviator::new();
        let config = ImportConfig::new();
        let resolver = Resolver {
            lookup: store,
            mutation: store,
            abbreviator: &abbreviator,
            config: &config,
            context,
        };
        let mut outcome = ImportOutcome::new();
        resolver.finish(record, &mut outcome, 9);
        outcome
    }

    #[test]
    fn test_missing_title_creates_nothing() {
        let store = InMemoryStore::new();
        let outcome = finish(&store, &ImportContext::default(), RecordAccumulator::new(PublicationKind::JournalArticle));

        assert_eq!(outcome.result, ImportResult::Error);
        assert_eq!(outcome.messages[0].text, MISSING_TITLE);
        assert!(store.publications().is_empty());
    }

    #[test]
    fn test_creates_journal_and_publisher() {
        let store = InMemoryStore::new();
        let mut record = titled(PublicationKind::JournalArticle, "A Study of Things");
        record.journal.title = Some("Journal of Clinical Epidemiology".to_string());
        record.journal.issn = Some("0895-4356".to_string());
        record.publisher.name = Some("Elsevier".to_string());
        record.authors = vec!["Smith, J".to_string(), "Doe, A".to_string()];
        record.start_page = Some("101".to_string());
        record.end_page = Some("9".to_string());
        record.date = Some(Date { year: 2001, month: Some(3), day: None });
        record.year = Some(2001);

        let outcome = finish(&store, &ImportContext::default(), record);

        assert_eq!(outcome.result, ImportResult::Imported);
        let journal = &store.journals()[0];
        assert_eq!(journal.abbreviation.as_deref(), Some("J. Clin. Epidemiol."));
        assert_eq!(journal.publisher_id, Some(store.publishers()[0].id));

        let publication = &store.publications()[0];
        assert_eq!(Some(publication.id), outcome.id);
        assert_eq!(publication.details.journal_id, Some(journal.id));
        assert_eq!(publication.details.authors.as_deref(), Some("Smith, J\nDoe, A"));
        assert_eq!(publication.details.pages.as_deref(), Some("101-109"));
    }

    #[test]
    fn test_existing_journal_wins_by_issn() {
        let store = InMemoryStore::new();
        let by_issn = store.insert_journal(
            JournalInput {
                title: "Pediatrics".to_string(),
                issn: Some("0031-4005".to_string()),
                ..Default::default()
            },
            Some(true),
        );
        let by_title = store.insert_journal(
            JournalInput { title: "Pediatric Research".to_string(), ..Default::default() },
            None,
        );

        let mut record = titled(PublicationKind::JournalArticle, "Kids");
        record.journal.issn = Some("0031-4005".to_string());
        record.journal.by_issn = Some(by_issn.clone());
        record.journal.title = Some("Pediatric Research".to_string());
        record.journal.by_title = Some(by_title.clone());

        let outcome = finish(&store, &ImportContext::default(), record);

        assert_eq!(outcome.result, ImportResult::Imported);
        assert_eq!(outcome.count(Severity::Warning), 1);
        let warning = outcome.messages.iter().find(|m| m.severity == Severity::Warning).unwrap();
        assert!(warning.text.contains("ISSN"));
        assert!(warning.text.contains("title"));

        let publication = &store.publications()[0];
        assert_eq!(publication.details.journal_id, Some(by_issn.id));
        assert_eq!(publication.details.peer_reviewed, Some(true));
        assert_eq!(store.journals().len(), 2);
    }

    #[rstest]
    #[case(PublicationKind::JournalArticle, "Lonely")]
    #[case(PublicationKind::Book, "A Book")]
    #[case(PublicationKind::Report, "A Report")]
    fn test_record_without_journal_warns(#[case] kind: PublicationKind, #[case] title: &str) {
        let store = InMemoryStore::new();
        let outcome = finish(&store, &ImportContext::default(), titled(kind, title));

        assert_eq!(outcome.result, ImportResult::Imported);
        assert_eq!(outcome.count(Severity::Warning), 1);
        assert!(outcome.messages.iter().any(|m| m.text.contains("importing without a journal")));
        assert_eq!(store.publications()[0].details.journal_id, None);
    }

    /// Delegates to an [`InMemoryStore`] but fails publisher and journal
    /// creation with the configured errors.
    struct FailingStore {
        inner: InMemoryStore,
        publisher: Option<PersistenceError>,
        journal: Option<PersistenceError>,
    }

    impl Mutation for FailingStore {
        fn create_publisher(&self, input: PublisherInput) -> Result<Publisher, PersistenceError> {
            match &self.publisher {
                Some(err) => Err(err.clone()),
                None => self.inner.create_publisher(input),
            }
        }

        fn create_journal(&self, input: JournalInput) -> Result<Journal, PersistenceError> {
            match &self.journal {
                Some(err) => Err(err.clone()),
                None => self.inner.create_journal(input),
            }
        }

        fn create_publication(&self, input: PublicationInput) -> Result<Publication, PersistenceError> {
            self.inner.create_publication(input)
        }

        fn create_entity_link(&self, input: EntityLinkInput) -> Result<EntityLink, PersistenceError> {
            self.inner.create_entity_link(input)
        }
    }

    fn finish_failing(store: &FailingStore, record: RecordAccumulator) -> ImportOutcome {
        let abbreviator = Iso4Abbreviator::new();
        let config = ImportConfig::new();
        let context = ImportContext::default();
        let resolver = Resolver {
            lookup: &store.inner,
            mutation: store,
            abbreviator: &abbreviator,
            config: &config,
            context: &context,
        };
        let mut outcome = ImportOutcome::new();
        resolver.finish(record, &mut outcome, 9);
        outcome
    }

    fn with_publisher_and_journal() -> RecordAccumulator {
        let mut record = titled(PublicationKind::JournalArticle, "Against the Odds");
        record.publisher.name = Some("Elsevier".to_string());
        record.journal.title = Some("Journal of Clinical Epidemiology".to_string());
        record
    }

    #[rstest]
    #[case::failed(PersistenceError::Other("connection reset; SQL [insert into publisher]".to_string()))]
    #[case::duplicate_not_found(PersistenceError::DuplicateKey("uk_publisher_name".to_string()))]
    fn test_publisher_creation_failure_continues(#[case] error: PersistenceError) {
        let store = FailingStore {
            inner: InMemoryStore::new(),
            publisher: Some(error),
            journal: None,
        };

        let outcome = finish_failing(&store, with_publisher_and_journal());

        assert_eq!(outcome.result, ImportResult::Imported);
        assert_eq!(outcome.count(Severity::Warning), 1);
        let warning = outcome.messages.iter().find(|m| m.severity == Severity::Warning).unwrap();
        assert!(warning.text.starts_with("Could not create publisher \"Elsevier\""));
        assert!(!warning.text.contains("SQL"));
        assert_eq!(warning.line_number, 9);

        let publication = &store.inner.publications()[0];
        assert_eq!(publication.details.publisher_id, None);
        assert!(publication.details.journal_id.is_some());
        assert_eq!(store.inner.journals()[0].publisher_id, None);
    }

    #[rstest]
    #[case::failed(PersistenceError::ConstraintViolation("journal_title_not_blank".to_string()))]
    #[case::duplicate_not_found(PersistenceError::DuplicateKey("uk_journal_title".to_string()))]
    fn test_journal_creation_failure_continues(#[case] error: PersistenceError) {
        let store = FailingStore {
            inner: InMemoryStore::new(),
            publisher: None,
            journal: Some(error),
        };

        let outcome = finish_failing(&store, with_publisher_and_journal());

        assert_eq!(outcome.result, ImportResult::Imported);
        assert_eq!(outcome.count(Severity::Warning), 1);
        let warning = outcome.messages.iter().find(|m| m.severity == Severity::Warning).unwrap();
        assert!(warning.text.starts_with("Could not create journal \"Journal of Clinical Epidemiology\""));

        assert!(store.inner.journals().is_empty());
        let publication = &store.inner.publications()[0];
        assert_eq!(publication.details.journal_id, None);
        assert_eq!(publication.details.publisher_id, Some(store.inner.publishers()[0].id));
    }

    #[test]
    fn test_duplicate_journal_found_on_second_lookup() {
        let store = FailingStore {
            inner: InMemoryStore::new(),
            publisher: None,
            journal: Some(PersistenceError::DuplicateKey("uk_journal_title".to_string())),
        };
        let existing = store.inner.insert_journal(
            JournalInput {
                title: "Journal of Clinical Epidemiology".to_string(),
                ..Default::default()
            },
            None,
        );

        let outcome = finish_failing(&store, with_publisher_and_journal());

        assert_eq!(outcome.count(Severity::Warning), 0);
        assert_eq!(store.inner.publications()[0].details.journal_id, Some(existing.id));
    }

    #[test]
    fn test_links_to_master_entities() {
        let store = InMemoryStore::new();
        let topic = store.register(EntityKind::Topic);
        let claim = store.register(EntityKind::Claim);
        let context = ImportContext {
            master_topic_id: Some(topic.id),
            master_record: Some(MasterRecord::To(claim)),
        };

        let outcome = finish(&store, &context, titled(PublicationKind::Book, "Linked"));

        let publication = EntityRef::new(EntityKind::Publication, outcome.id.unwrap());
        let links: Vec<(EntityRef, EntityRef)> = store.links().iter().map(|l| (l.from, l.to)).collect();
        assert_eq!(links, vec![(topic, publication), (publication, claim)]);
    }

    #[test]
    fn test_link_failure_keeps_imported_result() {
        let store = InMemoryStore::new();
        let context = ImportContext {
            master_topic_id: Some(EntityId(404)),
            master_record: None,
        };

        let outcome = finish(&store, &context, titled(PublicationKind::Book, "Orphan"));

        assert_eq!(outcome.result, ImportResult::Imported);
        assert!(outcome.has_errors());
        assert!(store.links().is_empty());
    }

    #[test]
    fn test_duplicate_doi() {
        let store = InMemoryStore::new();
        let mut first = titled(PublicationKind::Book, "First");
        first.doi = Some("10.1000/xyz".to_string());
        let mut second = titled(PublicationKind::Book, "Second");
        second.doi = Some("10.1000/xyz".to_string());

        finish(&store, &ImportContext::default(), first);
        let outcome = finish(&store, &ImportContext::default(), second);

        assert_eq!(outcome.result, ImportResult::Duplicate);
        assert!(outcome.id.is_none());
        let error = &outcome.messages.last().unwrap().text;
        assert!(error.contains("uk_publication_doi"));
        assert!(!error.contains("Detail"));
    }
}
