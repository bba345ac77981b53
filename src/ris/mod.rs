//! RIS import pipeline.
//!
//! Reads RIS citations line by line and persists one publication per record,
//! resolving journals and publishers against existing data first.
//!
//! # Example
//!
//! ```
//! use evidence_ris::{EntityKind, ImportResult, InMemoryStore, Iso4Abbreviator};
//! use evidence_ris::ris::{ImportContext, RisImporter};
//!
//! let input = r#"TY  - JOUR
//! TI  - Example Title
//! AU  - Smith, John
//! T2  - Journal of Clinical Epidemiology
//! ER  -"#;
//!
//! let store = InMemoryStore::new();
//! let topic = store.register(EntityKind::Topic);
//! let abbreviator = Iso4Abbreviator::new();
//! let importer = RisImporter::with_store(&store, &abbreviator);
//!
//! let context = ImportContext::default().with_master_topic(topic.id);
//! let outcomes = importer.import_str(input, &context);
//! assert_eq!(outcomes[0].result, ImportResult::Imported);
//! assert_eq!(store.journals()[0].abbreviation.as_deref(), Some("J. Clin. Epidemiol."));
//! assert_eq!(store.links().len(), 1);
//! ```

mod config;
mod parse;
mod resolve;
mod structure;
mod tags;

pub use config::{DEFAULT_AUTHOR_LIMIT, DEFAULT_KEYWORD_LIMIT, ImportConfig};
pub use tags::TagRule;

use crate::error::ImportError;
use crate::model::{EntityId, EntityKind, EntityRef};
use crate::store::{Abbreviator, LinkCompatibility, Lookup, Mutation};
use crate::ImportOutcome;
use parse::ImportSession;
use resolve::Resolver;
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// An existing entity every imported publication is linked with, and the
/// direction of that link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MasterRecord {
    /// Link from the master record to each publication
    From(EntityRef),
    /// Link from each publication to the master record
    To(EntityRef),
}

impl MasterRecord {
    /// Decide the link direction for `record`, preferring a link from the
    /// record to the publication. `None` if the kinds cannot be linked at all.
    ///
    /// ```
    /// use evidence_ris::{EntityId, EntityKind, EntityRef, MasterRecord};
    ///
    /// let claim = EntityRef::new(EntityKind::Claim, EntityId(3));
    /// let compat = |from: EntityKind, to: EntityKind| {
    ///     from == EntityKind::Publication && to == EntityKind::Claim
    /// };
    /// assert_eq!(MasterRecord::resolve(claim, &compat), Some(MasterRecord::To(claim)));
    /// ```
    pub fn resolve(record: EntityRef, compat: &dyn LinkCompatibility) -> Option<Self> {
        if compat.can_link(record.kind, EntityKind::Publication) {
            Some(MasterRecord::From(record))
        } else if compat.can_link(EntityKind::Publication, record.kind) {
            Some(MasterRecord::To(record))
        } else {
            None
        }
    }
}

/// Caller-supplied context for one import call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportContext {
    /// Topic every imported publication is linked from
    pub master_topic_id: Option<EntityId>,
    pub master_record: Option<MasterRecord>,
}

impl ImportContext {
    #[must_use]
    pub fn with_master_topic(mut self, topic: EntityId) -> Self {
        self.master_topic_id = Some(topic);
        self
    }

    #[must_use]
    pub fn with_master_record(mut self, record: MasterRecord) -> Self {
        self.master_record = Some(record);
        self
    }
}

/// Imports RIS citations through the given collaborators.
pub struct RisImporter<'a> {
    lookup: &'a dyn Lookup,
    mutation: &'a dyn Mutation,
    abbreviator: &'a dyn Abbreviator,
    config: ImportConfig,
}

impl<'a> RisImporter<'a> {
    /// Creates an importer with the default configuration.
    #[must_use]
    pub fn new(lookup: &'a dyn Lookup, mutation: &'a dyn Mutation, abbreviator: &'a dyn Abbreviator) -> Self {
        Self {
            lookup,
            mutation,
            abbreviator,
            config: ImportConfig::default(),
        }
    }

    /// Creates an importer for a store that answers both lookups and mutations.
    #[must_use]
    pub fn with_store<S: Lookup + Mutation>(store: &'a S, abbreviator: &'a dyn Abbreviator) -> Self {
        Self::new(store, store, abbreviator)
    }

    #[must_use]
    pub fn with_config(mut self, config: ImportConfig) -> Self {
        self.config = config;
        self
    }

    /// Imports every record read from `reader`.
    ///
    /// Returns one outcome per record, in input order.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Io`] if a line cannot be read, including when it
    /// is not valid UTF-8. Entities created for earlier records are kept.
    pub fn import<R: BufRead>(
        &self,
        reader: R,
        context: &ImportContext,
    ) -> Result<Vec<ImportOutcome>, ImportError> {
        let mut session = ImportSession::new(self.resolver(context));
        for (index, line) in reader.lines().enumerate() {
            let line_number = index + 1;
            let line = line.map_err(|source| ImportError::Io {
                line: line_number,
                source,
            })?;
            session.feed(line_number, &line);
        }
        Ok(session.finish())
    }

    /// Imports every record of an in-memory RIS text.
    pub fn import_str(&self, input: &str, context: &ImportContext) -> Vec<ImportOutcome> {
        let mut session = ImportSession::new(self.resolver(context));
        for (index, line) in input.lines().enumerate() {
            session.feed(index + 1, line);
        }
        session.finish()
    }

    fn resolver<'r>(&'r self, context: &'r ImportContext) -> Resolver<'r> {
        Resolver {
            lookup: self.lookup,
            mutation: self.mutation,
            abbreviator: self.abbreviator,
            config: &self.config,
            context,
        }
    }
}
