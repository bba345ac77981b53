//! Domain entities exchanged with the persistence collaborators.
//!
//! The importer only ever builds `*Input` values and keeps the identifiers of
//! whatever the store hands back; the stored entity shapes live here so that
//! lookup results can be compared and reported.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned to an entity by the persistence layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Kinds of entity the evidence store knows about.
///
/// Only used here to decide on which side of a link a master record goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Claim,
    Declaration,
    Journal,
    Person,
    Publication,
    Publisher,
    Quotation,
    Topic,
}

impl EntityKind {
    /// Convert the kind to a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Claim => "Claim",
            EntityKind::Declaration => "Declaration",
            EntityKind::Journal => "Journal",
            EntityKind::Person => "Person",
            EntityKind::Publication => "Publication",
            EntityKind::Publisher => "Publisher",
            EntityKind::Quotation => "Quotation",
            EntityKind::Topic => "Topic",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed reference to a stored entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: EntityId) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// Publication kinds, identified by their RIS `TY` code.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PublicationKind {
    /// ABST - Abstract
    Abstract,
    /// BOOK - Whole book
    Book,
    /// CHAP - Book chapter
    Chapter,
    /// CONF - Conference proceeding
    ConferenceProceeding,
    /// CPAPER - Conference paper
    ConferencePaper,
    /// DATA - Dataset
    Dataset,
    /// EBOOK - Electronic book
    ElectronicBook,
    /// ECHAP - Electronic book section
    ElectronicChapter,
    /// EDBOOK - Edited book
    EditedBook,
    /// EJOUR - Electronic article
    ElectronicArticle,
    /// ELEC - Web page
    WebPage,
    /// GEN - Generic
    Generic,
    /// INPR - In press
    InPress,
    /// JFULL - Journal (full)
    FullJournal,
    /// JOUR - Journal article
    JournalArticle,
    /// MGZN - Magazine article
    MagazineArticle,
    /// NEWS - Newspaper article
    NewspaperArticle,
    /// PAT - Patent
    Patent,
    /// RPRT - Report
    Report,
    /// SER - Serial publication
    Serial,
    /// STAT - Statute
    Statute,
    /// THES - Thesis/Dissertation
    Thesis,
    /// UNPB - Unpublished work
    Unpublished,
}

impl PublicationKind {
    /// Look up a kind by its RIS code, ignoring case and surrounding whitespace.
    pub fn from_code(code: &str) -> Option<Self> {
        let kind = match code.trim().to_ascii_uppercase().as_str() {
            "ABST" => PublicationKind::Abstract,
            "BOOK" => PublicationKind::Book,
            "CHAP" => PublicationKind::Chapter,
            "CONF" => PublicationKind::ConferenceProceeding,
            "CPAPER" => PublicationKind::ConferencePaper,
            "DATA" => PublicationKind::Dataset,
            "EBOOK" => PublicationKind::ElectronicBook,
            "ECHAP" => PublicationKind::ElectronicChapter,
            "EDBOOK" => PublicationKind::EditedBook,
            "EJOUR" => PublicationKind::ElectronicArticle,
            "ELEC" | "WEB" => PublicationKind::WebPage,
            "GEN" => PublicationKind::Generic,
            "INPR" => PublicationKind::InPress,
            "JFULL" => PublicationKind::FullJournal,
            "JOUR" => PublicationKind::JournalArticle,
            "MGZN" => PublicationKind::MagazineArticle,
            "NEWS" => PublicationKind::NewspaperArticle,
            "PAT" => PublicationKind::Patent,
            "RPRT" => PublicationKind::Report,
            "SER" => PublicationKind::Serial,
            "STAT" => PublicationKind::Statute,
            "THES" => PublicationKind::Thesis,
            "UNPB" => PublicationKind::Unpublished,
            _ => return None,
        };
        Some(kind)
    }

    /// The RIS code for this kind.
    pub fn as_code(&self) -> &'static str {
        match self {
            PublicationKind::Abstract => "ABST",
            PublicationKind::Book => "BOOK",
            PublicationKind::Chapter => "CHAP",
            PublicationKind::ConferenceProceeding => "CONF",
            PublicationKind::ConferencePaper => "CPAPER",
            PublicationKind::Dataset => "DATA",
            PublicationKind::ElectronicBook => "EBOOK",
            PublicationKind::ElectronicChapter => "ECHAP",
            PublicationKind::EditedBook => "EDBOOK",
            PublicationKind::ElectronicArticle => "EJOUR",
            PublicationKind::WebPage => "ELEC",
            PublicationKind::Generic => "GEN",
            PublicationKind::InPress => "INPR",
            PublicationKind::FullJournal => "JFULL",
            PublicationKind::JournalArticle => "JOUR",
            PublicationKind::MagazineArticle => "MGZN",
            PublicationKind::NewspaperArticle => "NEWS",
            PublicationKind::Patent => "PAT",
            PublicationKind::Report => "RPRT",
            PublicationKind::Serial => "SER",
            PublicationKind::Statute => "STAT",
            PublicationKind::Thesis => "THES",
            PublicationKind::Unpublished => "UNPB",
        }
    }

    /// Kinds whose `SN` tag carries an ISBN.
    pub fn is_book_like(&self) -> bool {
        matches!(
            self,
            PublicationKind::Book
                | PublicationKind::Chapter
                | PublicationKind::ElectronicBook
                | PublicationKind::ElectronicChapter
                | PublicationKind::EditedBook
                | PublicationKind::ConferenceProceeding
        )
    }

    /// Kinds whose `SN` tag carries an ISSN.
    pub fn is_periodical(&self) -> bool {
        matches!(
            self,
            PublicationKind::Abstract
                | PublicationKind::ElectronicArticle
                | PublicationKind::FullJournal
                | PublicationKind::InPress
                | PublicationKind::JournalArticle
                | PublicationKind::MagazineArticle
                | PublicationKind::NewspaperArticle
                | PublicationKind::Serial
        )
    }
}

impl fmt::Display for PublicationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// A publication date with required year and optional month/day components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Date {
    /// Publication year (required)
    pub year: i32,
    /// Publication month (1-12)
    pub month: Option<u8>,
    /// Publication day (1-31)
    pub day: Option<u8>,
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if let Some(month) = self.month {
            write!(f, "-{:02}", month)?;
            if let Some(day) = self.day {
                write!(f, "-{:02}", day)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publisher {
    pub id: EntityId,
    pub name: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublisherInput {
    pub name: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    pub id: EntityId,
    pub title: String,
    /// ISO-4 abbreviation
    pub abbreviation: Option<String>,
    pub issn: Option<String>,
    pub publisher_id: Option<EntityId>,
    /// Whether articles in the journal are peer reviewed, when known.
    pub peer_reviewed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalInput {
    pub title: String,
    pub abbreviation: Option<String>,
    pub issn: Option<String>,
    pub publisher_id: Option<EntityId>,
}

/// Everything the importer knows about a publication when it asks the store
/// to create it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationInput {
    pub kind: PublicationKind,
    pub title: String,
    /// Newline-separated author names
    pub authors: Option<String>,
    pub journal_id: Option<EntityId>,
    pub publisher_id: Option<EntityId>,
    pub peer_reviewed: Option<bool>,
    pub date: Option<Date>,
    pub year: Option<i32>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub doi: Option<String>,
    pub isbn: Option<String>,
    pub url: Option<String>,
    pub pmid: Option<String>,
    pub pmcid: Option<String>,
    pub abstract_text: Option<String>,
    pub keywords: Option<String>,
    pub notes: Option<String>,
    pub language: Option<String>,
}

impl PublicationInput {
    /// An input carrying only the mandatory fields.
    pub fn new(kind: PublicationKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            authors: None,
            journal_id: None,
            publisher_id: None,
            peer_reviewed: None,
            date: None,
            year: None,
            volume: None,
            issue: None,
            pages: None,
            doi: None,
            isbn: None,
            url: None,
            pmid: None,
            pmcid: None,
            abstract_text: None,
            keywords: None,
            notes: None,
            language: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub id: EntityId,
    #[serde(flatten)]
    pub details: PublicationInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLinkInput {
    pub from: EntityRef,
    pub to: EntityRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLink {
    pub id: EntityId,
    pub from: EntityRef,
    pub to: EntityRef,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("JOUR", Some(PublicationKind::JournalArticle))]
    #[case(" jour ", Some(PublicationKind::JournalArticle))]
    #[case("BOOK", Some(PublicationKind::Book))]
    #[case("WEB", Some(PublicationKind::WebPage))]
    #[case("NOPE", None)]
    #[case("", None)]
    fn test_publication_kind_from_code(
        #[case] code: &str,
        #[case] expected: Option<PublicationKind>,
    ) {
        assert_eq!(PublicationKind::from_code(code), expected);
    }

    #[test]
    fn test_kind_families_are_disjoint() {
        for code in ["BOOK", "CHAP", "JOUR", "MGZN", "RPRT", "THES", "SER"] {
            let kind = PublicationKind::from_code(code).unwrap();
            assert!(!(kind.is_book_like() && kind.is_periodical()), "{code}");
        }
        assert!(PublicationKind::Book.is_book_like());
        assert!(PublicationKind::JournalArticle.is_periodical());
        assert!(!PublicationKind::Report.is_book_like());
        assert!(!PublicationKind::Report.is_periodical());
    }

    #[test]
    fn test_date_display() {
        let full = Date { year: 1999, month: Some(5), day: Some(3) };
        assert_eq!(full.to_string(), "1999-05-03");
        let partial = Date { year: 2020, month: Some(11), day: None };
        assert_eq!(partial.to_string(), "2020-11");
        let year = Date { year: 2020, month: None, day: Some(4) };
        assert_eq!(year.to_string(), "2020");
    }

    #[test]
    fn test_entity_ref_display() {
        let r = EntityRef::new(EntityKind::Topic, EntityId(7));
        assert_eq!(r.to_string(), "Topic#7");
    }
}
