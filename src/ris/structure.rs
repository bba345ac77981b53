//! Per-record accumulation of tag values.
//!
//! # Field Processing Strategy
//! - **First-wins**: scalar fields keep the first non-blank value; a later,
//!   different value is noted at `Info` and dropped
//! - **Title priority**: a primary title tag may replace a secondary title
//! - **Order-preserving de-duplication**: authors and keywords
//! - **Independent journal keys**: title, abbreviation and ISSN are each looked
//!   up on arrival and cached separately, so disagreements can be reported at
//!   the end of the record

use super::tags::TagRule;
use crate::error::{ValueError, fields};
use crate::model::{Date, Journal, PublicationKind, Publisher};
use crate::store::{Abbreviator, Lookup};
use crate::utils::{
    format_doi, normalize_date, normalize_isbn, normalize_issn, parse_year, split_serial_numbers,
};
use crate::ImportOutcome;

/// Everything a tag rule needs besides the record itself.
pub(crate) struct TagContext<'c> {
    pub(crate) line: usize,
    pub(crate) outcome: &'c mut ImportOutcome,
    pub(crate) lookup: &'c dyn Lookup,
    pub(crate) abbreviator: &'c dyn Abbreviator,
}

impl TagContext<'_> {
    fn info(&mut self, text: impl Into<String>) {
        self.outcome.info(self.line, text);
    }

    fn warning(&mut self, text: impl Into<String>) {
        self.outcome.warning(self.line, text);
    }

    fn error(&mut self, text: impl Into<String>) {
        self.outcome.error(self.line, text);
    }
}

/// Whether a value arrives on its own tag line or re-runs after a
/// continuation line was appended to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    First,
    Continued,
}

/// The title and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Title {
    pub(crate) text: String,
    pub(crate) tag: String,
    pub(crate) primary: bool,
}

/// Journal identity as found in the record, plus one candidate per key.
#[derive(Debug, Clone, Default)]
pub(crate) struct JournalIdentity {
    pub(crate) title: Option<String>,
    pub(crate) abbreviation: Option<String>,
    pub(crate) issn: Option<String>,
    pub(crate) by_title: Option<Journal>,
    pub(crate) by_abbreviation: Option<Journal>,
    pub(crate) by_issn: Option<Journal>,
}

impl JournalIdentity {
    pub(crate) fn is_empty(&self) -> bool {
        self.title.is_none() && self.abbreviation.is_none() && self.issn.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PublisherIdentity {
    pub(crate) name: Option<String>,
    pub(crate) location: Option<String>,
    pub(crate) candidate: Option<Publisher>,
}

/// Transient state for the record being parsed.
#[derive(Debug, Clone)]
pub(crate) struct RecordAccumulator {
    pub(crate) kind: PublicationKind,
    pub(crate) title: Option<Title>,
    pub(crate) authors: Vec<String>,
    pub(crate) notes: Vec<String>,
    pub(crate) keywords: Vec<String>,
    pub(crate) journal: JournalIdentity,
    pub(crate) publisher: PublisherIdentity,
    pub(crate) date: Option<Date>,
    pub(crate) year: Option<i32>,
    pub(crate) doi: Option<String>,
    pub(crate) isbn: Option<String>,
    pub(crate) url: Option<String>,
    pub(crate) pmid: Option<String>,
    pub(crate) pmcid: Option<String>,
    pub(crate) abstract_text: Option<String>,
    pub(crate) volume: Option<String>,
    pub(crate) issue: Option<String>,
    pub(crate) start_page: Option<String>,
    pub(crate) end_page: Option<String>,
    pub(crate) language: Option<String>,
    /// Index in `notes` of the surplus ISSNs from the last `SN` line.
    serial_note: Option<usize>,
}

impl RecordAccumulator {
    pub(crate) fn new(kind: PublicationKind) -> Self {
        Self {
            kind,
            title: None,
            authors: Vec::new(),
            notes: Vec::new(),
            keywords: Vec::new(),
            journal: JournalIdentity::default(),
            publisher: PublisherIdentity::default(),
            date: None,
            year: None,
            doi: None,
            isbn: None,
            url: None,
            pmid: None,
            pmcid: None,
            abstract_text: None,
            volume: None,
            issue: None,
            start_page: None,
            end_page: None,
            language: None,
            serial_note: None,
        }
    }

    /// Apply a field rule to a trimmed, non-blank value.
    ///
    /// Returns whether the value was kept, which decides whether continuation
    /// lines may extend it.
    pub(crate) fn apply(
        &mut self,
        rule: TagRule,
        tag: &str,
        value: &str,
        dispatch: Dispatch,
        ctx: &mut TagContext<'_>,
    ) -> bool {
        match rule {
            TagRule::PrimaryTitle => self.apply_title(tag, value, true, ctx),
            TagRule::SecondaryTitle => self.apply_title(tag, value, false, ctx),
            TagRule::Author => push_unique(&mut self.authors, value),
            TagRule::Date => self.apply_date(tag, value, dispatch, ctx),
            TagRule::JournalTitle => {
                let kept = accept(&mut self.journal.title, tag, value, fields::JOURNAL, dispatch, ctx);
                if kept {
                    self.journal.by_title = ctx.lookup.find_journal_by_title(value);
                }
                kept
            }
            TagRule::JournalAbbreviation => {
                let abbreviation = ctx.abbreviator.normalize_abbreviation(value);
                let kept = accept(
                    &mut self.journal.abbreviation,
                    tag,
                    &abbreviation,
                    fields::JOURNAL_ABBR,
                    dispatch,
                    ctx,
                );
                if kept {
                    self.journal.by_abbreviation =
                        ctx.lookup.find_journal_by_abbreviation(&abbreviation);
                }
                kept
            }
            TagRule::SerialNumber => self.apply_serial_number(tag, value, dispatch, ctx),
            TagRule::Publisher => {
                let kept = accept(&mut self.publisher.name, tag, value, fields::PUBLISHER, dispatch, ctx);
                if kept {
                    self.publisher.candidate = ctx.lookup.find_publisher_by_name(value);
                }
                kept
            }
            TagRule::PublisherLocation => {
                accept(&mut self.publisher.location, tag, value, "publisher location", dispatch, ctx)
            }
            TagRule::Doi => match format_doi(value) {
                Some(doi) => accept(&mut self.doi, tag, &doi, fields::DOI, dispatch, ctx),
                None => {
                    ctx.warning(bad_value(fields::DOI, tag, value, "not a DOI"));
                    false
                }
            },
            TagRule::Url => accept(&mut self.url, tag, value, "URL", dispatch, ctx),
            TagRule::PubMedId => {
                let pmid = value
                    .strip_prefix("PMID:")
                    .map(str::trim)
                    .unwrap_or(value);
                if !pmid.is_empty() && pmid.chars().all(|c| c.is_ascii_digit()) {
                    accept(&mut self.pmid, tag, pmid, fields::PMID, dispatch, ctx)
                } else {
                    ctx.info(format!("Skipping {}: \"{}\" is not a PubMed identifier", tag, value));
                    false
                }
            }
            TagRule::PmcId => {
                if value.to_ascii_uppercase().contains("PMC") {
                    accept(&mut self.pmcid, tag, value, fields::PMC_ID, dispatch, ctx)
                } else {
                    ctx.info(format!(
                        "Skipping {}: \"{}\" is not a PubMed Central identifier",
                        tag, value
                    ));
                    false
                }
            }
            TagRule::Keywords => push_unique(&mut self.keywords, value),
            TagRule::Notes => {
                self.notes.push(value.to_string());
                true
            }
            TagRule::Abstract => accept(&mut self.abstract_text, tag, value, "abstract", dispatch, ctx),
            TagRule::Volume => accept(&mut self.volume, tag, value, "volume", dispatch, ctx),
            TagRule::Issue => accept(&mut self.issue, tag, value, "issue", dispatch, ctx),
            TagRule::StartPage => accept(&mut self.start_page, tag, value, "start page", dispatch, ctx),
            TagRule::EndPage => accept(&mut self.end_page, tag, value, "end page", dispatch, ctx),
            TagRule::Language => accept(&mut self.language, tag, value, "language", dispatch, ctx),
            // Boundaries are handled by the session before a value gets here.
            TagRule::Type | TagRule::EndOfRecord => false,
        }
    }

    /// Append a continuation line to the value last accumulated for `rule`.
    pub(crate) fn append(&mut self, rule: TagRule, separator: &str, line: &str) {
        let slot = match rule {
            TagRule::PrimaryTitle | TagRule::SecondaryTitle => self.title.as_mut().map(|t| &mut t.text),
            TagRule::Author => self.authors.last_mut(),
            TagRule::Keywords => self.keywords.last_mut(),
            TagRule::Notes => self.notes.last_mut(),
            TagRule::Abstract => self.abstract_text.as_mut(),
            _ => None,
        };

        match slot {
            Some(text) => {
                text.push_str(separator);
                text.push_str(line);
            }
            None => match rule {
                TagRule::Author => self.authors.push(line.trim().to_string()),
                TagRule::Keywords => self.keywords.push(line.trim().to_string()),
                TagRule::Notes => self.notes.push(line.to_string()),
                TagRule::Abstract => self.abstract_text = Some(line.to_string()),
                _ => {}
            },
        }
    }

    fn apply_title(&mut self, tag: &str, value: &str, primary: bool, ctx: &mut TagContext<'_>) -> bool {
        match &self.title {
            None => {}
            Some(existing) if existing.text == value => return true,
            Some(existing) if primary && !existing.primary => {
                ctx.warning(format!(
                    "Replacing title \"{}\" from {} with \"{}\" from {}",
                    existing.text, existing.tag, value, tag
                ));
            }
            Some(existing) => {
                ctx.info(format!(
                    "Ignoring {} \"{}\": title already set from {}",
                    tag, value, existing.tag
                ));
                return false;
            }
        }
        self.title = Some(Title {
            text: value.to_string(),
            tag: tag.to_string(),
            primary,
        });
        true
    }

    fn apply_date(&mut self, tag: &str, value: &str, dispatch: Dispatch, ctx: &mut TagContext<'_>) -> bool {
        if value.chars().count() == 4 {
            let Some(year) = parse_year(value) else {
                ctx.error(bad_value(fields::YEAR, tag, value, "not a year"));
                return false;
            };
            if self.year.is_none() || dispatch == Dispatch::Continued {
                self.year = Some(year);
                return true;
            }
            if self.year != Some(year) {
                ctx.info(format!("Ignoring {} \"{}\": year already set", tag, value));
            }
            return false;
        }

        let Some(date) = normalize_date(value) else {
            ctx.error(bad_value(fields::DATE, tag, value, "unrecognized date format"));
            return false;
        };
        if self.date.is_none() || dispatch == Dispatch::Continued {
            self.date = Some(date);
            self.year.get_or_insert(date.year);
            return true;
        }
        if self.date != Some(date) {
            ctx.info(format!("Ignoring {} \"{}\": date already set", tag, value));
        }
        false
    }

    fn apply_serial_number(
        &mut self,
        tag: &str,
        value: &str,
        dispatch: Dispatch,
        ctx: &mut TagContext<'_>,
    ) -> bool {
        if self.kind.is_book_like() {
            let Some(isbn) = normalize_isbn(value) else {
                ctx.info(format!(
                    "Skipping {} \"{}\": not an ISBN, which {} records expect",
                    tag, value, self.kind
                ));
                return false;
            };
            return accept(&mut self.isbn, tag, &isbn, fields::ISBN, dispatch, ctx);
        }

        if !self.kind.is_periodical() {
            ctx.info(format!(
                "Skipping {} \"{}\": {} records carry no ISSN or ISBN",
                tag, value, self.kind
            ));
            return false;
        }

        let (first, surplus) = split_serial_numbers(value);
        let Some(issn) = normalize_issn(first) else {
            ctx.info(format!(
                "Skipping {} \"{}\": not an ISSN, which {} records expect",
                tag, value, self.kind
            ));
            return false;
        };

        let kept = accept(&mut self.journal.issn, tag, &issn, fields::ISSN, dispatch, ctx);
        if kept {
            self.journal.by_issn = ctx.lookup.find_journal_by_issn(&issn);
        }
        // A continued value replaces the note its earlier text produced.
        let previous = self.serial_note.take().filter(|_| dispatch == Dispatch::Continued);
        match (surplus, previous) {
            (Some(surplus), Some(index)) => {
                self.notes[index] = format!("Additional ISSN: {}", surplus);
                self.serial_note = Some(index);
            }
            (Some(surplus), None) => {
                ctx.info(format!("Keeping additional {} values as a note: {}", tag, surplus));
                self.notes.push(format!("Additional ISSN: {}", surplus));
                self.serial_note = Some(self.notes.len() - 1);
            }
            (None, Some(index)) => {
                self.notes.remove(index);
            }
            (None, None) => {}
        }
        kept
    }
}

fn push_unique(values: &mut Vec<String>, value: &str) -> bool {
    if values.iter().any(|v| v == value) {
        return false;
    }
    values.push(value.to_string());
    true
}

/// First-wins assignment. Returns whether `slot` took the value.
fn accept(
    slot: &mut Option<String>,
    tag: &str,
    value: &str,
    field: &str,
    dispatch: Dispatch,
    ctx: &mut TagContext<'_>,
) -> bool {
    match slot {
        Some(existing) if dispatch == Dispatch::First => {
            if existing != value {
                ctx.info(format!(
                    "Ignoring {} \"{}\": {} already set to \"{}\"",
                    tag, value, field, existing
                ));
            }
            false
        }
        _ => {
            *slot = Some(value.to_string());
            true
        }
    }
}

fn bad_value(field: &'static str, tag: &str, value: &str, reason: &str) -> String {
    ValueError::BadValue {
        field,
        key: tag.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .to_string()
}
