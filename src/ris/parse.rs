//! RIS line classification and the per-import state machine.
//!
//! This module handles the low-level reading of RIS text: every input line is
//! classified, then fed to an [`ImportSession`] which tracks whether a record
//! is open and routes tag values into the current [`RecordAccumulator`].

use super::resolve::Resolver;
use super::structure::{Dispatch, RecordAccumulator, TagContext};
use super::tags::{Continuation, TagRule};
use crate::error::{ValueError, fields};
use crate::model::PublicationKind;
use crate::regex::Regex;
use crate::{ImportOutcome, ImportResult};
use compact_str::CompactString;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

/// `TAG  - value`, or `TAG  -` with nothing after the dash.
static TAG_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z][A-Z0-9])  -(?:\s+(.*))?$").unwrap());

const BOM: char = '\u{feff}';

/// One classified input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RisLine<'a> {
    Blank,
    /// A tag line; the value is trimmed and may be empty.
    Tag { tag: &'a str, value: &'a str },
    /// Anything else, kept literally.
    Text(&'a str),
}

/// Classify a line with its line terminator already removed.
pub(crate) fn classify(line: &str) -> RisLine<'_> {
    if line.trim().is_empty() {
        return RisLine::Blank;
    }
    match TAG_LINE_REGEX.captures(line) {
        Some(captures) => {
            let (Some(tag), value) = (captures.get(1), captures.get(2)) else {
                return RisLine::Text(line);
            };
            RisLine::Tag {
                tag: tag.as_str(),
                value: value.map_or("", |v| v.as_str().trim()),
            }
        }
        None => RisLine::Text(line),
    }
}

/// Strip what editors and other platforms leave around a line.
fn strip_line(line_number: usize, line: &str) -> &str {
    let line = if line_number == 1 {
        line.strip_prefix(BOM).unwrap_or(line)
    } else {
        line
    };
    line.strip_suffix('\r').unwrap_or(line)
}

enum ParserState {
    /// No open record. `rejected` holds the outcome of a `TY` whose kind was
    /// not recognized, so later problems can still be reported against it.
    AwaitingRecord { rejected: Option<ImportOutcome> },
    InRecord {
        record: Box<RecordAccumulator>,
        outcome: ImportOutcome,
        start_line: usize,
    },
}

/// The tag most recently seen, which continuation lines extend.
struct ActiveTag {
    tag: CompactString,
    /// `None` for tags whose value is discarded.
    rule: Option<TagRule>,
    /// Raw value as last dispatched.
    value: String,
    /// Whether the record kept the value.
    kept: bool,
}

impl ActiveTag {
    fn ignored(tag: &str) -> Self {
        Self {
            tag: CompactString::from(tag),
            rule: None,
            value: String::new(),
            kept: false,
        }
    }
}

/// State of one import call.
pub(crate) struct ImportSession<'s> {
    resolver: Resolver<'s>,
    state: ParserState,
    active: Option<ActiveTag>,
    outcomes: Vec<ImportOutcome>,
    last_line: usize,
}

impl<'s> ImportSession<'s> {
    pub(crate) fn new(resolver: Resolver<'s>) -> Self {
        Self {
            resolver,
            state: ParserState::AwaitingRecord { rejected: None },
            active: None,
            outcomes: Vec::new(),
            last_line: 0,
        }
    }

    /// Feed one line, numbered from 1, without its `\n` terminator.
    pub(crate) fn feed(&mut self, line_number: usize, raw: &str) {
        self.last_line = line_number;
        match classify(strip_line(line_number, raw)) {
            RisLine::Blank => {}
            RisLine::Tag { tag, value } => self.on_tag(line_number, tag, value),
            RisLine::Text(text) => self.on_text(line_number, text),
        }
    }

    /// Close whatever is still open and hand back the outcomes in input order.
    pub(crate) fn finish(mut self) -> Vec<ImportOutcome> {
        let state = std::mem::replace(&mut self.state, ParserState::AwaitingRecord { rejected: None });
        self.flush(state, self.last_line);

        let imported = self
            .outcomes
            .iter()
            .filter(|o| o.result == ImportResult::Imported)
            .count();
        info!(
            "RIS import finished: {} records, {} imported, {} lines read",
            self.outcomes.len(),
            imported,
            self.last_line
        );
        self.outcomes
    }

    fn on_tag(&mut self, line: usize, tag: &str, value: &str) {
        match self.resolver.config.rule_for(tag) {
            Some(TagRule::Type) => self.open_record(line, value),
            Some(TagRule::EndOfRecord) => self.close_record(line),
            rule => self.on_field(line, tag, rule, value),
        }
    }

    fn open_record(&mut self, line: usize, value: &str) {
        let previous = std::mem::replace(&mut self.state, ParserState::AwaitingRecord { rejected: None });
        self.flush(previous, line);
        self.active = None;

        let mut outcome = ImportOutcome::new();
        match PublicationKind::from_code(value) {
            Some(kind) => {
                debug!("Record of kind {} opened at line {}", kind, line);
                self.state = ParserState::InRecord {
                    record: Box::new(RecordAccumulator::new(kind)),
                    outcome,
                    start_line: line,
                };
            }
            None => {
                let error = if value.is_empty() {
                    ValueError::MissingValue {
                        field: fields::KIND,
                        key: "TY",
                    }
                } else {
                    ValueError::BadValue {
                        field: fields::KIND,
                        key: "TY".to_string(),
                        value: value.to_string(),
                        reason: "unrecognized publication type".to_string(),
                    }
                };
                outcome.error(line, error.to_string());
                self.state = ParserState::AwaitingRecord { rejected: Some(outcome) };
            }
        }
    }

    fn close_record(&mut self, line: usize) {
        self.active = None;
        let state = std::mem::replace(&mut self.state, ParserState::AwaitingRecord { rejected: None });
        match state {
            ParserState::InRecord { record, mut outcome, start_line } => {
                debug!("Record opened at line {} closed at line {}", start_line, line);
                self.resolver.finish(*record, &mut outcome, line);
                self.outcomes.push(outcome);
            }
            ParserState::AwaitingRecord { rejected: Some(mut outcome) } => {
                outcome.error(line, "Unmatched ER: no open record");
                self.outcomes.push(outcome);
            }
            ParserState::AwaitingRecord { rejected: None } => {
                debug!("Ignoring unmatched ER at line {}", line);
            }
        }
    }

    /// Report the outcome of a record that was never closed by its own `ER`.
    fn flush(&mut self, state: ParserState, line: usize) {
        match state {
            ParserState::InRecord { mut outcome, start_line, .. } => {
                warn!("Record opened at line {} was not closed by ER", start_line);
                outcome.error(
                    line,
                    format!("Record opened at line {} was not closed by ER; nothing was imported", start_line),
                );
                self.outcomes.push(outcome);
            }
            ParserState::AwaitingRecord { rejected: Some(outcome) } => self.outcomes.push(outcome),
            ParserState::AwaitingRecord { rejected: None } => {}
        }
    }

    fn on_field(&mut self, line: usize, tag: &str, rule: Option<TagRule>, value: &str) {
        match &mut self.state {
            ParserState::AwaitingRecord { rejected } => {
                let text = format!("Skipping {}: no open record", tag);
                match rejected {
                    Some(outcome) => outcome.warning(line, text),
                    None => warn!("Line {}: {}", line, text),
                }
                self.active = Some(ActiveTag::ignored(tag));
            }
            ParserState::InRecord { record, outcome, .. } => {
                let Some(rule) = rule else {
                    outcome.warning(line, format!("Skipping unknown tag {}", tag));
                    self.active = Some(ActiveTag::ignored(tag));
                    return;
                };
                let kept = if value.is_empty() {
                    outcome.info(line, format!("Skipping empty tag {}", tag));
                    false
                } else {
                    let mut ctx = TagContext {
                        line,
                        outcome,
                        lookup: self.resolver.lookup,
                        abbreviator: self.resolver.abbreviator,
                    };
                    record.apply(rule, tag, value, Dispatch::First, &mut ctx)
                };
                self.active = Some(ActiveTag {
                    tag: CompactString::from(tag),
                    rule: Some(rule),
                    value: value.to_string(),
                    kept,
                });
            }
        }
    }

    fn on_text(&mut self, line: usize, text: &str) {
        let Some(active) = self.active.as_mut() else {
            let message = ValueError::Syntax(text.to_string()).to_string();
            match &mut self.state {
                ParserState::InRecord { outcome, .. }
                | ParserState::AwaitingRecord { rejected: Some(outcome) } => {
                    outcome.warning(line, message)
                }
                ParserState::AwaitingRecord { rejected: None } => warn!("Line {}: {}", line, message),
            }
            return;
        };

        let ParserState::InRecord { record, outcome, .. } = &mut self.state else {
            return;
        };
        let Some(rule) = active.rule else {
            return;
        };

        let mut ctx = TagContext {
            line,
            outcome,
            lookup: self.resolver.lookup,
            abbreviator: self.resolver.abbreviator,
        };

        // The tag line was blank: this is the value's first line.
        if active.value.is_empty() {
            let value = text.trim();
            active.kept = record.apply(rule, &active.tag, value, Dispatch::First, &mut ctx);
            active.value = value.to_string();
            return;
        }
        // Continuations of a dropped value are dropped with it.
        if !active.kept {
            return;
        }

        match rule.continuation() {
            Continuation::Append(separator) => {
                record.append(rule, separator, text);
                active.value.push_str(separator);
                active.value.push_str(text);
            }
            Continuation::Redispatch => {
                active.value.push_str(text);
                let value = active.value.trim();
                active.kept = record.apply(rule, &active.tag, value, Dispatch::Continued, &mut ctx);
            }
        }
    }
}
