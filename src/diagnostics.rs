//! Pretty import reports using [ariadne].
//!
//! Renders the diagnostics of each [`ImportOutcome`] against the RIS source
//! they were produced from, one report per record. Only compiled when the
//! `diagnostics` Cargo feature is enabled:
//!
//! ```toml
//! [dependencies]
//! evidence-ris = { version = "0.1", features = ["diagnostics"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use evidence_ris::{render_report, InMemoryStore, Iso4Abbreviator};
//! use evidence_ris::ris::{ImportContext, RisImporter};
//!
//! let source = "TY  - JOUR\nXX  - what is this\nER  -\n";
//! let store = InMemoryStore::new();
//! let abbreviator = Iso4Abbreviator::new();
//! let outcomes = RisImporter::with_store(&store, &abbreviator)
//!     .import_str(source, &ImportContext::default());
//! eprintln!("{}", render_report("input.ris", source, &outcomes));
//! ```

use crate::{ImportOutcome, ImportResult, Severity};
use ariadne::{Color, Label, Report, ReportKind, Source};
use std::ops::Range;

/// Render every outcome that carries diagnostics as an Ariadne report.
///
/// The returned `String` contains ANSI colour codes. Outcomes without any
/// diagnostics are skipped.
///
/// # Arguments
///
/// * `filename` - Label shown in the report header (e.g. `"citations.ris"`).
/// * `source` - The RIS text that was imported.
/// * `outcomes` - The outcomes returned for that text.
pub fn render_report(filename: &str, source: &str, outcomes: &[ImportOutcome]) -> String {
    let mut buf = Vec::new();

    for outcome in outcomes.iter().filter(|o| !o.messages.is_empty()) {
        let first = &outcome.messages[0];
        let header_span = (filename, line_byte_range(source, first.line_number));

        let mut report = Report::build(report_kind(outcome), header_span).with_message(headline(outcome));
        for message in &outcome.messages {
            report = report.with_label(
                Label::new((filename, line_byte_range(source, message.line_number)))
                    .with_message(format!("{}: {}", message.severity, message.text))
                    .with_color(severity_color(message.severity)),
            );
        }

        if let Err(err) = report
            .finish()
            .write((filename, Source::from(source)), &mut buf)
        {
            tracing::warn!("Failed to render import report: {}", err);
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

fn report_kind(outcome: &ImportOutcome) -> ReportKind<'static> {
    match outcome.messages.iter().map(|m| m.severity).max() {
        Some(Severity::Error) => ReportKind::Error,
        Some(Severity::Warning) => ReportKind::Warning,
        _ => ReportKind::Advice,
    }
}

fn headline(outcome: &ImportOutcome) -> String {
    let label = outcome.label.as_deref().unwrap_or("untitled record");
    match outcome.result {
        ImportResult::Imported => match outcome.id {
            Some(id) => format!("Imported \"{}\" as publication #{}", label, id),
            None => format!("Imported \"{}\"", label),
        },
        ImportResult::Duplicate => format!("\"{}\" already exists", label),
        ImportResult::Error => format!("Could not import \"{}\"", label),
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Blue,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    }
}

/// Byte range of a 1-based line, without its terminator. Lines past the end
/// of `source` collapse to an empty range at the end.
fn line_byte_range(source: &str, line: usize) -> Range<usize> {
    let mut start = 0;
    for (index, text) in source.split_inclusive('\n').enumerate() {
        if index + 1 == line {
            let content = text.trim_end_matches(['\n', '\r']);
            return start..start + content.len();
        }
        start += text.len();
    }
    source.len()..source.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_line_byte_range() {
        let source = "TY  - JOUR\r\nTI  - Hello\nER  -";
        assert_eq!(line_byte_range(source, 1), 0..10);
        assert_eq!(line_byte_range(source, 2), 12..23);
        assert_eq!(line_byte_range(source, 3), 24..29);
        assert_eq!(line_byte_range(source, 9), 29..29);
    }

    #[test]
    fn test_render_report() {
        let source = "TY  - JOUR\nXX  - what is this\nER  -\n";
        let mut outcome = ImportOutcome::new();
        outcome.warning(2, "Skipping unknown tag XX");
        outcome.error(3, "Cannot import record: missing or invalid TY and/or TI (no title)");

        let report = render_report("test.ris", source, &[outcome, ImportOutcome::new()]);
        assert!(report.contains("test.ris"));
        assert!(report.contains("Skipping unknown tag XX"));
        assert!(report.contains("untitled record"));
    }

    #[test]
    fn test_render_report_without_diagnostics() {
        assert_eq!(render_report("empty.ris", "", &[ImportOutcome::new()]), "");
    }
}
