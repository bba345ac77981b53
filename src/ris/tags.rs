//! RIS tags and the rules they dispatch to.
//!
//! The importer never branches on tag codes directly: a code is looked up in
//! the configured tag table and the resulting [`TagRule`] decides what happens
//! to the value. See: http://en.wikipedia.org/wiki/RIS_(file_format)

/// What a tag's value means to the importer.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagRule {
    /// Type of reference; opens a record
    Type,
    /// End of reference; closes a record
    EndOfRecord,
    /// Primary title, may replace a secondary title
    PrimaryTitle,
    /// Any other title, only used when no title is known yet
    SecondaryTitle,
    Author,
    /// A bare year (four characters) or a full date
    Date,
    JournalTitle,
    JournalAbbreviation,
    /// ISSN or ISBN, depending on the publication kind
    SerialNumber,
    Publisher,
    PublisherLocation,
    Doi,
    Url,
    PubMedId,
    PmcId,
    Keywords,
    Notes,
    Abstract,
    Volume,
    Issue,
    StartPage,
    EndPage,
    Language,
}

/// How a continuation line extends the value last dispatched for a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Continuation {
    /// Append the line to the last accumulated value, joined by the separator.
    Append(&'static str),
    /// Re-run the rule with the previous raw value plus the line.
    Redispatch,
}

impl TagRule {
    pub(crate) fn continuation(&self) -> Continuation {
        match self {
            TagRule::PrimaryTitle
            | TagRule::SecondaryTitle
            | TagRule::Author
            | TagRule::Keywords => Continuation::Append(" "),
            TagRule::Notes | TagRule::Abstract => Continuation::Append("\n"),
            _ => Continuation::Redispatch,
        }
    }
}

/// Default tag table: each rule and the tag codes that map to it.
pub(crate) const DEFAULT_TAGS: &[(TagRule, &[&str])] = &[
    (TagRule::Type, &["TY"]),
    (TagRule::EndOfRecord, &["ER"]),
    (TagRule::PrimaryTitle, &["TI", "T1"]),
    (TagRule::SecondaryTitle, &["BT", "CT", "ST"]),
    (TagRule::Author, &["AU", "A1", "A2", "A3", "A4"]),
    (TagRule::Date, &["DA", "PY", "Y1"]),
    (TagRule::JournalTitle, &["JF", "JO", "T2"]),
    (TagRule::JournalAbbreviation, &["JA", "J1", "J2"]),
    (TagRule::SerialNumber, &["SN"]),
    (TagRule::Publisher, &["PB"]),
    (TagRule::PublisherLocation, &["CY", "PP"]),
    (TagRule::Doi, &["DO"]),
    (TagRule::Url, &["UR", "L1", "L2", "LK"]),
    (TagRule::PubMedId, &["AN"]),
    (TagRule::PmcId, &["C2"]),
    (TagRule::Keywords, &["KW"]),
    (TagRule::Notes, &["N1"]),
    (TagRule::Abstract, &["AB", "N2"]),
    (TagRule::Volume, &["VL"]),
    (TagRule::Issue, &["IS"]),
    (TagRule::StartPage, &["SP"]),
    (TagRule::EndPage, &["EP"]),
    (TagRule::Language, &["LA"]),
];

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_tags_are_unique() {
        let mut seen = HashSet::new();
        for (_, codes) in DEFAULT_TAGS {
            for code in *codes {
                assert!(seen.insert(*code), "tag {code} mapped twice");
                assert_eq!(code.len(), 2);
            }
        }
    }

    #[rstest]
    #[case(TagRule::PrimaryTitle, Continuation::Append(" "))]
    #[case(TagRule::Notes, Continuation::Append("\n"))]
    #[case(TagRule::Date, Continuation::Redispatch)]
    #[case(TagRule::SerialNumber, Continuation::Redispatch)]
    fn test_continuation(#[case] rule: TagRule, #[case] expected: Continuation) {
        assert_eq!(rule.continuation(), expected);
    }
}
