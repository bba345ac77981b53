//! A small ISO-4 style journal title abbreviator.
//!
//! Real deployments plug in a full List of Title Word Abbreviations (LTWA)
//! service through [`Abbreviator`]; this implementation covers the words that
//! dominate biomedical and general science journal titles.

use crate::store::Abbreviator;
use itertools::Itertools;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Title words dropped entirely.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "at", "de", "der", "des", "die", "du", "for", "in", "la", "le", "of", "on",
    "the", "und", "&",
];

/// Word stems and their abbreviations, a subset of the LTWA.
const TITLE_WORDS: &[(&str, &str)] = &[
    ("academy", "Acad."),
    ("american", "Am."),
    ("annals", "Ann."),
    ("applied", "Appl."),
    ("association", "Assoc."),
    ("biology", "Biol."),
    ("biological", "Biol."),
    ("british", "Br."),
    ("bulletin", "Bull."),
    ("chemistry", "Chem."),
    ("chemical", "Chem."),
    ("clinical", "Clin."),
    ("communications", "Commun."),
    ("disease", "Dis."),
    ("diseases", "Dis."),
    ("economics", "Econ."),
    ("education", "Educ."),
    ("engineering", "Eng."),
    ("environmental", "Environ."),
    ("epidemiology", "Epidemiol."),
    ("european", "Eur."),
    ("infectious", "Infect."),
    ("international", "Int."),
    ("journal", "J."),
    ("letters", "Lett."),
    ("management", "Manag."),
    ("mathematics", "Math."),
    ("medical", "Med."),
    ("medicine", "Med."),
    ("national", "Natl."),
    ("pediatric", "Pediatr."),
    ("physics", "Phys."),
    ("proceedings", "Proc."),
    ("psychology", "Psychol."),
    ("quarterly", "Q."),
    ("research", "Res."),
    ("review", "Rev."),
    ("reviews", "Rev."),
    ("science", "Sci."),
    ("sciences", "Sci."),
    ("society", "Soc."),
    ("statistics", "Stat."),
    ("studies", "Stud."),
    ("technology", "Technol."),
    ("transactions", "Trans."),
    ("university", "Univ."),
    ("western", "West."),
];

static TITLE_WORD_MAP: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| TITLE_WORDS.iter().copied().collect());

/// Abbreviates journal titles word by word using a built-in LTWA subset.
#[derive(Debug, Clone, Default)]
pub struct Iso4Abbreviator;

impl Iso4Abbreviator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Abbreviator for Iso4Abbreviator {
    fn abbreviate(&self, title: &str) -> String {
        let words: Vec<&str> = title
            .split(|c: char| c.is_whitespace() || c == ',' || c == ':' || c == ';')
            .filter(|w| !w.is_empty())
            .collect();

        // ISO-4 leaves single-word titles alone.
        if words.len() == 1 {
            return words[0].to_string();
        }

        words
            .into_iter()
            .filter(|w| !STOP_WORDS.contains(&w.to_lowercase().as_str()))
            .map(|w| match TITLE_WORD_MAP.get(w.to_lowercase().as_str()) {
                Some(abbr) => (*abbr).to_string(),
                None => w.to_string(),
            })
            .join(" ")
    }

    fn normalize_abbreviation(&self, raw: &str) -> String {
        // "J.Clin.Med" -> "J. Clin. Med"
        let spaced = raw.trim().replace('.', ". ");
        spaced.split_whitespace().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("The Pediatric infectious disease journal", "Pediatr. Infect. Dis. J.")]
    #[case("Western journal of medicine", "West. J. Med.")]
    #[case("Journal of Clinical Epidemiology", "J. Clin. Epidemiol.")]
    #[case("Nature", "Nature")]
    #[case("Science", "Science")]
    #[case("Proceedings of the National Academy of Sciences", "Proc. Natl. Acad. Sci.")]
    fn test_abbreviate(#[case] title: &str, #[case] expected: &str) {
        assert_eq!(Iso4Abbreviator::new().abbreviate(title), expected);
    }

    #[rstest]
    #[case("J.Clin.Epidemiol.", "J. Clin. Epidemiol.")]
    #[case("  West.  J. Med. ", "West. J. Med.")]
    #[case("BMJ", "BMJ")]
    fn test_normalize_abbreviation(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(Iso4Abbreviator::new().normalize_abbreviation(raw), expected);
    }
}
