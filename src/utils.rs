//! Normalizers that canonicalize raw tag text.
//!
//! Every function here is pure: no lookups, no diagnostics. Callers decide
//! what a `None` means for the record at hand.

use crate::model::Date;
use crate::regex::Regex;
use std::sync::LazyLock;

static DOI_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(?:dx\.)?doi\.org/(.+)$").unwrap());

static ISSN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{7}[\dX]$").unwrap());

static ISBN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d{9}[\dX]|\d{13})$").unwrap());

/// Markers after which a persistence message only carries SQL detail.
const SQL_DETAIL_MARKERS: &[&str] = &[
    "; SQL [",
    "; nested exception",
    "; constraint [",
    "\nDetail:",
    "  Detail:",
    " Detail:",
    "\n  Where:",
    "\n  Position:",
];

/// Maximum number of characters a lenient date is read from.
const DATE_WIDTH: usize = 10;

/// Parse a bare year such as `"1998"`.
pub fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i32>().ok()
}

/// Leniently parse a RIS date.
///
/// The value is cut to its first ten characters, `-` and `.` separators are
/// read as `/`, and empty components left by `///`-style placeholders
/// (`"1998///"`, `"2001/05//"`) are dropped. Anything else that does not
/// read as `year[/month[/day]]` fails.
pub fn normalize_date(raw: &str) -> Option<Date> {
    let truncated: String = raw.trim().chars().take(DATE_WIDTH).collect();
    let rewritten = truncated.replace(['-', '.'], "/");
    let mut parts = rewritten.split('/').map(str::trim);

    let year = parts.next().and_then(parse_year)?;

    let month = match parts.next() {
        None | Some("") => None,
        Some(m) => Some(m.parse::<u8>().ok().filter(|m| (1..=12).contains(m))?),
    };
    let day = match parts.next() {
        None | Some("") => None,
        Some(d) => Some(d.parse::<u8>().ok().filter(|d| (1..=31).contains(d))?),
    };
    // A day without a month is a placeholder artefact, not information.
    let day = month.and(day);

    // Whatever is left inside the ten characters must be placeholder slashes.
    if parts.any(|rest| !rest.is_empty()) {
        return None;
    }

    Some(Date { year, month, day })
}

/// Canonicalize an ISSN to the hyphenated `NNNN-NNNC` form.
///
/// Idempotent: normalizing an already normalized ISSN returns it unchanged.
pub fn normalize_issn(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if !ISSN_REGEX.is_match(&compact) {
        return None;
    }

    Some(format!("{}-{}", &compact[..4], &compact[4..]))
}

/// Canonicalize an ISBN-10 or ISBN-13 to its bare digits.
///
/// Accepts an `ISBN` prefix and ignores hyphens, spaces and any trailing
/// parenthesized qualifier such as `(pbk.)`.
pub fn normalize_isbn(raw: &str) -> Option<String> {
    let mut value = raw.trim();
    if value.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("ISBN")) {
        value = value[4..].trim_start_matches([':', ' ', '-']);
    }
    if let Some(pos) = value.find('(') {
        value = &value[..pos];
    }

    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    ISBN_REGEX.is_match(&compact).then_some(compact)
}

/// Split a serial-number value into its first token and the untouched rest.
///
/// Tokens are separated by commas, semicolons or whitespace, e.g.
/// `"0891-3668, 1532-0987"` splits into `("0891-3668", Some("1532-0987"))`.
pub fn split_serial_numbers(raw: &str) -> (&str, Option<&str>) {
    let raw = raw.trim();
    let is_separator = |c: char| c == ',' || c == ';' || c.is_whitespace();

    match raw.find(is_separator) {
        Some(pos) => {
            let first = &raw[..pos];
            let rest = raw[pos..].trim_start_matches(is_separator).trim_end();
            (first, (!rest.is_empty()).then_some(rest))
        }
        None => (raw, None),
    }
}

/// Cut `text` to at most `max_chars` characters, on a character boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((pos, _)) => &text[..pos],
        None => text,
    }
}

/// Strip SQL fragments and driver prefixes from a persistence error message.
pub fn clean_persistence_message(raw: &str) -> String {
    let mut message = raw.trim();

    if let Some(cut) = SQL_DETAIL_MARKERS
        .iter()
        .filter_map(|marker| message.find(marker))
        .min()
    {
        message = &message[..cut];
    }

    for prefix in ["ERROR:", "error:"] {
        if let Some(rest) = message.strip_prefix(prefix) {
            message = rest;
        }
    }

    let message = message.trim().trim_end_matches(';').trim();
    if message.is_empty() {
        "unknown persistence error".to_string()
    } else {
        message.to_string()
    }
}

/// Formats page numbers consistently, handling partial end page numbers
///
/// # Arguments
///
/// * `page_range` - The page string to format
pub fn format_page_numbers(page_range: &str) -> String {
    let Some((from, to)) = page_range.split_once('-') else {
        return page_range.to_string();
    };
    if to.contains('-') {
        return page_range.to_string();
    }

    let (from_prefix, from_num) = split_prefix_and_number(from);
    let (to_prefix, to_num) = split_prefix_and_number(to);

    if from_prefix != to_prefix && !from_prefix.is_empty() && !to_prefix.is_empty() {
        return page_range.to_string();
    }

    let (Some(from_num), Some(to_num)) = (from_num, to_num) else {
        return page_range.to_string();
    };
    if !is_ascii_number(from_num) || !is_ascii_number(to_num) {
        return page_range.to_string();
    }

    // "1234-45" abbreviates the end page; borrow the leading digits.
    let completed_to = if to_num.len() < from_num.len() {
        format!("{}{}", &from_num[..from_num.len() - to_num.len()], to_num)
    } else {
        to_num.to_string()
    };

    if from_num == completed_to {
        return format!("{}{}", from_prefix, from_num);
    }

    format!("{}{}-{}{}", from_prefix, from_num, from_prefix, completed_to)
}

fn is_ascii_number(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

/// Split a page number into its prefix and numeric part
fn split_prefix_and_number(input: &str) -> (&str, Option<&str>) {
    match input.find(|c: char| c.is_ascii_digit()) {
        Some(index) => (&input[..index], Some(&input[index..])),
        None => (input, None),
    }
}

/// Formats a DOI string by removing URL prefixes and [doi] suffixes
///
/// # Arguments
///
/// * `doi_str` - The DOI string to format
pub fn format_doi(doi_str: &str) -> Option<String> {
    if doi_str.is_empty() {
        return None;
    }
    let doi = doi_str
        .trim()
        .trim_end_matches("[doi]")
        .trim()
        .replace(|c: char| c.is_whitespace(), "")
        .to_lowercase();

    let doi = match DOI_URL_REGEX.captures(&doi) {
        Some(captures) => captures[1].to_string(),
        None => doi,
    };
    let pos = doi.find("10.")?;
    Some(doi[pos..].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("1998", Some(1998))]
    #[case(" 2023 ", Some(2023))]
    #[case("19x8", None)]
    #[case("", None)]
    fn test_parse_year(#[case] input: &str, #[case] expected: Option<i32>) {
        assert_eq!(parse_year(input), expected);
    }

    #[rstest]
    #[case("1998///", Some(Date { year: 1998, month: None, day: None }))]
    #[case("2001/05//", Some(Date { year: 2001, month: Some(5), day: None }))]
    #[case("2001/05/12/Spring issue", Some(Date { year: 2001, month: Some(5), day: Some(12) }))]
    #[case("2001-05-12", Some(Date { year: 2001, month: Some(5), day: Some(12) }))]
    #[case("2001.05.12", Some(Date { year: 2001, month: Some(5), day: Some(12) }))]
    #[case("2001//12/", Some(Date { year: 2001, month: None, day: None }))]
    #[case("2001/13/01", None)]
    #[case("2001/05/40", None)]
    #[case("Spring 2001", None)]
    #[case("2001/05/1x", None)]
    #[case("", None)]
    fn test_normalize_date(#[case] input: &str, #[case] expected: Option<Date>) {
        assert_eq!(normalize_date(input), expected);
    }

    #[rstest]
    #[case("0891-3668", Some("0891-3668"))]
    #[case("08913668", Some("0891-3668"))]
    #[case("1532-098x", Some("1532-098X"))]
    #[case(" 1532 098X ", Some("1532-098X"))]
    #[case("0891-366", None)]
    #[case("978-0-12-345678-9", None)]
    #[case("", None)]
    fn test_normalize_issn(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize_issn(input).as_deref(), expected);
    }

    #[test]
    fn test_normalize_issn_is_idempotent() {
        for raw in ["08913668", "0891-3668", "1532098x", "1532 - 098X"] {
            let once = normalize_issn(raw).unwrap();
            let twice = normalize_issn(&once).unwrap();
            assert_eq!(once, twice);
            assert_eq!(once.matches('-').count(), 1);
        }
    }

    #[rstest]
    #[case("978-0-12-345678-9", Some("9780123456789"))]
    #[case("ISBN: 0-306-40615-2", Some("0306406152"))]
    #[case("isbn 080442957x (pbk.)", Some("080442957X"))]
    #[case("0891-3668", None)]
    #[case("", None)]
    fn test_normalize_isbn(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize_isbn(input).as_deref(), expected);
    }

    #[rstest]
    #[case("0891-3668", ("0891-3668", None))]
    #[case("0891-3668, 1532-0987", ("0891-3668", Some("1532-0987")))]
    #[case("0891-3668 1532-0987 1111-2222", ("0891-3668", Some("1532-0987 1111-2222")))]
    #[case("0891-3668;", ("0891-3668", None))]
    fn test_split_serial_numbers(#[case] input: &str, #[case] expected: (&str, Option<&str>)) {
        assert_eq!(split_serial_numbers(input), expected);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("äöüß", 2), "äö");
        assert_eq!(truncate_chars("", 0), "");
    }

    #[rstest]
    #[case(
        "could not execute statement; SQL [n/a]; constraint [uk_doi]",
        "could not execute statement"
    )]
    #[case(
        "ERROR: duplicate key value violates unique constraint \"uk_publication_doi\"\n  Detail: Key (doi)=(10.1/x) already exists.",
        "duplicate key value violates unique constraint \"uk_publication_doi\""
    )]
    #[case("plain failure", "plain failure")]
    #[case("; SQL [select 1]", "unknown persistence error")]
    fn test_clean_persistence_message(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(clean_persistence_message(input), expected);
    }

    #[test]
    fn test_format_page_numbers() {
        assert_eq!(format_page_numbers("1234-45"), "1234-1245");
        assert_eq!(format_page_numbers("1234"), "1234");
        assert_eq!(format_page_numbers("R575-82"), "R575-R582");
        assert_eq!(format_page_numbers("12-345"), "12-345");
        assert_eq!(format_page_numbers("01-Apr"), "01-Apr");
        assert_eq!(format_page_numbers("101-101"), "101");
        assert_eq!(format_page_numbers("1ü-2"), "1ü-2");
        assert_eq!(format_page_numbers("12-1ü"), "12-1ü");
    }

    #[rstest]
    #[case("10.1000/test", Some("10.1000/test"))]
    #[case("10.1000/test [doi]", Some("10.1000/test"))]
    #[case("https://doi.org/10.1000/TEST", Some("10.1000/test"))]
    #[case("doi: 10.1000/test", Some("10.1000/test"))]
    #[case("https://dx.doi.org/10.1000/X", Some("10.1000/x"))]
    #[case("http://doi.org/ 10.1000/a b", Some("10.1000/ab"))]
    #[case("invalid", None)]
    #[case("", None)]
    fn test_format_doi(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(format_doi(input).as_deref(), expected);
    }
}
