//! Import configuration.
//!
//! Holds the tag table and the storage limits applied to accumulated text.

use super::tags::{DEFAULT_TAGS, TagRule};
use crate::error::{ValueError, fields};
use std::collections::HashMap;

/// Storage limit for the newline-joined author list.
pub const DEFAULT_AUTHOR_LIMIT: usize = 2000;
/// Storage limit for the joined keyword list.
pub const DEFAULT_KEYWORD_LIMIT: usize = 255;

/// Configuration for RIS imports.
///
/// # Examples
///
/// ```
/// use evidence_ris::ris::{ImportConfig, TagRule};
///
/// let mut config = ImportConfig::new();
/// config.set_tag_rule("JT", TagRule::JournalTitle)?;
/// config.set_keyword_limit(500);
/// assert_eq!(config.rule_for("JT"), Some(TagRule::JournalTitle));
/// # Ok::<(), evidence_ris::ValueError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Tag code to rule lookup
    pub(crate) tag_map: HashMap<String, TagRule>,
    /// Maximum characters kept of the author list
    pub(crate) author_limit: usize,
    /// Maximum characters kept of the keyword list
    pub(crate) keyword_limit: usize,
    /// Separator between keywords
    pub(crate) keyword_separator: String,
    /// Separator between notes
    pub(crate) notes_separator: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportConfig {
    /// Creates a configuration with the default tag table and limits
    #[must_use]
    pub fn new() -> Self {
        let mut config = Self {
            tag_map: HashMap::new(),
            author_limit: DEFAULT_AUTHOR_LIMIT,
            keyword_limit: DEFAULT_KEYWORD_LIMIT,
            keyword_separator: "; ".to_string(),
            notes_separator: "\n".to_string(),
        };
        config.set_default_tags();
        config
    }

    fn set_default_tags(&mut self) {
        for (rule, codes) in DEFAULT_TAGS {
            for code in *codes {
                self.tag_map.insert((*code).to_string(), *rule);
            }
        }
    }

    /// The rule a tag code dispatches to, if the tag is known.
    pub fn rule_for(&self, tag: &str) -> Option<TagRule> {
        self.tag_map.get(tag).copied()
    }

    /// Maps a tag code to a rule, replacing any existing mapping.
    ///
    /// Codes are matched case-insensitively and must look like a RIS tag: an
    /// ASCII letter followed by a letter or digit.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::BadValue`] for any other code, since no input
    /// line could ever carry it.
    pub fn set_tag_rule(&mut self, tag: &str, rule: TagRule) -> Result<&mut Self, ValueError> {
        let code = tag.to_ascii_uppercase();
        if !is_tag_code(&code) {
            return Err(ValueError::BadValue {
                field: fields::TAG,
                key: "tag".to_string(),
                value: tag.to_string(),
                reason: "expected a letter followed by a letter or digit".to_string(),
            });
        }
        self.tag_map.insert(code, rule);
        Ok(self)
    }

    /// Forgets a tag code so that it is reported as unknown
    pub fn remove_tag(&mut self, tag: &str) -> &mut Self {
        self.tag_map.remove(&tag.to_ascii_uppercase());
        self
    }

    /// Sets the maximum number of characters kept of the author list
    pub fn set_author_limit(&mut self, limit: usize) -> &mut Self {
        self.author_limit = limit;
        self
    }

    /// Sets the maximum number of characters kept of the keyword list
    pub fn set_keyword_limit(&mut self, limit: usize) -> &mut Self {
        self.keyword_limit = limit;
        self
    }

    /// Sets the separator placed between keywords
    pub fn set_keyword_separator(&mut self, separator: &str) -> &mut Self {
        self.keyword_separator = separator.to_string();
        self
    }

    /// Sets the separator placed between notes
    pub fn set_notes_separator(&mut self, separator: &str) -> &mut Self {
        self.notes_separator = separator.to_string();
        self
    }

    pub fn author_limit(&self) -> usize {
        self.author_limit
    }

    pub fn keyword_limit(&self) -> usize {
        self.keyword_limit
    }
}

fn is_tag_code(code: &str) -> bool {
    matches!(
        code.as_bytes(),
        [first, second] if first.is_ascii_uppercase() && (second.is_ascii_uppercase() || second.is_ascii_digit())
    )
}
