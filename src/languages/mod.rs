use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LanguageTagError {
    #[error("language tag is empty")]
    Empty,
    #[error("'{tag}' is not a well-formed BCP 47 tag: {reason}")]
    Malformed { tag: String, reason: String },
}

/// A well-formed BCP 47 language tag in canonical case (`en`, `zh-Hant`, `pt-BR`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguageTag(language_tags::LanguageTag);

impl LanguageTag {
    /// Accepts `_` as a subtag separator (`pt_BR`), as locale strings often use it.
    pub fn parse(raw: &str) -> Result<Self, LanguageTagError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(LanguageTagError::Empty);
        }
        let normalized = raw.replace('_', "-");
        language_tags::LanguageTag::parse(&normalized)
            .map(LanguageTag)
            .map_err(|err| LanguageTagError::Malformed {
                tag: raw.to_string(),
                reason: err.to_string(),
            })
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Primary language subtag, e.g. `zh` for `zh-Hant-TW`.
    pub fn primary(&self) -> &str {
        self.0.primary_language()
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_auto(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto")
}

/// Source languages accept `auto` (or nothing) to let the engine detect.
pub fn parse_source_lang(raw: &str) -> Result<Option<LanguageTag>, LanguageTagError> {
    if is_auto(raw) {
        return Ok(None);
    }
    LanguageTag::parse(raw).map(Some)
}
