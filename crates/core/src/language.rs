//! Negotiated session language.
//!
//! The core only ever speaks English and Hindi directly; adapters are free to
//! support more and translate at their boundary.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Hindi,
}

impl Language {
    /// Parse the short code used on the wire (`"en"`/`"hi"`, also `en-US`/`hi-IN`).
    pub fn from_code(code: &str) -> Option<Self> {
        let head = code.split(['-', '_']).next().unwrap_or(code);
        match head.to_lowercase().as_str() {
            "en" => Some(Self::English),
            "hi" => Some(Self::Hindi),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Hindi => "hi",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_and_region_tagged_codes() {
        assert_eq!(Language::from_code("en"), Some(Language::English));
        assert_eq!(Language::from_code("hi"), Some(Language::Hindi));
        assert_eq!(Language::from_code("en-US"), Some(Language::English));
        assert_eq!(Language::from_code("hi-IN"), Some(Language::Hindi));
        assert_eq!(Language::from_code("fr"), None);
    }

    #[test]
    fn default_is_english() {
        assert_eq!(Language::default(), Language::English);
    }
}
