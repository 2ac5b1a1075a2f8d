use std::fmt;

use serde::{Deserialize, Serialize};

/// A locale tag such as `en_US` or `ko`. Only the language part influences
/// dictionary behavior; the full tag is used for naming files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Locale(String);

impl Locale {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into().replace('-', "_"))
    }

    /// The "no locale" placeholder held by an inactive facilitator.
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn language(&self) -> &str {
        self.0.split('_').next().unwrap_or_default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// BCP-47 style tag, used for per-locale side files.
    pub fn to_language_tag(&self) -> String {
        self.0.replace('_', "-")
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locale {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_part() {
        assert_eq!(Locale::new("en_US").language(), "en");
        assert_eq!(Locale::new("ko").language(), "ko");
        assert_eq!(Locale::new("pt-BR").as_str(), "pt_BR");
        assert_eq!(Locale::new("pt-BR").to_language_tag(), "pt-BR");
        assert!(Locale::root().is_root());
    }
}
