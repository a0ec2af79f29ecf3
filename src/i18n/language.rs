use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;
use unic_langid::{langid, LanguageIdentifier};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupportedLanguage {
    #[serde(rename = "tr")]
    #[default]
    Turkish,
    #[serde(rename = "en")]
    English,
}

impl SupportedLanguage {
    /// Get all supported languages
    pub fn all() -> &'static [SupportedLanguage] {
        &[SupportedLanguage::Turkish, SupportedLanguage::English]
    }

    /// Get the language code as a string
    pub fn code(&self) -> &'static str {
        match self {
            SupportedLanguage::Turkish => "tr",
            SupportedLanguage::English => "en",
        }
    }

    /// Get the language identifier for Fluent
    pub fn lang_id(&self) -> LanguageIdentifier {
        match self {
            SupportedLanguage::Turkish => langid!("tr"),
            SupportedLanguage::English => langid!("en-US"),
        }
    }

    /// Translations compiled into the binary, used when no locale directory exists.
    pub(crate) fn embedded_resources(&self) -> &'static [&'static str] {
        match self {
            SupportedLanguage::Turkish => &[include_str!("../../locales/tr/notifications.ftl")],
            SupportedLanguage::English => &[include_str!("../../locales/en/notifications.ftl")],
        }
    }
}

impl Display for SupportedLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for SupportedLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tr" | "turkish" | "türkçe" => Ok(SupportedLanguage::Turkish),
            "en" | "english" | "en-us" => Ok(SupportedLanguage::English),
            _ => Err(format!("Unsupported language: {}", s)),
        }
    }
}
