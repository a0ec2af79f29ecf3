use anyhow::{anyhow, Result};
use fluent_bundle::{FluentArgs, FluentValue};
use std::collections::HashMap;

use crate::i18n::fluent_loader::FluentLoader;
use crate::i18n::language::SupportedLanguage;

/// Main localization interface
pub struct Localizer {
    loader: FluentLoader,
    default_language: SupportedLanguage,
}

impl Localizer {
    pub fn new(loader: FluentLoader, default_language: SupportedLanguage) -> Self {
        Self {
            loader,
            default_language,
        }
    }

    /// Get a localized message for a specific language
    pub fn get_message_with_language(
        &self,
        language: &SupportedLanguage,
        key: &str,
        args: Option<&HashMap<String, FluentValue>>,
    ) -> Result<String> {
        let bundle = self
            .loader
            .get_bundle(language)
            .or_else(|| self.loader.get_bundle(&self.default_language))
            .ok_or_else(|| anyhow!("No bundle available for language: {}", language))?;

        let message = bundle
            .get_message(key)
            .ok_or_else(|| anyhow!("Message not found: {}", key))?;

        let pattern = message
            .value()
            .ok_or_else(|| anyhow!("Message has no value: {}", key))?;

        let mut errors = Vec::new();
        let formatted = if let Some(args) = args {
            let mut fluent_args = FluentArgs::new();
            for (k, v) in args {
                fluent_args.set(k.as_str(), v.clone());
            }
            bundle.format_pattern(pattern, Some(&fluent_args), &mut errors)
        } else {
            bundle.format_pattern(pattern, None, &mut errors)
        };

        if !errors.is_empty() {
            tracing::warn!("Fluent formatting errors for key '{}': {:?}", key, errors);
        }

        Ok(formatted.into_owned())
    }

    /// Like [`Localizer::get_message_with_language`], but returns the key itself when
    /// no translation exists.
    pub fn text(
        &self,
        language: &SupportedLanguage,
        key: &str,
        args: Option<&HashMap<String, FluentValue>>,
    ) -> String {
        self.get_message_with_language(language, key, args)
            .unwrap_or_else(|_| key.to_string())
    }
}

/// Helper macro for creating FluentValue arguments
#[macro_export]
macro_rules! fluent_args {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut args = std::collections::HashMap::new();
        $(
            args.insert($key.to_string(), fluent_bundle::FluentValue::from($value));
        )*
        args
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    fn localizer() -> Localizer {
        let mut loader = FluentLoader::new("does/not/exist");
        loader.load_locale(SupportedLanguage::English).unwrap();
        loader.load_locale(SupportedLanguage::Turkish).unwrap();
        Localizer::new(loader, SupportedLanguage::English)
    }

    #[test]
    fn test_formats_with_arguments() {
        let localizer = localizer();
        let args = crate::fluent_args![
            "title" => "Roof audit",
            "from" => "Draft",
            "to" => "Pending QS review",
        ];
        let text = localizer.text(&SupportedLanguage::English, "report-status-changed", Some(&args));
        assert_eq!(text, "Report Roof audit moved from Draft to Pending QS review.");
    }

    #[test]
    fn test_language_specific_text() {
        let localizer = localizer();
        assert_eq!(
            localizer.text(&SupportedLanguage::Turkish, "notification-title-approved", None),
            "Rapor onaylandı"
        );
    }

    #[test]
    fn test_unknown_key_falls_back_to_key() {
        let localizer = localizer();
        assert_eq!(
            localizer.text(&SupportedLanguage::English, "no-such-key", None),
            "no-such-key"
        );
        assert!(localizer
            .get_message_with_language(&SupportedLanguage::English, "no-such-key", None)
            .is_err());
    }
}
