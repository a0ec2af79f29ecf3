pub mod fluent_loader;
pub mod language;
pub mod localizer;

pub use fluent_loader::FluentLoader;
pub use language::SupportedLanguage;
pub use localizer::Localizer;

use anyhow::Result;
use std::path::Path;

/// Initialize the i18n system for every supported language
pub fn init_i18n(locales_dir: impl AsRef<Path>, default_language: SupportedLanguage) -> Result<Localizer> {
    let mut loader = FluentLoader::new(locales_dir.as_ref());

    for language in SupportedLanguage::all() {
        loader.load_locale(*language)?;
    }

    Ok(Localizer::new(loader, default_language))
}
