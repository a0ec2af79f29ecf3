use anyhow::{Context, Result};
use fluent_bundle::{concurrent::FluentBundle, FluentResource};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::i18n::language::SupportedLanguage;

pub type Bundle = FluentBundle<FluentResource>;

/// Loads and manages Fluent translation resources
pub struct FluentLoader {
    bundles: HashMap<SupportedLanguage, Bundle>,
    locales_dir: PathBuf,
}

impl FluentLoader {
    pub fn new(locales_dir: impl Into<PathBuf>) -> Self {
        Self {
            bundles: HashMap::new(),
            locales_dir: locales_dir.into(),
        }
    }

    /// Load every `.ftl` file under `<locales_dir>/<code>`, falling back to the
    /// resources compiled into the binary when that directory has none.
    pub fn load_locale(&mut self, language: SupportedLanguage) -> Result<()> {
        let locale_dir = self.locales_dir.join(language.code());
        let mut sources = read_ftl_files(&locale_dir)?;

        if sources.is_empty() {
            tracing::debug!(
                "No FTL files in {:?}, using embedded resources for {}",
                locale_dir,
                language.code()
            );
            sources = language
                .embedded_resources()
                .iter()
                .map(|source| source.to_string())
                .collect();
        }

        let mut bundle = FluentBundle::new_concurrent(vec![language.lang_id()]);
        // Notification text ends up in plain JSON, not bidi-aware markup.
        bundle.set_use_isolating(false);

        let loaded = sources.len();
        for source in sources {
            let resource = FluentResource::try_new(source).map_err(|(_, errors)| {
                anyhow::anyhow!("Failed to parse FTL resource for {}: {:?}", language, errors)
            })?;
            bundle.add_resource(resource).map_err(|errors| {
                anyhow::anyhow!("Failed to add resource to bundle: {:?}", errors)
            })?;
        }

        tracing::info!("Loaded {} FTL resources for locale {}", loaded, language.code());

        self.bundles.insert(language, bundle);
        Ok(())
    }

    /// Get a bundle for a specific language
    pub fn get_bundle(&self, language: &SupportedLanguage) -> Option<&Bundle> {
        self.bundles.get(language)
    }
}

fn read_ftl_files(locale_dir: &Path) -> Result<Vec<String>> {
    if !locale_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut sources = Vec::new();
    let entries = fs::read_dir(locale_dir)
        .with_context(|| format!("Failed to read locale directory: {:?}", locale_dir))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("ftl") {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read file: {:?}", path))?;
            sources.push(content);
        }
    }
    Ok(sources)
}
