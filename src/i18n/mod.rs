//! Internationalization (i18n) support
//!
//! UI strings ship for `pt-BR` and `en`. A site can override or add keys
//! with `languages/<lang>.yml`.

use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const PT_BR: &[(&str, &str)] = &[
    ("home_title", "Home"),
    ("post_title", "Post"),
    ("load_more", "Carregar mais posts"),
    ("loading", "Carregando..."),
    ("load_failed", "Não foi possível carregar mais posts. Tente novamente."),
    ("reading_time", "%d min"),
    ("not_found_title", "Post não encontrado"),
    ("not_found_body", "Não existe nenhum post com este endereço."),
    ("back_home", "Voltar para o início"),
    ("error_title", "Erro ao carregar o post"),
];

const EN: &[(&str, &str)] = &[
    ("home_title", "Home"),
    ("post_title", "Post"),
    ("load_more", "Load more posts"),
    ("loading", "Loading..."),
    ("load_failed", "Could not load more posts. Please try again."),
    ("reading_time", "%d min"),
    ("not_found_title", "Post not found"),
    ("not_found_body", "There is no post at this address."),
    ("back_home", "Back to home"),
    ("error_title", "Could not load this post"),
];

/// Internationalization handler
#[derive(Debug, Clone)]
pub struct I18n {
    /// Current language, normalized (`pt-br`)
    language: String,
    /// lang -> flattened key -> translation
    translations: HashMap<String, HashMap<String, String>>,
}

impl I18n {
    /// Create a handler seeded with the built-in tables
    pub fn new(language: &str) -> Self {
        let mut translations = HashMap::new();
        translations.insert("pt-br".to_string(), table(PT_BR));
        translations.insert("en".to_string(), table(EN));
        Self {
            language: normalize(language),
            translations,
        }
    }

    /// Overlay language files from a directory (`pt-BR.yml`, `en.yml`, ...)
    pub fn load_languages<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if !path.is_file() || !matches!(ext, Some("yml") | Some("yaml")) {
                continue;
            }
            let Some(lang) = path.file_stem().and_then(|s| s.to_str()).map(normalize) else {
                continue;
            };

            let content = fs::read_to_string(&path)?;
            match serde_yaml::from_str::<HashMap<String, serde_yaml::Value>>(&content) {
                Ok(data) => {
                    let entries = self.translations.entry(lang).or_default();
                    flatten_translations(&data, "", entries);
                    tracing::debug!("Loaded language file: {:?}", path);
                }
                Err(e) => tracing::warn!("Failed to parse language file {:?}: {}", path, e),
            }
        }

        Ok(())
    }

    /// Get the current language
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Get a translation by key, falling back to English, then to the key
    pub fn get(&self, key: &str) -> String {
        [self.language.as_str(), base_language(&self.language), "en"]
            .iter()
            .find_map(|lang| self.translations.get(*lang)?.get(key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Translation with `%d` replaced by `count`
    pub fn get_count(&self, key: &str, count: usize) -> String {
        self.get(key).replace("%d", &count.to_string())
    }

    /// All translations for the current language, English filling gaps
    pub fn get_all_translations(&self) -> HashMap<String, String> {
        let mut result = HashMap::new();
        for lang in ["en", base_language(&self.language), self.language.as_str()] {
            if let Some(entries) = self.translations.get(lang) {
                result.extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        result
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new("pt-BR")
    }
}

fn table(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn normalize(language: &str) -> String {
    language.trim().replace('_', "-").to_ascii_lowercase()
}

/// `pt-br` -> `pt`
fn base_language(language: &str) -> &str {
    language.split('-').next().unwrap_or(language)
}

/// Flatten nested YAML into dot-notation keys
fn flatten_translations(
    data: &HashMap<String, serde_yaml::Value>,
    prefix: &str,
    result: &mut HashMap<String, String>,
) {
    for (key, value) in data {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            serde_yaml::Value::String(s) => {
                result.insert(full_key, s.clone());
            }
            serde_yaml::Value::Number(n) => {
                result.insert(full_key, n.to_string());
            }
            serde_yaml::Value::Bool(b) => {
                result.insert(full_key, b.to_string());
            }
            serde_yaml::Value::Mapping(map) => {
                let nested: HashMap<String, serde_yaml::Value> = map
                    .iter()
                    .filter_map(|(k, v)| Some((k.as_str()?.to_string(), v.clone())))
                    .collect();
                flatten_translations(&nested, &full_key, result);
            }
            _ => {}
        }
    }
}
