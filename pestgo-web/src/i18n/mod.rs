//! Translation lookup and the persisted language preference.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

use crate::services::storage::{LocalStorage, LANGUAGE_KEY};
use crate::services::BackendError;

const TR_TABLE: &str = include_str!("tr.json");
const EN_TABLE: &str = include_str!("en.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Default, and the fallback for missing keys.
    #[default]
    Tr,
    En,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Tr, Language::En];

    pub fn code(&self) -> &'static str {
        match self {
            Language::Tr => "tr",
            Language::En => "en",
        }
    }

    pub fn native_name(&self) -> &'static str {
        match self {
            Language::Tr => "Türkçe",
            Language::En => "English",
        }
    }

    pub fn parse(code: &str) -> Option<Language> {
        match code.trim().to_ascii_lowercase().as_str() {
            "tr" => Some(Language::Tr),
            "en" => Some(Language::En),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Nested translation tables, one per language.
pub struct Translator {
    tr: Value,
    en: Value,
}

impl Translator {
    pub fn embedded() -> Result<Self, serde_json::Error> {
        Ok(Self::from_tables(
            serde_json::from_str(TR_TABLE)?,
            serde_json::from_str(EN_TABLE)?,
        ))
    }

    pub fn from_tables(tr: Value, en: Value) -> Self {
        Self { tr, en }
    }

    fn table(&self, language: Language) -> &Value {
        match language {
            Language::Tr => &self.tr,
            Language::En => &self.en,
        }
    }

    /// Walk `key` ("nav.dashboard") in `language`, then in Turkish, then give
    /// the key back unchanged.
    pub fn t<'a>(&'a self, language: Language, key: &'a str) -> &'a str {
        lookup(self.table(language), key)
            .or_else(|| lookup(&self.tr, key))
            .unwrap_or(key)
    }
}

fn lookup<'a>(table: &'a Value, key: &str) -> Option<&'a str> {
    key.split('.')
        .try_fold(table, |node, part| node.get(part))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// A translator pinned to one language, handed to templates.
#[derive(Clone)]
pub struct Localizer {
    translator: Arc<Translator>,
    language: Language,
}

impl Localizer {
    pub fn new(translator: Arc<Translator>, language: Language) -> Self {
        Self {
            translator,
            language,
        }
    }

    pub fn t<'a>(&'a self, key: &'a str) -> &'a str {
        self.translator.t(self.language, key)
    }

    pub fn language(&self) -> Language {
        self.language
    }
}

/// Current language for the process, restored from and saved to local storage.
pub struct LanguageContext {
    translator: Arc<Translator>,
    current: watch::Sender<Language>,
    storage: Arc<LocalStorage>,
}

impl LanguageContext {
    /// Unknown or missing stored values fall back to Turkish.
    pub async fn load(translator: Arc<Translator>, storage: Arc<LocalStorage>) -> Self {
        let language = match storage.get(LANGUAGE_KEY).await {
            Some(code) => Language::parse(&code).unwrap_or_else(|| {
                tracing::warn!(code = %code, "Ignoring unknown stored language");
                Language::default()
            }),
            None => Language::default(),
        };

        let (current, _) = watch::channel(language);
        Self {
            translator,
            current,
            storage,
        }
    }

    pub fn language(&self) -> Language {
        *self.current.borrow()
    }

    pub fn localizer(&self) -> Localizer {
        Localizer::new(Arc::clone(&self.translator), self.language())
    }

    pub fn watch(&self) -> watch::Receiver<Language> {
        self.current.subscribe()
    }

    /// Switch immediately; the preference is persisted afterwards.
    pub async fn set_language(&self, language: Language) -> Result<(), BackendError> {
        self.current.send_replace(language);
        self.storage.set(LANGUAGE_KEY, language.code()).await?;
        tracing::info!(language = %language, "Language changed");
        Ok(())
    }
}
