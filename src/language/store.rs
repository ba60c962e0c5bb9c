use crate::errors::{Result, RtError};
use crate::language::placeholder::PlaceholderCodec;
use crate::language::Language;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// canonical phrase -> language code -> translated phrase
pub type TranslationTable = HashMap<String, HashMap<String, String>>;

pub struct TranslationStore {
    path: PathBuf,
    codec: PlaceholderCodec,
    table: RwLock<Arc<TranslationTable>>,
}

impl TranslationStore {
    /// An empty store backed by the JSON file at `path`. Nothing is read until `reload`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            codec: PlaceholderCodec::default(),
            table: RwLock::new(Arc::new(TranslationTable::new())),
        }
    }

    pub fn with_table(table: TranslationTable) -> Self {
        let store = Self::new(PathBuf::new());
        store.replace(table);
        store
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Arc<TranslationTable> {
        self.table
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn replace(&self, table: TranslationTable) {
        *self.table.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(table);
    }

    /// Re-read the backing file. The in-memory table is only swapped once the whole file
    /// has parsed, so a failed reload leaves the previous table in place.
    pub async fn reload(&self) -> Result<()> {
        let path = self.path.display().to_string();
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| RtError::TranslationIo {
                path: path.clone(),
                source,
            })?;
        let table: TranslationTable = serde_json::from_str(&raw)
            .map_err(|source| RtError::TranslationParse { path: path.clone(), source })?;

        info!("Language: Loaded {} phrases from {}", table.len(), path);
        self.replace(table);
        Ok(())
    }

    /// Exact lookup of a canonical phrase. Misses return the phrase unchanged.
    pub fn lookup(&self, canonical: &str, language: Language) -> String {
        let table = self.snapshot();
        match table
            .get(canonical)
            .and_then(|entry| entry.get(language.code()))
        {
            Some(found) => found.clone(),
            None => {
                debug!("Language: no {} entry for {:?}", language.code(), canonical);
                canonical.to_string()
            }
        }
    }

    /// Translate runtime text: pull out `$...$` segments, look up the canonical form and put
    /// the segments back into whatever came out.
    pub fn translate(&self, text: &str, language: Language) -> String {
        let extracted = self.codec.extract(text);
        let translated = self.lookup(&extracted.canonical, language);
        self.codec.reinsert(&translated, &extracted.segments)
    }
}

#[cfg(test)]
pub(crate) fn table(entries: &[(&str, &str, &str)]) -> TranslationTable {
    let mut table = TranslationTable::new();
    for (phrase, code, translated) in entries {
        table
            .entry(phrase.to_string())
            .or_default()
            .insert(code.to_string(), translated.to_string());
    }
    table
}
