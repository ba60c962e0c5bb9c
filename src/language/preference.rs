use crate::db::Database;
use crate::errors::{Result, RtError};
use crate::language::Language;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// In-memory view of the `language` table, keyed by user or guild id.
pub struct PreferenceCache {
    db: Database,
    cache: RwLock<HashMap<u64, Language>>,
    // Serialises set() so a persisted write and its cache refresh are never interleaved.
    write_lock: Mutex<()>,
}

impl PreferenceCache {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            cache: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Preference for a subject, `Language::PRIMARY` when none was ever recorded.
    pub fn get(&self, subject_id: u64) -> Language {
        self.cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&subject_id)
            .copied()
            .unwrap_or(Language::PRIMARY)
    }

    pub fn len(&self) -> usize {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate `code`, persist it and refresh the cache.
    pub async fn set(&self, subject_id: u64, code: &str) -> Result<Language> {
        let language: Language = code.parse()?;
        self.set_language(subject_id, language).await?;
        Ok(language)
    }

    pub async fn set_language(&self, subject_id: u64, language: Language) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        debug!("Language: {} -> {}", subject_id, language.code());

        self.db
            .run_blocking(move |db| db.upsert_language(subject_id, language.code()))
            .await?;
        self.refresh_locked().await
    }

    /// Replace the cache with a full scan of the backing table.
    pub async fn refresh(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<()> {
        let rows = self.db.run_blocking(|db| db.list_languages()).await?;

        let mut fresh = HashMap::with_capacity(rows.len());
        for (subject_id, code) in rows {
            match code.parse::<Language>() {
                Ok(language) => {
                    fresh.insert(subject_id, language);
                }
                Err(RtError::InvalidLanguageCode(code)) => {
                    warn!("Language: ignoring stored code {:?} for {}", code, subject_id);
                }
                Err(e) => return Err(e),
            }
        }

        info!("Language: Cached {} preferences", fresh.len());
        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = fresh;
        Ok(())
    }

    pub fn clear(&self) {
        self.cache.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
