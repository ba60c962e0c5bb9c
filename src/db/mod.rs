use crate::config::Config;
use crate::errors::RtError;
use rusqlite::{Connection, Result};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(config: &Config) -> Result<Self> {
        let conn = Connection::open(&config.database_url)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned lock only means another query panicked; the connection itself is fine.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run a blocking closure against the database off the async executor.
    pub async fn run_blocking<T, F>(&self, f: F) -> std::result::Result<T, RtError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let db = self.clone();
        let value = tokio::task::spawn_blocking(move || f(&db)).await??;
        Ok(value)
    }

    pub fn execute_init(&self) -> Result<()> {
        info!("Database: Initializing schema...");
        let sql = include_str!("schema.sql");
        let conn = self.lock();
        conn.execute_batch(sql)?;
        debug!("Database: Schema initialized successfully");
        Ok(())
    }

    // --- Language preferences ---

    pub fn language_exists(&self, subject_id: u64) -> Result<bool> {
        let conn = self.lock();
        let exists = conn
            .prepare("SELECT 1 FROM language WHERE id = ?1")?
            .exists([subject_id as i64])?;
        Ok(exists)
    }

    pub fn insert_language(&self, subject_id: u64, language: &str) -> Result<()> {
        debug!("Database: Inserting language {} for {}", language, subject_id);
        let conn = self.lock();
        conn.execute(
            "INSERT INTO language (id, language) VALUES (?1, ?2)",
            (subject_id as i64, language),
        )?;
        Ok(())
    }

    pub fn update_language(&self, subject_id: u64, language: &str) -> Result<()> {
        debug!("Database: Updating language to {} for {}", language, subject_id);
        let conn = self.lock();
        conn.execute(
            "UPDATE language SET language = ?1 WHERE id = ?2",
            (language, subject_id as i64),
        )?;
        Ok(())
    }

    /// Insert-or-update in the shape the preference table has always been written.
    pub fn upsert_language(&self, subject_id: u64, language: &str) -> Result<()> {
        if self.language_exists(subject_id)? {
            self.update_language(subject_id, language)
        } else {
            self.insert_language(subject_id, language)
        }
    }

    pub fn list_languages(&self) -> Result<Vec<(u64, String)>> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT id, language FROM language")?;
        let rows = stmt.query_map([], |row| {
            let id: i64 = row.get(0)?;
            Ok((id as u64, row.get(1)?))
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    fn test_db() -> Database {
        let db = Database::new(&test_config()).unwrap();
        db.execute_init().unwrap();
        db
    }

    #[test]
    fn test_init_is_idempotent() {
        let db = test_db();
        db.execute_init().unwrap();
        assert!(db.list_languages().unwrap().is_empty());
    }

    #[test]
    fn test_language_upsert() {
        let db = test_db();

        assert!(!db.language_exists(42).unwrap());

        db.upsert_language(42, "en").unwrap();
        assert!(db.language_exists(42).unwrap());
        assert_eq!(db.list_languages().unwrap(), vec![(42, "en".to_string())]);

        db.upsert_language(42, "ja").unwrap();
        assert_eq!(db.list_languages().unwrap(), vec![(42, "ja".to_string())]);
    }

    #[test]
    fn test_large_snowflake_survives_roundtrip() {
        let db = test_db();
        let id = 876_543_210_987_654_321u64;
        db.insert_language(id, "en").unwrap();
        assert_eq!(db.list_languages().unwrap(), vec![(id, "en".to_string())]);
    }

    #[tokio::test]
    async fn test_run_blocking() {
        let db = test_db();
        db.run_blocking(|db| db.upsert_language(7, "en")).await.unwrap();
        let rows = db.run_blocking(|db| db.list_languages()).await.unwrap();
        assert_eq!(rows, vec![(7, "en".to_string())]);
    }
}
