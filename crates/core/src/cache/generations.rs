//! Generation lifecycle: open-or-create, enumerate, delete, and the
//! cross-generation match used by request-time fallbacks.

use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::entries::{ENTRY_COLUMNS, RawEntry, StoredEntry};
use super::key::RequestKey;
use crate::Error;

/// Handle on one named generation.
#[derive(Clone, Debug)]
pub struct CacheHandle {
    pub(crate) db: CacheDb,
    pub(crate) name: String,
}

impl CacheHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl CacheDb {
    /// Open the generation called `name`, creating it if absent.
    pub async fn open_generation(&self, name: &str) -> Result<CacheHandle, Error> {
        let generation = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![generation, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(CacheHandle { db: self.clone(), name: name.to_string() })
    }

    /// Names of every existing generation, in creation order.
    pub async fn generation_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Whether a generation called `name` exists.
    pub async fn has_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and, by cascade, all of its entries.
    ///
    /// Returns false if no such generation existed.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Look `key` up across every generation, oldest generation first, and
    /// return the first hit.
    pub async fn match_any(&self, key: &RequestKey) -> Result<Option<StoredEntry>, Error> {
        let key_hash = key.digest();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<RawEntry>, Error> {
                let sql = format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries
                     JOIN generations g ON g.name = entries.generation
                     WHERE entries.key_hash = ?1
                     ORDER BY g.rowid ASC
                     LIMIT 1"
                );
                let result = conn.query_row(&sql, params![key_hash], RawEntry::from_row);

                match result {
                    Ok(raw) => Ok(Some(raw)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        raw.map(RawEntry::decode).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Response;

    fn key(url: &str) -> RequestKey {
        RequestKey::for_url(url, None).unwrap()
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("quiz-cache-v2").await.unwrap();
        db.open_generation("quiz-cache-v2").await.unwrap();

        assert_eq!(db.generation_names().await.unwrap(), vec!["quiz-cache-v2".to_string()]);
        assert!(db.has_generation("quiz-cache-v2").await.unwrap());
        assert!(!db.has_generation("quiz-cache-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_generation_names_in_creation_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("b").await.unwrap();
        db.open_generation("a").await.unwrap();
        assert_eq!(db.generation_names().await.unwrap(), vec!["b".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_cascades_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let old = db.open_generation("quiz-cache-v1").await.unwrap();
        old.put(&key("https://quiz.example/eva.webp"), &Response::new(200, vec![], "old"))
            .await
            .unwrap();

        assert!(db.delete_generation("quiz-cache-v1").await.unwrap());
        assert!(!db.delete_generation("quiz-cache-v1").await.unwrap());

        let reopened = db.open_generation("quiz-cache-v1").await.unwrap();
        assert!(reopened.is_empty().await.unwrap());
        assert!(db.match_any(&key("https://quiz.example/eva.webp")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_match_any_prefers_oldest_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let old = db.open_generation("quiz-cache-v1").await.unwrap();
        let current = db.open_generation("quiz-cache-v2").await.unwrap();
        let k = key("https://quiz.example/index.html");

        current.put(&k, &Response::new(200, vec![], "new")).await.unwrap();
        assert_eq!(&db.match_any(&k).await.unwrap().unwrap().response.body[..], b"new");

        old.put(&k, &Response::new(200, vec![], "old")).await.unwrap();
        let hit = db.match_any(&k).await.unwrap().unwrap();
        assert_eq!(hit.generation, "quiz-cache-v1");
        assert_eq!(&hit.response.body[..], b"old");
    }

    #[tokio::test]
    async fn test_put_into_deleted_generation_fails() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let handle = db.open_generation("quiz-cache-v1").await.unwrap();
        db.delete_generation("quiz-cache-v1").await.unwrap();

        let result = handle
            .put(&key("https://quiz.example/a.png"), &Response::new(200, vec![], "x"))
            .await;
        assert!(result.is_err());
    }
}
