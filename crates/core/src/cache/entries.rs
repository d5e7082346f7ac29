//! Entry put/match operations within a generation.
//!
//! A put is a single UPSERT of a complete response, so concurrent writes to
//! the same key are last-write-wins and never leave a partial entry.

use serde::Serialize;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::generations::CacheHandle;
use super::key::RequestKey;
use crate::request::{Response, ResponseType};
use crate::Error;

/// A response read back from the store, with the identity it was stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub generation: String,
    pub key: RequestKey,
    pub response: Response,
    pub stored_at: String,
}

/// Listing row for an entry, without the body.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct EntrySummary {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub response_type: ResponseType,
    pub body_bytes: u64,
    pub stored_at: String,
}

/// Columns as SQLite hands them back, before decoding.
pub(crate) struct RawEntry {
    pub generation: String,
    pub method: String,
    pub url: String,
    pub status: i64,
    pub response_type: String,
    pub headers_json: String,
    pub body: Vec<u8>,
    pub stored_at: String,
}

pub(crate) const ENTRY_COLUMNS: &str =
    "generation, method, url, status, response_type, headers_json, body, stored_at";

fn decode_status(status: i64) -> Result<u16, Error> {
    u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("status out of range: {status}")))
}

impl RawEntry {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            generation: row.get(0)?,
            method: row.get(1)?,
            url: row.get(2)?,
            status: row.get(3)?,
            response_type: row.get(4)?,
            headers_json: row.get(5)?,
            body: row.get(6)?,
            stored_at: row.get(7)?,
        })
    }

    pub(crate) fn decode(self) -> Result<StoredEntry, Error> {
        let status = decode_status(self.status)?;
        let response_type = self.response_type.parse::<ResponseType>()?;
        let headers: Vec<(String, String)> =
            serde_json::from_str(&self.headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;

        Ok(StoredEntry {
            generation: self.generation,
            key: RequestKey { method: self.method, url: self.url },
            response: Response { status, headers, body: self.body.into(), response_type },
            stored_at: self.stored_at,
        })
    }
}

impl CacheHandle {
    /// Store `response` under `key` in this generation, replacing any
    /// previous entry for the same key.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedRequest` for non-GET keys, or a database
    /// error if the generation was deleted underneath this handle.
    pub async fn put(&self, key: &RequestKey, response: &Response) -> Result<(), Error> {
        if key.method != "GET" {
            return Err(Error::UnsupportedRequest(format!("cannot cache {key}: only GET requests are cacheable")));
        }

        let generation = self.name.clone();
        let key_hash = key.digest();
        let method = key.method.clone();
        let url = key.url.clone();
        let status = i64::from(response.status);
        let response_type = response.response_type.as_str();
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let body = response.body.to_vec();
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (
                    generation, key_hash, method, url, status, response_type,
                    headers_json, body, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(generation, key_hash) DO UPDATE SET
                    method = excluded.method,
                    url = excluded.url,
                    status = excluded.status,
                    response_type = excluded.response_type,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at",
                    params![generation, key_hash, method, url, status, response_type, headers_json, body, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look `key` up in this generation only.
    ///
    /// Returns None if no entry exists.
    pub async fn match_key(&self, key: &RequestKey) -> Result<Option<StoredEntry>, Error> {
        let generation = self.name.clone();
        let key_hash = key.digest();
        let raw = self
            .db
            .conn
            .call(move |conn| -> Result<Option<RawEntry>, Error> {
                let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE generation = ?1 AND key_hash = ?2");
                let result = conn.query_row(&sql, params![generation, key_hash], RawEntry::from_row);

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

    /// Entries in this generation, oldest write first, without bodies.
    pub async fn entries(&self) -> Result<Vec<EntrySummary>, Error> {
        let generation = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<EntrySummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, response_type, LENGTH(body), stored_at
                     FROM entries WHERE generation = ?1 ORDER BY stored_at ASC, rowid ASC",
                )?;
                let rows = stmt.query_map(params![generation], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                })?;

                let mut out = Vec::new();
                for row in rows {
                    let (method, url, status, response_type, body_bytes, stored_at) = row?;
                    out.push(EntrySummary {
                        method,
                        url,
                        status: decode_status(status)?,
                        response_type: response_type.parse()?,
                        body_bytes: u64::try_from(body_bytes)
                            .map_err(|_| Error::CorruptEntry(format!("negative body length: {body_bytes}")))?,
                        stored_at,
                    });
                }
                Ok(out)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in this generation.
    pub async fn len(&self) -> Result<u64, Error> {
        let generation = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE generation = ?1", params![generation], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheDb;

    fn key(url: &str) -> RequestKey {
        RequestKey::for_url(url, None).unwrap()
    }

    fn webp(body: &'static str) -> Response {
        Response::new(200, vec![("content-type".into(), "image/webp".into())], body)
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_generation("quiz-cache-v2").await.unwrap();

        cache.put(&key("https://quiz.example/eva.webp"), &webp("eva")).await.unwrap();

        let entry = cache.match_key(&key("https://quiz.example/eva.webp")).await.unwrap().unwrap();
        assert_eq!(entry.generation, "quiz-cache-v2");
        assert_eq!(entry.response.status, 200);
        assert_eq!(entry.response.content_type(), Some("image/webp"));
        assert_eq!(&entry.response.body[..], b"eva");
        assert_eq!(entry.key.url, "https://quiz.example/eva.webp");
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_generation("quiz-cache-v2").await.unwrap();
        let result = cache.match_key(&key("https://quiz.example/missing.png")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_generation("quiz-cache-v2").await.unwrap();
        let k = key("https://quiz.example/lisa.webp");

        cache.put(&k, &webp("first")).await.unwrap();
        cache.put(&k, &webp("second")).await.unwrap();

        assert_eq!(cache.len().await.unwrap(), 1);
        let entry = cache.match_key(&k).await.unwrap().unwrap();
        assert_eq!(&entry.response.body[..], b"second");
    }

    #[tokio::test]
    async fn test_put_rejects_non_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_generation("quiz-cache-v2").await.unwrap();
        let k = RequestKey { method: "POST".into(), url: "https://quiz.example/api/answer".into() };

        let result = cache.put(&k, &webp("x")).await;
        assert!(matches!(result, Err(Error::UnsupportedRequest(_))));
        assert_eq!(cache.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_opaque_round_trip() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_generation("quiz-cache-v2").await.unwrap();
        let k = key("https://cdn.example.com/VID1-FUNIL.webm");

        cache.put(&k, &Response::opaque("video-bytes")).await.unwrap();

        let entry = cache.match_key(&k).await.unwrap().unwrap();
        assert!(entry.response.is_opaque());
        assert_eq!(entry.response.status, 0);
        assert!(entry.response.headers.is_empty());
    }

    #[tokio::test]
    async fn test_entries_listing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_generation("quiz-cache-v2").await.unwrap();
        cache.put(&key("https://quiz.example/a.png"), &webp("aaaa")).await.unwrap();

        let entries = cache.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://quiz.example/a.png");
        assert_eq!(entries[0].body_bytes, 4);
        assert_eq!(entries[0].response_type, ResponseType::Basic);
    }

    #[tokio::test]
    async fn test_entries_listing_rejects_corrupt_status() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_generation("quiz-cache-v2").await.unwrap();
        let k = key("https://quiz.example/broken.png");
        cache.put(&k, &webp("x")).await.unwrap();

        let key_hash = k.digest();
        db.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("UPDATE entries SET status = 70000 WHERE key_hash = ?1", params![key_hash])?;
                Ok(())
            })
            .await
            .unwrap();

        assert!(matches!(cache.entries().await, Err(Error::CorruptEntry(_))));
        assert!(matches!(cache.match_key(&k).await, Err(Error::CorruptEntry(_))));
    }
}
