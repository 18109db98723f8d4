//! [`CacheStore`] operations for the SQLite backend.
//!
//! Generations live in the `generations` table; their entries cascade on
//! delete. Writes are UPSERTs so concurrent puts for the same key resolve
//! as last-write-wins.

use async_trait::async_trait;
use tokio_rusqlite::{params, rusqlite};

use super::connection::SqliteCacheStore;
use super::{CacheHandle, CacheStore, Snapshot};
use crate::Error;

const ENSURE_GENERATION: &str = "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)";

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn open(&self, name: &str) -> Result<CacheHandle, Error> {
        let name = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        let handle = CacheHandle::new(name.clone());
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(ENSURE_GENERATION, params![name, created_at])?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;
        Ok(handle)
    }

    async fn get(&self, cache: &CacheHandle, key: &str) -> Result<Option<Snapshot>, Error> {
        let generation = cache.name().to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Snapshot>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, status_text, headers_json, body, stored_at
                     FROM entries WHERE generation = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![generation, key], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u16>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                });

                match result {
                    Ok((url, status, status_text, headers_json, body, stored_at)) => Ok(Some(Snapshot {
                        url,
                        status,
                        status_text,
                        headers: serde_json::from_str(&headers_json)?,
                        body,
                        stored_at,
                    })),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, cache: &CacheHandle, key: &str, snapshot: &Snapshot) -> Result<(), Error> {
        let generation = cache.name().to_string();
        let key = key.to_string();
        let headers_json = serde_json::to_string(&snapshot.headers)?;
        let snapshot = snapshot.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                // A put racing a delete of the same generation recreates it.
                tx.execute(ENSURE_GENERATION, params![generation, snapshot.stored_at])?;
                tx.execute(
                    "INSERT INTO entries (generation, key, url, status, status_text, headers_json, body, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(generation, key) DO UPDATE SET
                        url = excluded.url,
                        status = excluded.status,
                        status_text = excluded.status_text,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        generation,
                        key,
                        snapshot.url,
                        snapshot.status,
                        snapshot.status_text,
                        headers_json,
                        snapshot.body,
                        snapshot.stored_at,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self, cache: &CacheHandle) -> Result<Vec<String>, Error> {
        let generation = cache.name().to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT key FROM entries WHERE generation = ?1 ORDER BY key")?;
                let keys = stmt
                    .query_map(params![generation], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    async fn list_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY id")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}
