//! Redis [`HashStore`].
//!
//! Requires a running Redis server. Enable with `--features redis`.

use std::collections::HashMap;

use redis::{Commands, Connection};

use crate::error::{Error, Result};

use super::keyvalue::{Fields, HashStore};
use super::BackendKind;

const BACKEND: &str = "Redis";

/// Synchronous Redis connection used as a hash store.
pub struct RedisStore {
    conn: Connection,
}

impl RedisStore {
    /// Connect to `url`, e.g. `redis://127.0.0.1:6379/0`.
    pub fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| Error::backend(BACKEND, e))?;
        let conn = client
            .get_connection()
            .map_err(|e| Error::backend(BACKEND, e))?;
        Ok(Self { conn })
    }
}

impl HashStore for RedisStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Redis
    }

    fn flush(&mut self) -> Result<()> {
        redis::cmd("FLUSHDB")
            .query::<()>(&mut self.conn)
            .map_err(|e| Error::backend(BACKEND, e))
    }

    fn put_hashes(&mut self, entries: &[(String, Fields)]) -> Result<()> {
        let mut pipe = redis::pipe();
        for (key, fields) in entries {
            pipe.hset_multiple(key, fields.as_slice()).ignore();
        }
        pipe.query::<()>(&mut self.conn)
            .map_err(|e| Error::backend(BACKEND, e))
    }

    fn scan_keys(&mut self, prefix: &str) -> Result<Vec<String>> {
        let pattern = format!("{}*", prefix);
        let keys = self
            .conn
            .scan_match::<_, String>(pattern)
            .map_err(|e| Error::backend(BACKEND, e))?
            .collect();
        Ok(keys)
    }

    fn get_hash(&mut self, key: &str) -> Result<HashMap<String, String>> {
        self.conn
            .hgetall(key)
            .map_err(|e| Error::backend(BACKEND, e))
    }
}
