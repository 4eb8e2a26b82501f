// src/services/blob_log.rs
//! Append-only JSON array log kept as one object in the object store.
//!
//! Every append reads the whole array, pushes the record in memory and writes
//! the whole array back. In `Overwrite` mode nothing guards that cycle, so two
//! concurrent appends to the same key can lose one record. `Conditional` mode
//! attaches the entity tag observed by the read to the write and reports a
//! conflict instead of clobbering.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::object_store::{ObjectStore, ObjectStoreError, WritePrecondition};

#[derive(Debug, Error)]
pub enum BlobLogError {
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("log '{key}' is not a JSON array of records: {source}")]
    CorruptLog {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("log '{0}' was modified by another writer, retry the request")]
    LogConflict(String),

    #[error("failed to encode log: {0}")]
    Encode(#[source] serde_json::Error),
}

impl From<ObjectStoreError> for BlobLogError {
    fn from(err: ObjectStoreError) -> Self {
        match err {
            ObjectStoreError::Unavailable(msg) => BlobLogError::StorageUnavailable(msg),
            ObjectStoreError::PreconditionFailed(key) => BlobLogError::LogConflict(key),
        }
    }
}

/// How `append` writes the updated array back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Overwrite,
    Conditional,
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "overwrite" => Ok(WriteMode::Overwrite),
            "conditional" => Ok(WriteMode::Conditional),
            other => Err(format!(
                "unknown write mode '{}', expected 'overwrite' or 'conditional'",
                other
            )),
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Overwrite => write!(f, "overwrite"),
            WriteMode::Conditional => write!(f, "conditional"),
        }
    }
}

/// Location of an existing log object and the version that was read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHandle {
    pub key: String,
    pub etag: Option<String>,
}

pub struct BlobLog<T> {
    store: Arc<dyn ObjectStore>,
    write_mode: WriteMode,
    _record: PhantomData<fn() -> T>,
}

impl<T> BlobLog<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn ObjectStore>, write_mode: WriteMode) -> Self {
        info!(write_mode = %write_mode, "Blob log initialized");
        Self {
            store,
            write_mode,
            _record: PhantomData,
        }
    }

    /// Read every record under `key`. A key that was never written yields an
    /// empty list and no handle.
    pub async fn read(&self, key: &str) -> Result<(Vec<T>, Option<ObjectHandle>), BlobLogError> {
        let object = match self.store.get(key).await? {
            Some(object) => object,
            None => {
                debug!(key = %key, "Log absent, treating as empty");
                return Ok((Vec::new(), None));
            }
        };

        let records: Vec<T> =
            serde_json::from_slice(&object.bytes).map_err(|source| BlobLogError::CorruptLog {
                key: key.to_string(),
                source,
            })?;

        debug!(key = %key, count = records.len(), "Read log");
        Ok((
            records,
            Some(ObjectHandle {
                key: key.to_string(),
                etag: object.etag,
            }),
        ))
    }

    /// Append `record` to the log under `key` with one read and one write
    pub async fn append(&self, record: T, key: &str) -> Result<(), BlobLogError> {
        let (mut records, handle) = self.read(key).await?;

        let precondition = match (self.write_mode, &handle) {
            (WriteMode::Overwrite, _) => WritePrecondition::None,
            (WriteMode::Conditional, None) => WritePrecondition::IfAbsent,
            (WriteMode::Conditional, Some(ObjectHandle { etag: Some(etag), .. })) => {
                WritePrecondition::IfMatch(etag.clone())
            }
            (WriteMode::Conditional, Some(ObjectHandle { etag: None, .. })) => {
                warn!(key = %key, "Store returned no entity tag, writing unconditionally");
                WritePrecondition::None
            }
        };
        let handle = handle.unwrap_or_else(|| ObjectHandle {
            key: key.to_string(),
            etag: None,
        });

        records.push(record);
        let body = serde_json::to_vec(&records).map_err(BlobLogError::Encode)?;

        self.store
            .put(&handle.key, Bytes::from(body), precondition)
            .await
            .map_err(|e| {
                if matches!(e, ObjectStoreError::PreconditionFailed(_)) {
                    warn!(key = %key, "Concurrent append detected, write rejected");
                }
                BlobLogError::from(e)
            })?;

        debug!(key = %key, count = records.len(), "Appended record");
        Ok(())
    }
}
