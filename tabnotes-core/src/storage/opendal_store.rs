use super::{operator_from_uri, record_size, KeyValueStore, Record};
use crate::config::StorageConfig;
use crate::error::Result;
use opendal::{ErrorKind, Operator};
use tokio::sync::Mutex;

/// [`KeyValueStore`] persisting the whole namespace as one JSON object.
///
/// Every `set` loads the object, replaces the given top-level keys and writes
/// it back in a single `write`, so keys written together become visible
/// together. The internal lock only serializes this store's own
/// load-merge-write; it does not make a caller's read-modify-write atomic.
pub struct OpendalStore {
    op: Operator,
    path: String,
    write_lock: Mutex<()>,
}

impl OpendalStore {
    pub fn new(op: Operator, path: impl Into<String>) -> Self {
        Self {
            op,
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let op = operator_from_uri(&config.uri)?;
        Ok(Self::new(op, config.path.clone()))
    }

    pub fn operator(&self) -> &Operator {
        &self.op
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    async fn load(&self) -> Result<Record> {
        match self.op.read(&self.path).await {
            Ok(buf) => {
                let bytes = buf.to_vec();
                if bytes.is_empty() {
                    return Ok(Record::new());
                }
                Ok(serde_json::from_slice(&bytes)?)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Record::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn persist(&self, record: &Record) -> Result<()> {
        let bytes = serde_json::to_vec(record)?;
        self.op.write(&self.path, bytes).await?;
        Ok(())
    }
}

impl KeyValueStore for OpendalStore {
    async fn get(&self, keys: Option<&[&str]>) -> Result<Record> {
        let mut record = self.load().await?;
        if let Some(keys) = keys {
            record.retain(|key, _| keys.iter().any(|k| *k == key.as_str()));
        }
        Ok(record)
    }

    async fn set(&self, items: Record) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load().await?;
        for (key, value) in items {
            record.insert(key, value);
        }
        self.persist(&record).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load().await?;
        let before = record.len();
        record.retain(|key, _| !keys.iter().any(|k| *k == key.as_str()));
        if record.len() == before {
            return Ok(());
        }
        self.persist(&record).await
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.op.delete(&self.path).await?;
        Ok(())
    }

    async fn bytes_in_use(&self, keys: Option<&[&str]>) -> Result<u64> {
        let record = self.load().await?;
        record_size(&record, keys)
    }
}
