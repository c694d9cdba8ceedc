use crate::error::{Error, Result};
use opendal::Operator;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, OnceLock};

mod opendal_store;

pub use opendal_store::OpendalStore;

/// A flat namespace of named JSON records.
pub type Record = Map<String, Value>;

/// Asynchronous key-value store with top-level-key merge semantics.
///
/// `set` replaces each given key wholesale; there is no deep merge and no
/// atomicity across separate calls. Callers own their read-modify-write.
pub trait KeyValueStore: Send + Sync {
    /// Returns the selected keys that are present, or the whole namespace for `None`.
    fn get(&self, keys: Option<&[&str]>) -> impl Future<Output = Result<Record>> + Send;

    fn set(&self, items: Record) -> impl Future<Output = Result<()>> + Send;

    fn remove(&self, keys: &[&str]) -> impl Future<Output = Result<()>> + Send;

    fn clear(&self) -> impl Future<Output = Result<()>> + Send;

    fn bytes_in_use(&self, keys: Option<&[&str]>) -> impl Future<Output = Result<u64>> + Send;
}

static MEMORY_OPERATORS: OnceLock<Mutex<HashMap<String, Operator>>> = OnceLock::new();

fn memory_cache() -> &'static Mutex<HashMap<String, Operator>> {
    MEMORY_OPERATORS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn build_operator(uri: &str) -> Result<Operator> {
    Operator::from_uri(uri)
        .map_err(|e| Error::Validation(format!("Invalid storage URI {}: {}", uri, e)))
}

/// Creates an OpenDAL Operator from a URI string.
///
/// Supported schemes:
/// - memory://name -> in-memory, shared by every caller using the same URI
/// - file:///path/to/dir -> local filesystem
///
/// Any other scheme is rejected as invalid input.
pub fn operator_from_uri(uri: &str) -> Result<Operator> {
    if uri.starts_with("memory://") {
        let mut cache = memory_cache()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(op) = cache.get(uri) {
            return Ok(op.clone());
        }
        let op = build_operator(uri)?;
        cache.insert(uri.to_string(), op.clone());
        return Ok(op);
    }

    build_operator(uri)
}

/// Browser-storage style accounting: key length plus serialized value length.
pub(crate) fn record_size(record: &Record, keys: Option<&[&str]>) -> Result<u64> {
    let mut total = 0u64;
    for (key, value) in record {
        if let Some(selected) = keys {
            if !selected.iter().any(|k| *k == key.as_str()) {
                continue;
            }
        }
        total += key.len() as u64;
        total += serde_json::to_string(value)?.len() as u64;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unsupported_scheme_is_rejected() {
        let err = operator_from_uri("s3://bucket/root").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn memory_uri_shares_operator() {
        let a = operator_from_uri("memory://shared-test").unwrap();
        let b = operator_from_uri("memory://shared-test").unwrap();
        a.write("probe", vec![1u8, 2, 3]).await.unwrap();
        assert_eq!(b.read("probe").await.unwrap().to_vec(), vec![1u8, 2, 3]);
    }

    #[tokio::test]
    async fn file_uri_uses_local_filesystem() {
        let dir = std::env::temp_dir().join(format!("tabnotes-fs-{}", std::process::id()));
        let uri = format!("file://{}", dir.display());
        let op = operator_from_uri(&uri).unwrap();
        op.write("storage.json", b"{}".to_vec()).await.unwrap();
        assert!(dir.join("storage.json").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn record_size_counts_selected_keys() {
        let mut record = Record::new();
        record.insert("version".into(), json!("1.0.0"));
        record.insert("notes".into(), json!([]));
        // "version" + "\"1.0.0\""
        assert_eq!(record_size(&record, Some(&["version"])).unwrap(), 7 + 7);
        assert_eq!(record_size(&record, None).unwrap(), 7 + 7 + 5 + 2);
        assert_eq!(record_size(&record, Some(&["missing"])).unwrap(), 0);
    }
}
