use opendal::services::Memory;
use opendal::Operator;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tabnotes_core::{
    DocumentRepository, Error, FolderStore, KeyValueStore, NoteStore, OpendalStore, Record, Result,
};

#[allow(dead_code)]
pub fn setup_operator() -> anyhow::Result<Operator> {
    let builder = Memory::default();
    let op = Operator::new(builder)?.finish();
    Ok(op)
}

#[allow(dead_code)]
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub fn memory_store() -> anyhow::Result<OpendalStore> {
    init_logging();
    Ok(OpendalStore::new(setup_operator()?, "storage.json"))
}

#[allow(dead_code)]
pub async fn setup_repo() -> anyhow::Result<Arc<DocumentRepository<OpendalStore>>> {
    let repo = Arc::new(DocumentRepository::new(memory_store()?));
    repo.initialize_defaults().await?;
    Ok(repo)
}

#[allow(dead_code)]
pub async fn setup_stores() -> anyhow::Result<(NoteStore<OpendalStore>, FolderStore<OpendalStore>)> {
    let repo = setup_repo().await?;
    Ok((NoteStore::new(Arc::clone(&repo)), FolderStore::new(repo)))
}

fn unavailable() -> Error {
    Error::StoreUnavailable(opendal::Error::new(
        opendal::ErrorKind::Unexpected,
        "storage quota exceeded",
    ))
}

/// Rejects every operation.
#[allow(dead_code)]
pub struct UnavailableStore;

impl KeyValueStore for UnavailableStore {
    async fn get(&self, _keys: Option<&[&str]>) -> Result<Record> {
        Err(unavailable())
    }

    async fn set(&self, _items: Record) -> Result<()> {
        Err(unavailable())
    }

    async fn remove(&self, _keys: &[&str]) -> Result<()> {
        Err(unavailable())
    }

    async fn clear(&self) -> Result<()> {
        Err(unavailable())
    }

    async fn bytes_in_use(&self, _keys: Option<&[&str]>) -> Result<u64> {
        Err(unavailable())
    }
}

/// Counts `set` calls on top of a real store.
#[allow(dead_code)]
pub struct CountingStore {
    pub inner: OpendalStore,
    pub sets: AtomicUsize,
}

#[allow(dead_code)]
impl CountingStore {
    pub fn new(inner: OpendalStore) -> Self {
        Self {
            inner,
            sets: AtomicUsize::new(0),
        }
    }

    pub fn set_calls(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for CountingStore {
    async fn get(&self, keys: Option<&[&str]>) -> Result<Record> {
        self.inner.get(keys).await
    }

    async fn set(&self, items: Record) -> Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(items).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        self.inner.remove(keys).await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }

    async fn bytes_in_use(&self, keys: Option<&[&str]>) -> Result<u64> {
        self.inner.bytes_in_use(keys).await
    }
}

/// Delays every `get` so interleaved read-modify-writes overlap.
#[allow(dead_code)]
pub struct SlowStore {
    pub inner: OpendalStore,
    pub read_delay: Duration,
}

#[allow(dead_code)]
impl SlowStore {
    pub fn new(inner: OpendalStore, read_delay: Duration) -> Self {
        Self { inner, read_delay }
    }
}

impl KeyValueStore for SlowStore {
    async fn get(&self, keys: Option<&[&str]>) -> Result<Record> {
        tokio::time::sleep(self.read_delay).await;
        self.inner.get(keys).await
    }

    async fn set(&self, items: Record) -> Result<()> {
        self.inner.set(items).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        self.inner.remove(keys).await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }

    async fn bytes_in_use(&self, keys: Option<&[&str]>) -> Result<u64> {
        self.inner.bytes_in_use(keys).await
    }
}
