use crate::config::{Config, STORAGE_CAPACITY_BYTES, STORAGE_WARNING_PERCENT};
use crate::error::Result;
use crate::folder::Folder;
use crate::note::Note;
use crate::settings::{Settings, SettingsPatch};
use crate::storage::{KeyValueStore, Record};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};

pub const STORE_VERSION: &str = "1.0.0";

pub const KEY_VERSION: &str = "version";
pub const KEY_SETTINGS: &str = "settings";
pub const KEY_FOLDERS: &str = "folders";
pub const KEY_NOTES: &str = "notes";

pub const DEFAULT_FOLDER_NAME: &str = "My Notes";
pub const DEFAULT_FOLDER_COLOR: &str = "#4A90E2";

const USAGE_WARNING_MESSAGE: &str =
    "Storage usage is above the warning threshold. Consider exporting and clearing old data.";

/// Top-level collections of the store root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Settings,
    Folders,
    Notes,
}

impl Collection {
    pub fn key(self) -> &'static str {
        match self {
            Collection::Settings => KEY_SETTINGS,
            Collection::Folders => KEY_FOLDERS,
            Collection::Notes => KEY_NOTES,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageUsage {
    pub bytes_used: u64,
    pub percentage_of_limit: f64,
    pub warning: bool,
    pub message: Option<String>,
}

/// Typed access to the `{version, settings, folders, notes}` root.
///
/// Each collection has its own mutation lock. Read-modify-write sequences
/// hold the lock of every collection they write, taken in the order
/// settings, folders, notes.
pub struct DocumentRepository<S> {
    store: S,
    settings_lock: Mutex<()>,
    folders_lock: Mutex<()>,
    notes_lock: Mutex<()>,
    capacity_bytes: u64,
    warning_percent: f64,
}

impl<S: KeyValueStore> DocumentRepository<S> {
    pub fn new(store: S) -> Self {
        Self::with_limits(store, STORAGE_CAPACITY_BYTES, STORAGE_WARNING_PERCENT)
    }

    pub fn with_config(store: S, config: &Config) -> Self {
        Self::with_limits(
            store,
            config.storage_capacity_bytes,
            config.storage_warning_percent,
        )
    }

    pub fn with_limits(store: S, capacity_bytes: u64, warning_percent: f64) -> Self {
        Self {
            store,
            settings_lock: Mutex::new(()),
            folders_lock: Mutex::new(()),
            notes_lock: Mutex::new(()),
            capacity_bytes,
            warning_percent,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub(crate) async fn lock(&self, collection: Collection) -> MutexGuard<'_, ()> {
        match collection {
            Collection::Settings => self.settings_lock.lock().await,
            Collection::Folders => self.folders_lock.lock().await,
            Collection::Notes => self.notes_lock.lock().await,
        }
    }

    pub async fn version(&self) -> Result<Option<String>> {
        let record = self.store.get(Some(&[KEY_VERSION])).await?;
        Ok(record
            .get(KEY_VERSION)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Writes the default root in one `set` unless a version is already present.
    ///
    /// Returns `true` when defaults were written.
    pub async fn initialize_defaults(&self) -> Result<bool> {
        let _settings = self.lock(Collection::Settings).await;
        let _folders = self.lock(Collection::Folders).await;
        let _notes = self.lock(Collection::Notes).await;

        if let Some(version) = self.version().await? {
            log::debug!("storage already initialized with version {}", version);
            return Ok(false);
        }

        let now = crate::note::now_ms();
        let folder = Folder {
            id: crate::note::new_id("folder"),
            name: DEFAULT_FOLDER_NAME.to_string(),
            color: DEFAULT_FOLDER_COLOR.to_string(),
            created_at: now,
            updated_at: now,
            note_count: 0,
        };

        let mut root = Record::new();
        root.insert(KEY_VERSION.to_string(), Value::from(STORE_VERSION));
        root.insert(
            KEY_SETTINGS.to_string(),
            serde_json::to_value(Settings::default())?,
        );
        root.insert(KEY_FOLDERS.to_string(), serde_json::to_value(vec![folder])?);
        root.insert(KEY_NOTES.to_string(), Value::Array(Vec::new()));
        self.store.set(root).await?;

        log::info!("storage initialized with defaults (version {})", STORE_VERSION);
        Ok(true)
    }

    async fn read_key<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        let mut record = self.store.get(Some(&[key])).await?;
        match record.remove(key) {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    pub async fn get_notes(&self) -> Result<Vec<Note>> {
        self.read_key(KEY_NOTES).await
    }

    pub async fn get_folders(&self) -> Result<Vec<Folder>> {
        self.read_key(KEY_FOLDERS).await
    }

    pub async fn get_settings(&self) -> Result<Settings> {
        self.read_key(KEY_SETTINGS).await
    }

    pub(crate) async fn write_notes(&self, notes: &[Note]) -> Result<()> {
        let mut record = Record::new();
        record.insert(KEY_NOTES.to_string(), serde_json::to_value(notes)?);
        self.store.set(record).await
    }

    pub(crate) async fn write_folders(&self, folders: &[Folder]) -> Result<()> {
        let mut record = Record::new();
        record.insert(KEY_FOLDERS.to_string(), serde_json::to_value(folders)?);
        self.store.set(record).await
    }

    /// Both collections in a single `set`.
    pub(crate) async fn write_folders_and_notes(
        &self,
        folders: &[Folder],
        notes: &[Note],
    ) -> Result<()> {
        let mut record = Record::new();
        record.insert(KEY_FOLDERS.to_string(), serde_json::to_value(folders)?);
        record.insert(KEY_NOTES.to_string(), serde_json::to_value(notes)?);
        self.store.set(record).await
    }

    /// Read, merge and write back the settings key.
    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings> {
        self.modify_settings(|settings| {
            patch.apply(settings);
            Ok(())
        })
        .await
    }

    /// Runs `change` on the current settings and writes the result, all under
    /// the settings lock. Nothing is written if `change` fails.
    pub async fn modify_settings<F>(&self, change: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings) -> Result<()>,
    {
        let _guard = self.lock(Collection::Settings).await;
        let mut settings = self.get_settings().await?;
        change(&mut settings)?;

        let mut record = Record::new();
        record.insert(KEY_SETTINGS.to_string(), serde_json::to_value(&settings)?);
        self.store.set(record).await?;
        Ok(settings)
    }

    /// Usage against the configured ceiling. Advisory only; writes are never refused.
    ///
    /// `percentage_of_limit` is rounded to two decimals for display; the
    /// warning is decided on the unrounded value.
    pub async fn storage_usage(&self) -> Result<StorageUsage> {
        let bytes_used = self.store.bytes_in_use(None).await?;
        let raw = bytes_used as f64 / self.capacity_bytes as f64 * 100.0;
        let percentage_of_limit = (raw * 100.0).round() / 100.0;
        let warning = raw > self.warning_percent;
        if warning {
            log::warn!(
                "storage usage at {:.2}% of {} bytes",
                percentage_of_limit,
                self.capacity_bytes
            );
        }

        Ok(StorageUsage {
            bytes_used,
            percentage_of_limit,
            warning,
            message: warning.then(|| USAGE_WARNING_MESSAGE.to_string()),
        })
    }
}
