use crate::autosave::{AutosaveEvent, Autosaver};
use crate::config::Config;
use crate::error::Result;
use crate::folder::FolderStore;
use crate::note::{Note, NoteStore};
use crate::repository::{DocumentRepository, StorageUsage};
use crate::search::{self, AdvancedSearchOptions, SearchIndex};
use crate::session::TabSession;
use crate::storage::{KeyValueStore, OpendalStore};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Entry point wiring the stores over one repository.
pub struct Notebook<S> {
    config: Config,
    repo: Arc<DocumentRepository<S>>,
    notes: NoteStore<S>,
    folders: FolderStore<S>,
}

impl Notebook<OpendalStore> {
    /// Opens the store named by `config.storage` and initializes it on first run.
    pub async fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let store = OpendalStore::from_config(&config.storage)?;
        Self::with_store(store, config).await
    }
}

impl<S: KeyValueStore + 'static> Notebook<S> {
    pub async fn with_store(store: S, config: Config) -> Result<Self> {
        let repo = Arc::new(DocumentRepository::with_config(store, &config));
        repo.initialize_defaults().await?;
        Ok(Self {
            notes: NoteStore::new(Arc::clone(&repo)),
            folders: FolderStore::new(Arc::clone(&repo)),
            repo,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn repository(&self) -> &Arc<DocumentRepository<S>> {
        &self.repo
    }

    pub fn notes(&self) -> &NoteStore<S> {
        &self.notes
    }

    pub fn folders(&self) -> &FolderStore<S> {
        &self.folders
    }

    pub async fn load_session(&self) -> Result<TabSession> {
        TabSession::load(&self.notes).await
    }

    /// Debounced writer using the configured quiescence window.
    pub fn autosaver(&self) -> (Autosaver<S>, mpsc::UnboundedReceiver<AutosaveEvent>) {
        Autosaver::new(self.notes.clone(), self.config.quiescence())
    }

    /// Substring search over the current notes, with a freshly built index.
    pub async fn search(&self, query: &str) -> Result<Vec<Note>> {
        let notes = self.notes.list().await?;
        let index = SearchIndex::build(&notes);
        Ok(search::search(query, &notes, Some(&index))
            .into_iter()
            .cloned()
            .collect())
    }

    pub async fn suggest(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let notes = self.notes.list().await?;
        Ok(search::suggest(query, &notes, limit))
    }

    pub async fn advanced_search(&self, options: &AdvancedSearchOptions) -> Result<Vec<Note>> {
        search::advanced_search(&self.repo, options).await
    }

    pub async fn storage_usage(&self) -> Result<StorageUsage> {
        self.repo.storage_usage().await
    }
}
