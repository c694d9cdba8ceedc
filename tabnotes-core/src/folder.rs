use crate::error::{Error, Result};
use crate::note::{new_id, now_ms};
use crate::repository::{Collection, DocumentRepository, DEFAULT_FOLDER_COLOR};
use crate::storage::KeyValueStore;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub color: String,
    pub created_at: i64,
    pub updated_at: i64,
    /// Cached count, refreshed only by [`FolderStore::update_note_count`].
    #[serde(default)]
    pub note_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FolderPatch {
    pub name: Option<String>,
    pub color: Option<String>,
}

fn color_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("static color pattern")
    })
}

pub(crate) fn validate_color(color: &str) -> Result<()> {
    if color_pattern().is_match(color) {
        Ok(())
    } else {
        Err(Error::Validation(format!("invalid color: {}", color)))
    }
}

fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("folder name must not be empty".to_string()));
    }
    Ok(name.to_string())
}

pub struct FolderStore<S> {
    repo: Arc<DocumentRepository<S>>,
}

impl<S> Clone for FolderStore<S> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<S: KeyValueStore> FolderStore<S> {
    pub fn new(repo: Arc<DocumentRepository<S>>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, name: &str, color: Option<&str>) -> Result<Folder> {
        let name = clean_name(name)?;
        let color = color.unwrap_or(DEFAULT_FOLDER_COLOR);
        validate_color(color)?;

        let _guard = self.repo.lock(Collection::Folders).await;
        let mut folders = self.repo.get_folders().await?;
        let now = now_ms();
        let folder = Folder {
            id: new_id("folder"),
            name,
            color: color.to_string(),
            created_at: now,
            updated_at: now,
            note_count: 0,
        };
        folders.push(folder.clone());
        self.repo.write_folders(&folders).await?;

        log::debug!("folder created: {}", folder.id);
        Ok(folder)
    }

    pub async fn update(&self, id: &str, patch: FolderPatch) -> Result<Folder> {
        let name = patch.name.as_deref().map(clean_name).transpose()?;
        if let Some(color) = patch.color.as_deref() {
            validate_color(color)?;
        }

        let _guard = self.repo.lock(Collection::Folders).await;
        let mut folders = self.repo.get_folders().await?;
        let folder = folders
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| Error::folder_not_found(id))?;

        if let Some(name) = name {
            folder.name = name;
        }
        if let Some(color) = patch.color {
            folder.color = color;
        }
        folder.updated_at = now_ms().max(folder.updated_at);
        let updated = folder.clone();
        self.repo.write_folders(&folders).await?;

        log::debug!("folder updated: {}", id);
        Ok(updated)
    }

    /// Removes the folder and every note filed under it in one combined write.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let _folders_guard = self.repo.lock(Collection::Folders).await;
        let _notes_guard = self.repo.lock(Collection::Notes).await;

        let mut folders = self.repo.get_folders().await?;
        let before = folders.len();
        folders.retain(|f| f.id != id);
        if folders.len() == before {
            return Err(Error::folder_not_found(id));
        }

        let mut notes = self.repo.get_notes().await?;
        let notes_before = notes.len();
        notes.retain(|n| n.folder_id.as_deref() != Some(id));

        self.repo.write_folders_and_notes(&folders, &notes).await?;
        log::info!(
            "folder deleted: {} ({} notes removed)",
            id,
            notes_before - notes.len()
        );
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Folder>> {
        let folders = self.repo.get_folders().await?;
        Ok(folders.into_iter().find(|f| f.id == id))
    }

    pub async fn list(&self) -> Result<Vec<Folder>> {
        self.repo.get_folders().await
    }

    /// Recounts live notes referencing the folder and stores the result.
    pub async fn update_note_count(&self, id: &str) -> Result<Folder> {
        let _guard = self.repo.lock(Collection::Folders).await;
        let count = self
            .repo
            .get_notes()
            .await?
            .iter()
            .filter(|n| n.folder_id.as_deref() == Some(id))
            .count();

        let mut folders = self.repo.get_folders().await?;
        let folder = folders
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| Error::folder_not_found(id))?;
        folder.note_count = count;
        folder.updated_at = now_ms().max(folder.updated_at);
        let updated = folder.clone();
        self.repo.write_folders(&folders).await?;
        Ok(updated)
    }
}
