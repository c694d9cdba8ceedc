use crate::delta::Delta;
use crate::error::{Error, Result};
use crate::projector::{self, ChecklistItem};
use crate::repository::{Collection, DocumentRepository};
use crate::storage::KeyValueStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_TITLE: &str = "Untitled";

/// A persisted note.
///
/// `plain_text` and `checklist_items` are projections of `content`. They are
/// only ever written by [`NoteStore`], together with the content they derive
/// from, and are read through accessors.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: Delta,
    #[serde(default)]
    pub(crate) plain_text: String,
    #[serde(default)]
    pub(crate) checklist_items: Vec<ChecklistItem>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
}

impl Note {
    pub fn plain_text(&self) -> &str {
        &self.plain_text
    }

    pub fn checklist_items(&self) -> &[ChecklistItem] {
        &self.checklist_items
    }

    pub fn has_checklist_items(&self) -> bool {
        !self.checklist_items.is_empty()
    }

    fn set_content(&mut self, content: Delta) {
        self.plain_text = projector::to_plain_text(&content);
        self.checklist_items = projector::extract_checklist_items(&content);
        self.content = content;
    }
}

/// Full replacement of selected fields. Derived fields are not patchable.
#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<Delta>,
    pub is_pinned: Option<bool>,
    pub folder_id: Option<Option<String>>,
}

impl NotePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn content(content: Delta) -> Self {
        Self {
            content: Some(content),
            ..Self::default()
        }
    }

    pub fn pinned(is_pinned: bool) -> Self {
        Self {
            is_pinned: Some(is_pinned),
            ..Self::default()
        }
    }

    pub fn with_content(mut self, content: Delta) -> Self {
        self.content = Some(content);
        self
    }
}

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Time-ordered unique id with a type prefix, e.g. `note_0192…`.
pub(crate) fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::now_v7().simple())
}

fn clean_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::Validation("note title must not be empty".to_string()));
    }
    Ok(title.to_string())
}

fn apply_patch(note: &mut Note, patch: NotePatch) -> Result<()> {
    let title = patch.title.as_deref().map(clean_title).transpose()?;
    if let Some(title) = title {
        note.title = title;
    }
    if let Some(content) = patch.content {
        note.set_content(content);
    }
    if let Some(is_pinned) = patch.is_pinned {
        note.is_pinned = is_pinned;
    }
    if let Some(folder_id) = patch.folder_id {
        note.folder_id = folder_id;
    }
    note.updated_at = now_ms().max(note.updated_at);
    Ok(())
}

/// CRUD over the notes collection.
///
/// Every mutation reads the whole collection, changes it in memory and writes
/// it back while holding the notes lock.
pub struct NoteStore<S> {
    repo: Arc<DocumentRepository<S>>,
}

impl<S> Clone for NoteStore<S> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<S: KeyValueStore> NoteStore<S> {
    pub fn new(repo: Arc<DocumentRepository<S>>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &Arc<DocumentRepository<S>> {
        &self.repo
    }

    pub async fn create(&self, title: &str) -> Result<Note> {
        let title = clean_title(title)?;
        let _guard = self.repo.lock(Collection::Notes).await;
        let mut notes = self.repo.get_notes().await?;

        let now = now_ms();
        let note = Note {
            id: new_id("note"),
            title,
            content: Delta::default(),
            plain_text: String::new(),
            checklist_items: Vec::new(),
            created_at: now,
            updated_at: now,
            is_pinned: false,
            folder_id: None,
        };
        notes.push(note.clone());
        self.repo.write_notes(&notes).await?;

        log::debug!("note created: {}", note.id);
        Ok(note)
    }

    pub async fn create_untitled(&self) -> Result<Note> {
        self.create(DEFAULT_TITLE).await
    }

    /// Merges `patch` into the note, recomputing projections when content is given.
    pub async fn update(&self, id: &str, patch: NotePatch) -> Result<Note> {
        let _guard = self.repo.lock(Collection::Notes).await;
        self.update_locked(id, |_| Ok(patch)).await
    }

    /// Runs under the notes lock; `make_patch` sees the current note.
    async fn update_locked<F>(&self, id: &str, make_patch: F) -> Result<Note>
    where
        F: FnOnce(&Note) -> Result<NotePatch>,
    {
        let mut notes = self.repo.get_notes().await?;
        let note = notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| Error::note_not_found(id))?;

        let patch = make_patch(note)?;
        apply_patch(note, patch)?;
        let updated = note.clone();
        self.repo.write_notes(&notes).await?;

        log::debug!("note updated: {}", id);
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.repo.lock(Collection::Notes).await;
        let mut notes = self.repo.get_notes().await?;
        let before = notes.len();
        notes.retain(|n| n.id != id);
        if notes.len() == before {
            return Err(Error::note_not_found(id));
        }
        self.repo.write_notes(&notes).await?;

        log::debug!("note deleted: {}", id);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Note>> {
        let notes = self.repo.get_notes().await?;
        Ok(notes.into_iter().find(|n| n.id == id))
    }

    /// All notes in insertion order.
    pub async fn list(&self) -> Result<Vec<Note>> {
        self.repo.get_notes().await
    }

    pub async fn toggle_pin(&self, id: &str) -> Result<Note> {
        let _guard = self.repo.lock(Collection::Notes).await;
        self.update_locked(id, |note| Ok(NotePatch::pinned(!note.is_pinned)))
            .await
    }

    pub async fn list_by_folder(&self, folder_id: &str) -> Result<Vec<Note>> {
        let notes = self.repo.get_notes().await?;
        Ok(notes
            .into_iter()
            .filter(|n| n.folder_id.as_deref() == Some(folder_id))
            .collect())
    }

    /// Legacy folder assignment. `None` detaches the note from any folder.
    pub async fn move_to_folder(&self, id: &str, folder_id: Option<String>) -> Result<Note> {
        self.update(
            id,
            NotePatch {
                folder_id: Some(folder_id),
                ..NotePatch::default()
            },
        )
        .await
    }
}
