use crate::delta::Delta;
use crate::error::Result;
use crate::note::{Note, NotePatch, NoteStore, DEFAULT_TITLE};
use crate::settings::SettingsPatch;
use crate::storage::KeyValueStore;
use std::collections::HashSet;

/// Cursor range reported by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    pub length: usize,
}

/// What the editor hands back on save.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSnapshot {
    pub content: Delta,
    pub selection: Option<Selection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavedNote {
    pub note: Note,
    /// Selection to restore after the editor reloads the saved content.
    pub restore_selection: Option<Selection>,
}

/// Open tabs and the active note.
///
/// Tabs reference notes by id only. Every change to the tab list is persisted
/// to `settings.openTabs`; the active note is process-local.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabSession {
    open_tabs: Vec<String>,
    active: Option<Note>,
}

impl TabSession {
    /// Restores the persisted tabs, dropping ids whose note no longer exists,
    /// and activates the first remaining tab.
    pub async fn load<S: KeyValueStore>(notes: &NoteStore<S>) -> Result<Self> {
        let stored = notes.repository().get_settings().await?.open_tabs;
        let live: HashSet<String> = notes.list().await?.into_iter().map(|n| n.id).collect();

        let mut seen = HashSet::new();
        let open_tabs: Vec<String> = stored
            .iter()
            .filter(|id| live.contains(*id) && seen.insert(id.as_str()))
            .cloned()
            .collect();

        let mut session = Self {
            open_tabs,
            active: None,
        };
        if session.open_tabs.len() != stored.len() {
            log::info!(
                "dropped {} stale tab(s)",
                stored.len() - session.open_tabs.len()
            );
            session.persist(notes).await?;
        }

        if let Some(first) = session.open_tabs.first().cloned() {
            session.select(notes, &first).await?;
        }
        Ok(session)
    }

    pub fn open_tabs(&self) -> &[String] {
        &self.open_tabs
    }

    pub fn active(&self) -> Option<&Note> {
        self.active.as_ref()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_ref().map(|n| n.id.as_str())
    }

    /// No note is being shown.
    pub fn is_empty(&self) -> bool {
        self.active.is_none()
    }

    /// Adds a tab for `id` if missing and activates it.
    pub async fn open<S: KeyValueStore>(
        &mut self,
        notes: &NoteStore<S>,
        id: &str,
    ) -> Result<Option<&Note>> {
        if !self.open_tabs.iter().any(|t| t == id) {
            self.open_tabs.push(id.to_string());
            self.persist(notes).await?;
        }
        self.select(notes, id).await
    }

    /// Creates an "Untitled" note, opens it in a new tab and activates it.
    pub async fn new_note<S: KeyValueStore>(&mut self, notes: &NoteStore<S>) -> Result<Note> {
        let note = notes.create_untitled().await?;
        self.open_tabs.push(note.id.clone());
        self.persist(notes).await?;
        self.active = Some(note.clone());
        Ok(note)
    }

    /// Activates `id` with a fresh copy from the store. A missing note is
    /// closed instead.
    pub async fn select<S: KeyValueStore>(
        &mut self,
        notes: &NoteStore<S>,
        id: &str,
    ) -> Result<Option<&Note>> {
        match notes.get(id).await? {
            Some(note) => {
                self.active = Some(note);
                Ok(self.active.as_ref())
            }
            None => {
                log::debug!("tab {} points at a deleted note, closing it", id);
                self.close(notes, id).await
            }
        }
    }

    /// Removes the tab. Closing the active tab activates the tab before it, or
    /// the first tab, or nothing when no tabs remain.
    pub async fn close<S: KeyValueStore>(
        &mut self,
        notes: &NoteStore<S>,
        id: &str,
    ) -> Result<Option<&Note>> {
        let index = self.open_tabs.iter().position(|t| t == id);
        if let Some(index) = index {
            self.open_tabs.remove(index);
            self.persist(notes).await?;
        }

        if self.active_id() != Some(id) {
            return Ok(self.active.as_ref());
        }
        self.active = None;
        self.activate_fallback(notes, index).await
    }

    async fn activate_fallback<S: KeyValueStore>(
        &mut self,
        notes: &NoteStore<S>,
        mut closed_index: Option<usize>,
    ) -> Result<Option<&Note>> {
        loop {
            if self.open_tabs.is_empty() {
                self.active = None;
                return Ok(None);
            }

            let candidate_index = closed_index.map_or(0, |i| i.saturating_sub(1));
            let candidate = self.open_tabs[candidate_index].clone();
            if let Some(note) = notes.get(&candidate).await? {
                self.active = Some(note);
                return Ok(self.active.as_ref());
            }

            // The fallback is itself stale: close it under the same rule.
            self.open_tabs.remove(candidate_index);
            self.persist(notes).await?;
            closed_index = Some(candidate_index);
        }
    }

    /// Saves the active note from the editor. A blank title becomes "Untitled".
    ///
    /// Returns `None` when no note is active.
    pub async fn save_active<S: KeyValueStore>(
        &mut self,
        notes: &NoteStore<S>,
        title: &str,
        snapshot: EditorSnapshot,
    ) -> Result<Option<SavedNote>> {
        let Some(id) = self.active_id().map(str::to_string) else {
            return Ok(None);
        };

        let title = match title.trim() {
            "" => DEFAULT_TITLE,
            trimmed => trimmed,
        };
        let patch = NotePatch::title(title).with_content(snapshot.content);
        let note = notes.update(&id, patch).await?;
        self.active = Some(note.clone());

        Ok(Some(SavedNote {
            note,
            restore_selection: snapshot.selection,
        }))
    }

    async fn persist<S: KeyValueStore>(&self, notes: &NoteStore<S>) -> Result<()> {
        notes
            .repository()
            .update_settings(SettingsPatch::open_tabs(self.open_tabs.clone()))
            .await?;
        Ok(())
    }
}
