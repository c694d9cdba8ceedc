use crate::error::{Error, Result};
use crate::note::{Note, NotePatch, NoteStore};
use crate::storage::KeyValueStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum AutosaveEvent {
    Saved(Note),
    Failed { note_id: String, error: Error },
}

struct Pending {
    generation: u64,
    patch: NotePatch,
}

type PendingMap = Arc<Mutex<HashMap<String, Pending>>>;

/// Debounced note writer.
///
/// Each [`schedule`](Autosaver::schedule) replaces the pending patch for that
/// note and restarts its quiescence window. A write happens only once a
/// window elapses without a newer patch, and it carries the latest patch.
/// Outcomes of background writes are sent on the event channel.
pub struct Autosaver<S> {
    notes: NoteStore<S>,
    quiescence: Duration,
    pending: PendingMap,
    generation: Arc<AtomicU64>,
    events: mpsc::UnboundedSender<AutosaveEvent>,
}

fn lock(pending: &PendingMap) -> MutexGuard<'_, HashMap<String, Pending>> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<S: KeyValueStore + 'static> Autosaver<S> {
    pub fn new(
        notes: NoteStore<S>,
        quiescence: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<AutosaveEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let saver = Self {
            notes,
            quiescence,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
            events,
        };
        (saver, rx)
    }

    pub fn quiescence(&self) -> Duration {
        self.quiescence
    }

    /// Queues `patch` for `note_id`, superseding any pending one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, note_id: &str, patch: NotePatch) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        lock(&self.pending).insert(note_id.to_string(), Pending { generation, patch });

        let notes = self.notes.clone();
        let pending = Arc::clone(&self.pending);
        let events = self.events.clone();
        let quiescence = self.quiescence;
        let note_id = note_id.to_string();

        tokio::spawn(async move {
            tokio::time::sleep(quiescence).await;

            let patch = {
                let mut map = lock(&pending);
                let current = map.get(&note_id).map(|entry| entry.generation);
                if current == Some(generation) {
                    map.remove(&note_id).map(|entry| entry.patch)
                } else {
                    None
                }
            };
            let Some(patch) = patch else {
                return;
            };

            match commit(&notes, &events, &note_id, patch).await {
                Ok(_) => {}
                Err(error) => {
                    log::warn!("autosave of {} failed: {}", note_id, error);
                    let _ = events.send(AutosaveEvent::Failed { note_id, error });
                }
            }
        });
    }

    pub fn is_pending(&self, note_id: &str) -> bool {
        lock(&self.pending).contains_key(note_id)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Writes every pending patch now, returning the first failure if any.
    pub async fn flush(&self) -> Result<Vec<Note>> {
        let drained: Vec<(String, Pending)> = lock(&self.pending).drain().collect();
        let mut saved = Vec::with_capacity(drained.len());
        let mut first_error = None;
        for (note_id, entry) in drained {
            match commit(&self.notes, &self.events, &note_id, entry.patch).await {
                Ok(note) => saved.push(note),
                Err(error) => {
                    log::warn!("flush of {} failed: {}", note_id, error);
                    first_error.get_or_insert(error);
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(saved),
        }
    }
}

async fn commit<S: KeyValueStore>(
    notes: &NoteStore<S>,
    events: &mpsc::UnboundedSender<AutosaveEvent>,
    note_id: &str,
    patch: NotePatch,
) -> Result<Note> {
    let note = notes.update(note_id, patch).await?;
    log::debug!("autosaved {}", note_id);
    let _ = events.send(AutosaveEvent::Saved(note.clone()));
    Ok(note)
}
