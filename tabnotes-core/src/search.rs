use crate::error::Result;
use crate::note::Note;
use crate::repository::DocumentRepository;
use crate::storage::KeyValueStore;
use regex::RegexBuilder;
use std::collections::HashMap;

pub const HIGHLIGHT_OPEN: &str = "<mark>";
pub const HIGHLIGHT_CLOSE: &str = "</mark>";
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub title: String,
    pub content: String,
}

/// Lowercased title and plain text per note id. Rebuilt in memory, never persisted.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    entries: HashMap<String, IndexEntry>,
}

impl SearchIndex {
    pub fn build<'a>(notes: impl IntoIterator<Item = &'a Note>) -> Self {
        let entries = notes
            .into_iter()
            .map(|note| {
                (
                    note.id.clone(),
                    IndexEntry {
                        title: note.title.to_lowercase(),
                        content: note.plain_text().to_lowercase(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `needle` must already be lowercased.
    fn matches(&self, id: &str, needle: &str) -> bool {
        self.entries
            .get(id)
            .is_some_and(|entry| entry.title.contains(needle) || entry.content.contains(needle))
    }
}

/// Notes whose title or plain text contains `query`, case-insensitively.
///
/// A blank query returns every note in input order. Notes missing from a
/// supplied `index` never match.
pub fn search<'a>(query: &str, notes: &'a [Note], index: Option<&SearchIndex>) -> Vec<&'a Note> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return notes.iter().collect();
    }

    let built;
    let index = match index {
        Some(index) => index,
        None => {
            built = SearchIndex::build(notes);
            &built
        }
    };

    notes
        .iter()
        .filter(|note| index.matches(&note.id, &needle))
        .collect()
}

pub fn search_in_folder<'a>(query: &str, folder_id: &str, notes: &'a [Note]) -> Vec<&'a Note> {
    let in_folder: Vec<&Note> = notes
        .iter()
        .filter(|n| n.folder_id.as_deref() == Some(folder_id))
        .collect();
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return in_folder;
    }

    let index = SearchIndex::build(in_folder.iter().copied());
    in_folder
        .into_iter()
        .filter(|n| index.matches(&n.id, &needle))
        .collect()
}

/// Wraps every case-insensitive, non-overlapping occurrence of `query` in
/// [`HIGHLIGHT_OPEN`]/[`HIGHLIGHT_CLOSE`]. The query is matched literally.
pub fn highlight(text: &str, query: &str) -> String {
    let query = query.trim();
    if text.is_empty() || query.is_empty() {
        return text.to_string();
    }

    let pattern = match RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
    {
        Ok(pattern) => pattern,
        Err(e) => {
            log::warn!("highlight pattern rejected: {}", e);
            return text.to_string();
        }
    };

    pattern
        .replace_all(text, |caps: &regex::Captures| {
            format!("{}{}{}", HIGHLIGHT_OPEN, &caps[0], HIGHLIGHT_CLOSE)
        })
        .into_owned()
}

/// Up to `limit` titles containing `query`, in collection order.
pub fn suggest(query: &str, notes: &[Note], limit: usize) -> Vec<String> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    notes
        .iter()
        .filter(|n| n.title.to_lowercase().contains(&needle))
        .map(|n| n.title.clone())
        .take(limit)
        .collect()
}

/// Filters for [`advanced_search`]. `None` disables a filter.
#[derive(Debug, Clone, Default)]
pub struct AdvancedSearchOptions {
    pub query: Option<String>,
    pub folder_id: Option<String>,
    pub has_checklists: Option<bool>,
    pub is_pinned: Option<bool>,
    /// Inclusive lower bound on `created_at`, epoch millis.
    pub date_from: Option<i64>,
    /// Inclusive upper bound on `created_at`, epoch millis.
    pub date_to: Option<i64>,
}

/// Filters the notes in storage: folder, then text query, then checklist
/// presence, then pinned status, then creation date range.
pub async fn advanced_search<S: KeyValueStore>(
    repo: &DocumentRepository<S>,
    options: &AdvancedSearchOptions,
) -> Result<Vec<Note>> {
    let notes = repo.get_notes().await?;
    Ok(apply_filters(notes, options))
}

pub fn apply_filters(mut notes: Vec<Note>, options: &AdvancedSearchOptions) -> Vec<Note> {
    if let Some(folder_id) = options.folder_id.as_deref() {
        notes.retain(|n| n.folder_id.as_deref() == Some(folder_id));
    }

    if let Some(query) = options.query.as_deref() {
        let needle = query.trim().to_lowercase();
        if !needle.is_empty() {
            let index = SearchIndex::build(&notes);
            notes.retain(|n| index.matches(&n.id, &needle));
        }
    }

    if let Some(wanted) = options.has_checklists {
        notes.retain(|n| n.has_checklist_items() == wanted);
    }

    if let Some(pinned) = options.is_pinned {
        notes.retain(|n| n.is_pinned == pinned);
    }

    if let Some(from) = options.date_from {
        notes.retain(|n| n.created_at >= from);
    }

    if let Some(to) = options.date_to {
        notes.retain(|n| n.created_at <= to);
    }

    notes
}
