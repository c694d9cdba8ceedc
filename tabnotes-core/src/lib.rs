#![warn(warnings)]
#![deny(clippy::all)]

//! Persistence and derived-index layer for a tab-based note taker.

pub mod autosave;
pub mod config;
pub mod delta;
pub mod error;
pub mod folder;
pub mod note;
pub mod notebook;
pub mod projector;
pub mod repository;
pub mod search;
pub mod session;
pub mod settings;
pub mod storage;

pub use config::Config;
pub use delta::{Delta, Insert, ListFormat, Op};
pub use error::{EntityKind, Error, Result};
pub use folder::{Folder, FolderPatch, FolderStore};
pub use note::{Note, NotePatch, NoteStore};
pub use notebook::Notebook;
pub use projector::ChecklistItem;
pub use repository::{DocumentRepository, StorageUsage};
pub use search::{AdvancedSearchOptions, SearchIndex};
pub use session::{EditorSnapshot, Selection, TabSession};
pub use settings::{Settings, SettingsPatch, Wallpaper, WallpaperKind};
pub use storage::{KeyValueStore, OpendalStore, Record};
