use std::fmt;

/// Kind of record an id failed to resolve against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Note,
    Folder,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Note => f.write_str("note"),
            EntityKind::Folder => f.write_str("folder"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] opendal::Error),

    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    Validation(String),
}

impl Error {
    pub fn note_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: EntityKind::Note,
            id: id.into(),
        }
    }

    pub fn folder_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: EntityKind::Folder,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
