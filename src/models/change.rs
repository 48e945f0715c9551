use serde_json::Value;

use crate::models::{NotificationEvent, ShoppingList};

/// Kind of change reported by a change feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// Raw change observed on the list collection
#[derive(Debug, Clone)]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    pub document_id: String,
    /// Document body; feeds leave it empty for removals
    pub body: Option<Value>,
}

impl ChangeRecord {
    pub fn added(document_id: impl Into<String>, body: Value) -> Self {
        Self {
            kind: ChangeKind::Added,
            document_id: document_id.into(),
            body: Some(body),
        }
    }

    pub fn modified(document_id: impl Into<String>, body: Value) -> Self {
        Self {
            kind: ChangeKind::Modified,
            document_id: document_id.into(),
            body: Some(body),
        }
    }

    pub fn removed(document_id: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Removed,
            document_id: document_id.into(),
            body: None,
        }
    }
}

#[derive(Debug)]
pub enum ChangeDecodeError {
    MissingBody,
    InvalidBody(serde_json::Error),
}

impl std::fmt::Display for ChangeDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeDecodeError::MissingBody => write!(f, "change record has no document body"),
            ChangeDecodeError::InvalidBody(e) => write!(f, "invalid list document: {}", e),
        }
    }
}

impl std::error::Error for ChangeDecodeError {}

impl TryFrom<ChangeRecord> for NotificationEvent {
    type Error = ChangeDecodeError;

    /// Added and Modified both become `LIST`; the feed cannot tell a fresh
    /// insert apart from the initial snapshot of an existing list.
    fn try_from(record: ChangeRecord) -> Result<Self, Self::Error> {
        match record.kind {
            ChangeKind::Added | ChangeKind::Modified => {
                let body = record.body.ok_or(ChangeDecodeError::MissingBody)?;
                let mut list: ShoppingList =
                    serde_json::from_value(body).map_err(ChangeDecodeError::InvalidBody)?;
                list.id = record.document_id.clone();
                Ok(NotificationEvent::ListUpdated {
                    list_id: record.document_id,
                    list,
                })
            }
            ChangeKind::Removed => Ok(NotificationEvent::ListDeleted {
                list_id: record.document_id,
            }),
        }
    }
}
