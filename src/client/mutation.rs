use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use super::api::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationId(u64);

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    CreatePost,
    AddComment,
    AddReply,
    TogglePostLike,
    ToggleCommentLike,
    AddListEntry,
    UpdateListEntry,
    RemoveListEntry,
    RateMedia,
    UpdateProfile,
    AddMedia,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationStatus {
    Pending,
    Confirmed,
    RolledBack { reason: String },
}

impl MutationStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, MutationStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    /// Id of the entity the mutation touches (the synthesized one for creations).
    pub entity_id: String,
    pub status: MutationStatus,
}

/// History of every mutation the client issued. A record only ever moves out
/// of `Pending` once.
#[derive(Debug, Default)]
pub struct MutationLog {
    next: u64,
    records: HashMap<MutationId, MutationRecord>,
}

impl MutationLog {
    pub fn begin(&mut self, kind: MutationKind, entity_id: &str) -> MutationId {
        self.next += 1;
        let id = MutationId(self.next);
        self.records.insert(
            id,
            MutationRecord {
                kind,
                entity_id: entity_id.to_string(),
                status: MutationStatus::Pending,
            },
        );
        id
    }

    pub fn settle(&mut self, id: MutationId, status: MutationStatus) {
        match self.records.get_mut(&id) {
            Some(record) if record.status.is_pending() => record.status = status,
            Some(_) => tracing::warn!(mutation = %id, "mutation already settled"),
            None => tracing::warn!(mutation = %id, "unknown mutation"),
        }
    }

    pub fn get(&self, id: MutationId) -> Option<&MutationRecord> {
        self.records.get(&id)
    }

    pub fn status(&self, id: MutationId) -> Option<&MutationStatus> {
        self.records.get(&id).map(|r| &r.status)
    }

    pub fn records(&self) -> impl Iterator<Item = (&MutationId, &MutationRecord)> {
        self.records.iter()
    }

    pub fn pending(&self) -> usize {
        self.records.values().filter(|r| r.status.is_pending()).count()
    }
}

#[derive(Debug, Error)]
pub enum MutationError {
    /// Rejected locally; nothing was applied or sent.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Collaborator(#[from] ApiError),
}

impl MutationError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, MutationError::Collaborator(ApiError::Conflict(_)))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, MutationError::Collaborator(ApiError::NotFound(_)))
    }
}
