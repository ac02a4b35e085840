//! Client core: a reducer-driven state container and the optimistic
//! mutation layer on top of a persistence collaborator.

pub mod api;
pub mod arena;
pub mod http;
pub mod mutation;
pub mod optimistic;
pub mod state;
pub mod thread;

pub use api::{ApiError, ApiResult, Collaborator};
pub use arena::{OrderedArena, Slot};
pub use http::HttpCollaborator;
pub use mutation::{
    MutationError, MutationId, MutationKind, MutationLog, MutationRecord, MutationStatus,
};
pub use optimistic::{CurrentUser, OptimisticClient, Store};
pub use state::{Action, ClientState, PostEntry, reduce};
pub use thread::CommentThread;
