mod handlers;
mod models;

pub use handlers::{create_entry, list_entries, remove_entry, update_entry};
pub use models::{ListEntry, ListEntryUpdate, ListRow, ListStatus, NewListEntry};

use axum::{
    Router,
    routing::{get, put},
};
use sqlx::SqlitePool;

pub fn routes() -> Router<SqlitePool> {
    Router::new()
        .route("/users/:user_id/list", get(list_entries).post(create_entry))
        .route(
            "/users/:user_id/list/:media_id",
            put(update_entry).delete(remove_entry),
        )
}
