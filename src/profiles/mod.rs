mod handlers;
mod models;
pub mod slug;

pub use handlers::{get_profile, load_profiles, public_profile, update_profile};
pub use models::{Profile, ProfileRow, ProfileUpdate, PublicEntry, PublicProfile};

use axum::{Router, routing::get};
use sqlx::SqlitePool;

pub fn routes() -> Router<SqlitePool> {
    Router::new()
        .route("/users/:user_id/profile", get(get_profile).put(update_profile))
        .route("/public-profiles/:slug", get(public_profile))
}
