mod handlers;
mod models;
pub mod rating;

pub use handlers::{create_media, list_media, rate_media};
pub use models::{
    CastMember, MediaItem, MediaRow, MediaStatus, MediaSummary, MediaType, NewMedia,
    RatingRequest, RatingSummary,
};
pub(crate) use models::enum_str;

use axum::{
    Router,
    routing::{get, post},
};
use sqlx::SqlitePool;

pub fn routes() -> Router<SqlitePool> {
    Router::new()
        .route("/media", get(list_media).post(create_media))
        .route("/media/:id/ratings", post(rate_media))
}
