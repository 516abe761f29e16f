pub mod admin;
pub mod helpers;
pub mod upload;

use axum::Router;
use axum::extract::DefaultBodyLimit;

use crate::store::AppState;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(upload::router().layer(DefaultBodyLimit::max(max_upload_bytes)))
        .merge(admin::router())
}
