//! HTTP surface of the file manager.
//!
//! A single endpoint `/` accepts GET and POST. The handler decodes the
//! request into an action, applies the login gate and answers with a page
//! or a redirect.

pub mod extract;
pub mod handler;
pub mod render;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;

use crate::state::SharedState;

/// Room for multipart framing and the other form fields of an upload.
const BODY_OVERHEAD: usize = 64 * 1024;

/// Build the application router.
pub fn build_router(state: SharedState) -> Router {
    let limit = usize::try_from(state.config.file.max_upload_size)
        .unwrap_or(usize::MAX)
        .saturating_add(BODY_OVERHEAD);

    Router::new()
        .route("/", get(handler::handle).post(handler::handle))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}
