//! The single request handler behind `/`.
//!
//! Every request goes through the login gate, is decoded into an
//! [`Action`], and is dispatched to the filesystem layer. Mutations answer
//! with a redirect back to the listing; everything else renders a page.
//! Failed operations are logged and otherwise ignored.

use std::path::Path;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use protocol::{Action, Password, Request};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use super::extract::RawRequest;
use super::render::{self, ListingView, Panel};
use crate::files::{Download, FileOpError, TransferError};
use crate::session::SessionStore;
use crate::state::SharedState;

/// Handle a request to `/`.
pub async fn handle(
    State(state): State<SharedState>,
    jar: CookieJar,
    raw: RawRequest,
) -> Response {
    let RawRequest {
        method,
        params,
        body_error,
    } = raw;

    let decoded = match body_error {
        Some(e) => Err(e),
        None => Request::decode(method, params.clone()),
    };
    let request = match decoded {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Could not decode request, showing listing");
            Request::listing(method, &params)
        }
    };

    if let Action::Login { username, password } = &request.action {
        return login(&state, jar, &request, username, password).await;
    }

    if !is_logged_in(&state, &jar) {
        let kind = request.action.kind();
        if kind.is_mutating() {
            warn!(action = %kind, entry = ?request.action.target(), "Unauthenticated change rejected");
        } else {
            debug!(action = %kind, "Unauthenticated request, showing login form");
        }
        let dir = state.browser.resolve_dir(request.dir.as_deref());
        return Html(render::login_page(&dir, None)).into_response();
    }

    dispatch(&state, request).await
}

fn is_logged_in(state: &SharedState, jar: &CookieJar) -> bool {
    jar.get(&state.config.session.cookie_name)
        .is_some_and(|cookie| state.sessions.is_logged_in(cookie.value()))
}

async fn login(
    state: &SharedState,
    jar: CookieJar,
    request: &Request,
    username: &str,
    password: &Password,
) -> Response {
    let dir = state.browser.resolve_dir(request.dir.as_deref());
    if !state.credentials.verify(username, password).await {
        warn!(username, "Failed login attempt");
        return Html(render::login_page(&dir, Some(render::LOGIN_FAILED))).into_response();
    }

    let session_id = state.sessions.create();
    info!(username, dir = %dir.display(), sessions = state.sessions.count(), "Login succeeded");

    let cookie = Cookie::build((state.config.session.cookie_name.clone(), session_id))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/");

    (jar.add(cookie), listing(state, &dir, None)).into_response()
}

async fn dispatch(state: &SharedState, request: Request) -> Response {
    let dir = state.browser.resolve_dir(request.dir.as_deref());
    let kind = request.action.kind();

    match request.action {
        Action::List | Action::Login { .. } => listing(state, &dir, None),

        Action::Delete { name } => {
            let ops = state.ops.clone();
            let target_dir = dir.clone();
            let target = name.clone();
            match tokio::task::spawn_blocking(move || ops.delete(&target_dir, &target)).await {
                Ok(Ok(stats)) => {
                    info!(dir = %dir.display(), name = %name, files = stats.files, directories = stats.directories, "Deleted");
                }
                Ok(Err(FileOpError::NotFound(path))) => {
                    debug!(path = %path.display(), "Nothing to delete");
                }
                Ok(Err(e)) => warn!(action = %kind, dir = %dir.display(), name = %name, error = %e, "Delete failed"),
                Err(e) => warn!(action = %kind, error = %e, "Delete task failed"),
            }
            redirect(&dir)
        }

        Action::Download { name } => match state.transfer.open_download(&dir, &name).await {
            Ok(download) => {
                info!(dir = %dir.display(), name = %name, size = download.size, "Download started");
                download_response(download)
            }
            Err(e @ (TransferError::NotAFile(_) | TransferError::FileNotFound(_))) => {
                debug!(error = %e, "Nothing to download");
                listing(state, &dir, None)
            }
            Err(e) => {
                warn!(action = %kind, dir = %dir.display(), name = %name, error = %e, "Download failed");
                listing(state, &dir, None)
            }
        },

        Action::Edit { name } => match state.ops.read_text(&dir, &name) {
            Ok(content) => listing(
                state,
                &dir,
                Some(Panel::Edit {
                    name: &name,
                    content: &content,
                }),
            ),
            Err(e @ (FileOpError::NotAFile(_) | FileOpError::NotFound(_))) => {
                debug!(error = %e, "Nothing to edit");
                listing(state, &dir, None)
            }
            Err(e) => {
                warn!(action = %kind, dir = %dir.display(), name = %name, error = %e, "Loading file for edit failed");
                listing(state, &dir, None)
            }
        },

        Action::SaveEdit { file_name, content } => {
            match state.ops.write_text(&dir, &file_name, &content) {
                Ok(()) => info!(dir = %dir.display(), name = %file_name, bytes = content.len(), "Saved"),
                Err(e) => warn!(action = %kind, dir = %dir.display(), name = %file_name, error = %e, "Save failed"),
            }
            redirect(&dir)
        }

        Action::Rename { name } => listing(state, &dir, Some(Panel::Rename { name: &name })),

        Action::RenameFile { old_name, new_name } => {
            match state.ops.rename(&dir, &old_name, &new_name) {
                Ok(()) => info!(dir = %dir.display(), from = %old_name, to = %new_name, "Renamed"),
                Err(e) => warn!(action = %kind, dir = %dir.display(), from = %old_name, to = %new_name, error = %e, "Rename failed"),
            }
            redirect(&dir)
        }

        Action::Upload { file } => {
            let transfer = state.transfer.clone();
            let target_dir = dir.clone();
            let name = file.file_name.clone();
            let size = file.len();
            match tokio::task::spawn_blocking(move || transfer.store_upload(&target_dir, &file)).await {
                Ok(Ok(path)) => info!(path = %path.display(), size, "Uploaded"),
                Ok(Err(e)) => warn!(action = %kind, dir = %dir.display(), name = %name, error = %e, "Upload failed"),
                Err(e) => warn!(action = %kind, error = %e, "Upload task failed"),
            }
            redirect(&dir)
        }

        Action::CreateFile { name } => {
            match state.ops.create_file(&dir, &name) {
                Ok(()) => info!(dir = %dir.display(), name = %name, "Created file"),
                Err(e) => warn!(action = %kind, dir = %dir.display(), name = %name, error = %e, "Create file failed"),
            }
            redirect(&dir)
        }

        Action::CreateFolder { name } => {
            match state.ops.create_folder(&dir, &name) {
                Ok(()) => info!(dir = %dir.display(), name = %name, "Created folder"),
                Err(FileOpError::AlreadyExists(path)) => {
                    info!(path = %path.display(), "Folder already exists");
                }
                Err(e) => warn!(action = %kind, dir = %dir.display(), name = %name, error = %e, "Create folder failed"),
            }
            redirect(&dir)
        }
    }
}

/// Render the listing of `dir`, or a plain 500 when it cannot be read.
fn listing(state: &SharedState, dir: &Path, panel: Option<Panel<'_>>) -> Response {
    match state.browser.list_directory(dir) {
        Ok(listing) => {
            let parent = state.browser.parent_of(dir);
            Html(render::listing_page(&ListingView {
                dir,
                parent: &parent,
                listing: &listing,
                panel,
            }))
            .into_response()
        }
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to list directory");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unable to read the current directory.",
            )
                .into_response()
        }
    }
}

fn redirect(dir: &Path) -> Response {
    Redirect::to(&render::dir_query(dir, None)).into_response()
}

fn download_response(download: Download) -> Response {
    let Download {
        file,
        size,
        file_name,
    } = download;

    let disposition = format!("attachment; filename=\"{}\"", header_safe(&file_name));
    let disposition = HeaderValue::from_bytes(disposition.as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        [
            (
                HeaderName::from_static("content-description"),
                HeaderValue::from_static("File Transfer"),
            ),
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(size)),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response()
}

/// Strip characters that would break out of the quoted filename.
fn header_safe(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control())
        .map(|c| if c == '"' || c == '\\' { '_' } else { c })
        .collect()
}
