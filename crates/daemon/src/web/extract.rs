//! Turning an HTTP request into a [`RequestParams`] bag.
//!
//! The query string is always parsed. POST bodies are read as multipart when
//! the content type says so and as urlencoded forms otherwise. A body that
//! cannot be read does not reject the request; the failure is carried along
//! so the handler can still apply the login gate and fall back to a listing.

use std::collections::HashMap;

use axum::async_trait;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{header, Method};
use axum::Form;
use protocol::{ProtocolError, RequestParams, UploadedFile};
use url::form_urlencoded;

/// Name of the multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "file";

/// Raw parameters of one request.
#[derive(Debug)]
pub struct RawRequest {
    /// Request method.
    pub method: protocol::Method,
    /// Query, form fields and upload.
    pub params: RequestParams,
    /// Set when the body could not be read.
    pub body_error: Option<ProtocolError>,
}

#[async_trait]
impl<S> FromRequest<S> for RawRequest
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let query: HashMap<String, String> = req
            .uri()
            .query()
            .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        let mut params = RequestParams::new().with_query(query);

        if *req.method() != Method::POST {
            return Ok(Self {
                method: protocol::Method::Get,
                params,
                body_error: None,
            });
        }

        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let body_error = if content_type.starts_with("multipart/form-data") {
            read_multipart(req, state, &mut params).await.err()
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            match Form::<HashMap<String, String>>::from_request(req, state).await {
                Ok(Form(form)) => {
                    params = params.with_form(form);
                    None
                }
                Err(e) => Some(ProtocolError::Form(e.body_text())),
            }
        } else {
            None
        };

        Ok(Self {
            method: protocol::Method::Post,
            params,
            body_error,
        })
    }
}

async fn read_multipart<S>(
    req: Request,
    state: &S,
    params: &mut RequestParams,
) -> Result<(), ProtocolError>
where
    S: Send + Sync,
{
    let mut multipart = Multipart::from_request(req, state)
        .await
        .map_err(|e| ProtocolError::Multipart(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ProtocolError::Multipart(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if name == UPLOAD_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_owned();
            let data = field
                .bytes()
                .await
                .map_err(|e| ProtocolError::Multipart(e.body_text()))?;
            // A file input left empty still submits a part with no file name.
            if !file_name.is_empty() {
                params.set_upload(UploadedFile::new(file_name, data));
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ProtocolError::Multipart(e.body_text()))?;
            params.insert_form(name, value);
        }
    }

    Ok(())
}
