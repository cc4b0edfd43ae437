//! Raw request parameters as received from the HTTP layer.
//!
//! The HTTP layer fills a [`RequestParams`] bag from the query string, the
//! form body (urlencoded or multipart) and at most one uploaded file. The bag
//! is then decoded into a typed [`crate::Request`].

use std::collections::HashMap;

use bytes::Bytes;

/// HTTP method of the incoming request.
///
/// Only GET and POST reach the handler; GET triggers are read from the query
/// string and POST triggers from the form body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Query-string request.
    Get,
    /// Form submission.
    Post,
}

/// A file received in a multipart `file` part.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// File name as sent by the client, possibly including directories.
    pub file_name: String,
    /// Full file contents.
    pub data: Bytes,
}

impl UploadedFile {
    /// Create an uploaded file from a client file name and its contents.
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }

    /// Final component of the client file name.
    ///
    /// Both `/` and `\` are treated as separators since browsers on either
    /// platform may send full paths. Returns `None` when nothing usable is
    /// left (empty, `.` or `..`).
    pub fn base_name(&self) -> Option<&str> {
        let base = self
            .file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default();
        match base {
            "" | "." | ".." => None,
            name => Some(name),
        }
    }

    /// Size of the uploaded contents in bytes.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Whether the uploaded file is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedFile")
            .field("file_name", &self.file_name)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Unparsed parameter bag for a single request.
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    query: HashMap<String, String>,
    form: HashMap<String, String>,
    upload: Option<UploadedFile>,
}

impl RequestParams {
    /// Create an empty parameter bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the query-string parameters.
    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    /// Replace the form-body parameters.
    pub fn with_form(mut self, form: HashMap<String, String>) -> Self {
        self.form = form;
        self
    }

    /// Attach an uploaded file.
    pub fn with_upload(mut self, upload: UploadedFile) -> Self {
        self.upload = Some(upload);
        self
    }

    /// Set a query-string parameter.
    pub fn insert_query(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.insert(key.into(), value.into());
    }

    /// Set a form-body parameter.
    pub fn insert_form(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.form.insert(key.into(), value.into());
    }

    /// Set the uploaded file, replacing any previous one.
    pub fn set_upload(&mut self, upload: UploadedFile) {
        self.upload = Some(upload);
    }

    /// Look up a query-string parameter.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Look up a form-body parameter.
    pub fn form(&self, key: &str) -> Option<&str> {
        self.form.get(key).map(String::as_str)
    }

    /// Borrow the uploaded file, if any.
    pub fn upload(&self) -> Option<&UploadedFile> {
        self.upload.as_ref()
    }

    /// Take ownership of the uploaded file, if any.
    pub fn take_upload(&mut self) -> Option<UploadedFile> {
        self.upload.take()
    }
}
