//! # FileDeck Protocol Library
//!
//! This crate defines the request protocol of the FileDeck file manager: the
//! raw parameter bag filled by the HTTP layer and the typed [`Action`] it
//! decodes into.
//!
//! ## Overview
//!
//! FileDeck serves a single endpoint. What a request does is selected by the
//! presence of a trigger parameter:
//!
//! ```text
//! GET  ?dir=D                         -> List
//! GET  ?dir=D&delete=N                -> Delete
//! GET  ?dir=D&download=N              -> Download
//! GET  ?dir=D&edit=N                  -> Edit
//! GET  ?dir=D&rename=N                -> Rename (form)
//! POST login, username, password      -> Login
//! POST rename_file, old_name, new_name-> RenameFile
//! POST upload + multipart file        -> Upload
//! POST save_edit, file_name, file_content -> SaveEdit
//! POST create_file, new_file_name     -> CreateFile
//! POST create_folder, new_folder_name -> CreateFolder
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{Action, Method, Request, RequestParams};
//!
//! let mut params = RequestParams::new();
//! params.insert_query("dir", "/srv/www");
//! params.insert_query("delete", "old.log");
//!
//! let request = Request::decode(Method::Get, params).unwrap();
//! assert_eq!(request.dir.as_deref(), Some("/srv/www"));
//! assert_eq!(request.action, Action::Delete { name: "old.log".into() });
//! ```
//!
//! ## Modules
//!
//! - [`params`]: Raw request parameters and uploaded files
//! - [`action`]: Action enum and decoding
//! - [`error`]: Error types

pub mod action;
pub mod error;
pub mod params;

pub use action::{Action, ActionKind, Password, Request, DIR_PARAM};
pub use error::{ProtocolError, Result};
pub use params::{Method, RequestParams, UploadedFile};
