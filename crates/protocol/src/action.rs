//! Typed file manager actions and their decoding from request parameters.
//!
//! Every request carries at most one action. GET requests select one through
//! a query-string trigger (`delete`, `download`, `edit`, `rename`); POST
//! requests through a form-body trigger (`login`, `rename_file`, `upload`,
//! `save_edit`, `create_file`, `create_folder`). A request without a trigger
//! is a plain [`Action::List`].

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};
use crate::params::{Method, RequestParams, UploadedFile};

/// Query-string parameter selecting the current directory.
pub const DIR_PARAM: &str = "dir";

/// A submitted password that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Wrap a plaintext password.
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// Borrow the plaintext.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Discriminant of an [`Action`], used for logging and dispatch tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    List,
    Login,
    Delete,
    Download,
    Edit,
    SaveEdit,
    Rename,
    RenameFile,
    Upload,
    CreateFile,
    CreateFolder,
}

impl ActionKind {
    /// POST triggers in the order they are checked.
    pub const POST_TRIGGERS: [ActionKind; 6] = [
        ActionKind::Login,
        ActionKind::RenameFile,
        ActionKind::Upload,
        ActionKind::SaveEdit,
        ActionKind::CreateFile,
        ActionKind::CreateFolder,
    ];

    /// GET triggers in the order they are checked.
    pub const GET_TRIGGERS: [ActionKind; 4] = [
        ActionKind::Delete,
        ActionKind::Download,
        ActionKind::Edit,
        ActionKind::Rename,
    ];

    /// Parameter name that selects this action. `List` has no trigger and
    /// reports `"list"`.
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::List => "list",
            ActionKind::Login => "login",
            ActionKind::Delete => "delete",
            ActionKind::Download => "download",
            ActionKind::Edit => "edit",
            ActionKind::SaveEdit => "save_edit",
            ActionKind::Rename => "rename",
            ActionKind::RenameFile => "rename_file",
            ActionKind::Upload => "upload",
            ActionKind::CreateFile => "create_file",
            ActionKind::CreateFolder => "create_folder",
        }
    }

    /// Whether the action changes the filesystem.
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            ActionKind::Delete
                | ActionKind::SaveEdit
                | ActionKind::RenameFile
                | ActionKind::Upload
                | ActionKind::CreateFile
                | ActionKind::CreateFolder
        )
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded file manager action.
///
/// Names are relative to the current directory of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Render the current directory.
    List,
    /// Check submitted credentials.
    Login { username: String, password: Password },
    /// Remove a file, or a directory with everything below it.
    Delete { name: String },
    /// Stream a file back as an attachment.
    Download { name: String },
    /// Load a file into the editor panel.
    Edit { name: String },
    /// Replace a file's contents.
    SaveEdit { file_name: String, content: String },
    /// Show the rename confirmation form.
    Rename { name: String },
    /// Rename an entry.
    RenameFile { old_name: String, new_name: String },
    /// Store an uploaded file.
    Upload { file: UploadedFile },
    /// Create an empty file.
    CreateFile { name: String },
    /// Create an empty directory.
    CreateFolder { name: String },
}

impl Action {
    /// Discriminant of this action.
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::List => ActionKind::List,
            Action::Login { .. } => ActionKind::Login,
            Action::Delete { .. } => ActionKind::Delete,
            Action::Download { .. } => ActionKind::Download,
            Action::Edit { .. } => ActionKind::Edit,
            Action::SaveEdit { .. } => ActionKind::SaveEdit,
            Action::Rename { .. } => ActionKind::Rename,
            Action::RenameFile { .. } => ActionKind::RenameFile,
            Action::Upload { .. } => ActionKind::Upload,
            Action::CreateFile { .. } => ActionKind::CreateFile,
            Action::CreateFolder { .. } => ActionKind::CreateFolder,
        }
    }

    /// Primary entry name the action targets, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Action::List | Action::Login { .. } => None,
            Action::Delete { name }
            | Action::Download { name }
            | Action::Edit { name }
            | Action::Rename { name }
            | Action::CreateFile { name }
            | Action::CreateFolder { name } => Some(name),
            Action::SaveEdit { file_name, .. } => Some(file_name),
            Action::RenameFile { old_name, .. } => Some(old_name),
            Action::Upload { file } => file.base_name(),
        }
    }
}

/// A fully decoded request: the directory it addresses and its action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Method the request arrived with.
    pub method: Method,
    /// Raw `dir` parameter; `None` when absent or empty.
    pub dir: Option<String>,
    /// Selected action.
    pub action: Action,
}

impl Request {
    /// Decode a parameter bag into a request.
    ///
    /// The `dir` parameter is always taken from the query string. A trigger
    /// whose required fields are missing yields an error rather than falling
    /// back to another action.
    pub fn decode(method: Method, mut params: RequestParams) -> Result<Self> {
        let dir = params
            .query(DIR_PARAM)
            .filter(|d| !d.is_empty())
            .map(str::to_owned);

        let action = match method {
            Method::Get => decode_get(&params)?,
            Method::Post => decode_post(&mut params)?,
        };

        Ok(Self { method, dir, action })
    }

    /// Decode only the `dir` parameter, ignoring any action.
    pub fn listing(method: Method, params: &RequestParams) -> Self {
        Self {
            method,
            dir: params
                .query(DIR_PARAM)
                .filter(|d| !d.is_empty())
                .map(str::to_owned),
            action: Action::List,
        }
    }
}

fn decode_get(params: &RequestParams) -> Result<Action> {
    let Some(kind) = ActionKind::GET_TRIGGERS
        .into_iter()
        .find(|kind| params.query(kind.as_str()).is_some())
    else {
        return Ok(Action::List);
    };

    let action = kind.as_str();
    let name = non_empty(action, action, params.query(action))?;

    Ok(match kind {
        ActionKind::Delete => Action::Delete { name },
        ActionKind::Download => Action::Download { name },
        ActionKind::Edit => Action::Edit { name },
        ActionKind::Rename => Action::Rename { name },
        _ => unreachable!("GET_TRIGGERS only holds query actions"),
    })
}

fn decode_post(params: &mut RequestParams) -> Result<Action> {
    let Some(kind) = ActionKind::POST_TRIGGERS
        .into_iter()
        .find(|kind| params.form(kind.as_str()).is_some())
    else {
        return Ok(Action::List);
    };

    let action = kind.as_str();
    Ok(match kind {
        ActionKind::Login => Action::Login {
            username: required(action, "username", params.form("username"))?,
            password: Password::new(required(action, "password", params.form("password"))?),
        },
        ActionKind::RenameFile => Action::RenameFile {
            old_name: non_empty(action, "old_name", params.form("old_name"))?,
            new_name: non_empty(action, "new_name", params.form("new_name"))?,
        },
        ActionKind::Upload => {
            let file = params.take_upload().ok_or(ProtocolError::MissingUpload)?;
            if file.base_name().is_none() {
                return Err(ProtocolError::MissingUpload);
            }
            Action::Upload { file }
        }
        ActionKind::SaveEdit => Action::SaveEdit {
            file_name: non_empty(action, "file_name", params.form("file_name"))?,
            content: required(action, "file_content", params.form("file_content"))?,
        },
        ActionKind::CreateFile => Action::CreateFile {
            name: non_empty(action, "new_file_name", params.form("new_file_name"))?,
        },
        ActionKind::CreateFolder => Action::CreateFolder {
            name: non_empty(action, "new_folder_name", params.form("new_folder_name"))?,
        },
        _ => unreachable!("POST_TRIGGERS only holds form actions"),
    })
}

fn required(action: &'static str, field: &'static str, value: Option<&str>) -> Result<String> {
    value
        .map(str::to_owned)
        .ok_or(ProtocolError::MissingField { action, field })
}

fn non_empty(action: &'static str, field: &'static str, value: Option<&str>) -> Result<String> {
    let value = required(action, field, value)?;
    if value.is_empty() {
        return Err(ProtocolError::EmptyField { action, field });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(pairs: &[(&str, &str)]) -> Result<Request> {
        let mut params = RequestParams::new();
        for (k, v) in pairs {
            params.insert_query(*k, *v);
        }
        Request::decode(Method::Get, params)
    }

    fn post(query: &[(&str, &str)], form: &[(&str, &str)]) -> Result<Request> {
        let mut params = RequestParams::new();
        for (k, v) in query {
            params.insert_query(*k, *v);
        }
        for (k, v) in form {
            params.insert_form(*k, *v);
        }
        Request::decode(Method::Post, params)
    }

    #[test]
    fn test_no_trigger_is_list() {
        let req = get(&[]).unwrap();
        assert_eq!(req.action, Action::List);
        assert_eq!(req.dir, None);

        let req = post(&[], &[]).unwrap();
        assert_eq!(req.action, Action::List);
    }

    #[test]
    fn test_dir_from_query() {
        let req = get(&[("dir", "/srv/www")]).unwrap();
        assert_eq!(req.dir.as_deref(), Some("/srv/www"));

        let req = get(&[("dir", "")]).unwrap();
        assert_eq!(req.dir, None);
    }

    #[test]
    fn test_dir_not_read_from_form() {
        let req = post(&[], &[("dir", "/etc")]).unwrap();
        assert_eq!(req.dir, None);
    }

    #[test]
    fn test_get_triggers() {
        assert_eq!(
            get(&[("delete", "old.log")]).unwrap().action,
            Action::Delete { name: "old.log".into() }
        );
        assert_eq!(
            get(&[("download", "a.zip")]).unwrap().action,
            Action::Download { name: "a.zip".into() }
        );
        assert_eq!(
            get(&[("edit", "index.html")]).unwrap().action,
            Action::Edit { name: "index.html".into() }
        );
        assert_eq!(
            get(&[("rename", "x")]).unwrap().action,
            Action::Rename { name: "x".into() }
        );
    }

    #[test]
    fn test_get_trigger_precedence() {
        let req = get(&[("rename", "b"), ("delete", "a"), ("edit", "c")]).unwrap();
        assert_eq!(req.action, Action::Delete { name: "a".into() });
    }

    #[test]
    fn test_get_empty_name_rejected() {
        let err = get(&[("delete", "")]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::EmptyField {
                action: "delete",
                field: "delete"
            }
        );
    }

    #[test]
    fn test_post_ignores_query_triggers() {
        let req = post(&[("delete", "a")], &[]).unwrap();
        assert_eq!(req.action, Action::List);
    }

    #[test]
    fn test_get_ignores_form_triggers() {
        let mut params = RequestParams::new();
        params.insert_form("create_file", "");
        params.insert_form("new_file_name", "a.txt");
        let req = Request::decode(Method::Get, params).unwrap();
        assert_eq!(req.action, Action::List);
    }

    #[test]
    fn test_login() {
        let req = post(&[], &[("login", ""), ("username", "admin"), ("password", "pw")]).unwrap();
        match req.action {
            Action::Login { username, password } => {
                assert_eq!(username, "admin");
                assert_eq!(password.expose(), "pw");
            }
            other => panic!("expected login, got {:?}", other),
        }
    }

    #[test]
    fn test_login_missing_password() {
        let err = post(&[], &[("login", ""), ("username", "admin")]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::MissingField {
                action: "login",
                field: "password"
            }
        );
    }

    #[test]
    fn test_password_debug_redacted() {
        let action = Action::Login {
            username: "admin".into(),
            password: Password::new("hunter2"),
        };
        let debug = format!("{:?}", action);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_rename_file() {
        let req = post(
            &[("dir", "/tmp")],
            &[("rename_file", ""), ("old_name", "a.txt"), ("new_name", "b.txt")],
        )
        .unwrap();
        assert_eq!(
            req.action,
            Action::RenameFile {
                old_name: "a.txt".into(),
                new_name: "b.txt".into()
            }
        );
        assert_eq!(req.dir.as_deref(), Some("/tmp"));
    }

    #[test]
    fn test_save_edit_allows_empty_content() {
        let req = post(
            &[],
            &[("save_edit", ""), ("file_name", "a.txt"), ("file_content", "")],
        )
        .unwrap();
        assert_eq!(
            req.action,
            Action::SaveEdit {
                file_name: "a.txt".into(),
                content: String::new()
            }
        );
    }

    #[test]
    fn test_save_edit_requires_content_field() {
        let err = post(&[], &[("save_edit", ""), ("file_name", "a.txt")]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::MissingField {
                field: "file_content",
                ..
            }
        ));
    }

    #[test]
    fn test_create_actions() {
        let req = post(&[], &[("create_file", ""), ("new_file_name", "new.txt")]).unwrap();
        assert_eq!(req.action, Action::CreateFile { name: "new.txt".into() });

        let req = post(&[], &[("create_folder", ""), ("new_folder_name", "assets")]).unwrap();
        assert_eq!(req.action, Action::CreateFolder { name: "assets".into() });
    }

    #[test]
    fn test_create_folder_empty_name() {
        let err = post(&[], &[("create_folder", ""), ("new_folder_name", "")]).unwrap_err();
        assert!(matches!(err, ProtocolError::EmptyField { .. }));
    }

    #[test]
    fn test_upload() {
        let mut params = RequestParams::new().with_upload(UploadedFile::new("dir/photo.jpg", vec![1, 2, 3]));
        params.insert_form("upload", "");
        let req = Request::decode(Method::Post, params).unwrap();
        assert_eq!(req.action.kind(), ActionKind::Upload);
        assert_eq!(req.action.target(), Some("photo.jpg"));
    }

    #[test]
    fn test_upload_without_file() {
        let err = post(&[], &[("upload", "")]).unwrap_err();
        assert_eq!(err, ProtocolError::MissingUpload);
    }

    #[test]
    fn test_post_trigger_precedence() {
        let req = post(
            &[],
            &[
                ("create_file", ""),
                ("new_file_name", "a"),
                ("rename_file", ""),
                ("old_name", "x"),
                ("new_name", "y"),
            ],
        )
        .unwrap();
        assert_eq!(req.action.kind(), ActionKind::RenameFile);
    }

    #[test]
    fn test_listing_ignores_action() {
        let mut params = RequestParams::new();
        params.insert_query("dir", "/var");
        params.insert_query("delete", "");
        let req = Request::listing(Method::Get, &params);
        assert_eq!(req.action, Action::List);
        assert_eq!(req.dir.as_deref(), Some("/var"));
    }

    #[test]
    fn test_action_kind_names() {
        for kind in ActionKind::GET_TRIGGERS.into_iter().chain(ActionKind::POST_TRIGGERS) {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_is_mutating() {
        assert!(ActionKind::Delete.is_mutating());
        assert!(ActionKind::Upload.is_mutating());
        assert!(!ActionKind::Download.is_mutating());
        assert!(!ActionKind::Edit.is_mutating());
        assert!(!ActionKind::Login.is_mutating());
    }
}
