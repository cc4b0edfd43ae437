//! HTML rendering for the login and listing pages.
//!
//! Pages are assembled with `format!`. Every piece of user or filesystem
//! supplied text goes through `html_escape`, and every link parameter is
//! form-urlencoded.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use url::form_urlencoded;

use crate::files::{DirectoryEntry, Listing};

/// Message shown after a failed login.
pub const LOGIN_FAILED: &str = "Invalid username or password.";

const STYLE: &str = r#"
body { font-family: monospace; background: #121212; color: #e0e0e0; margin: 2em; }
a { color: #03dac6; text-decoration: none; }
a:hover { text-decoration: underline; }
table { border-collapse: collapse; width: 100%; margin-top: 1em; }
th, td { border: 1px solid #333; padding: 4px 8px; text-align: left; }
th { background: #1f1f1f; }
form { margin: 0.5em 0; }
textarea { width: 100%; height: 24em; background: #1e1e1e; color: #e0e0e0; }
.error { color: #cf6679; }
"#;

/// Optional panel shown above the listing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel<'a> {
    /// Text editor loaded with a file's contents.
    Edit { name: &'a str, content: &'a str },
    /// Rename confirmation for an entry.
    Rename { name: &'a str },
}

/// Everything the listing page shows.
#[derive(Debug, Clone, Copy)]
pub struct ListingView<'a> {
    /// Current directory.
    pub dir: &'a Path,
    /// Target of the "Current Directory" link.
    pub parent: &'a Path,
    /// Entries of the current directory.
    pub listing: &'a Listing,
    /// Edit or rename panel, if any.
    pub panel: Option<Panel<'a>>,
}

/// Render the login form, with an optional error message above it.
///
/// The form posts back to `dir` so a successful login lands there.
pub fn login_page(dir: &Path, error: Option<&str>) -> String {
    let error = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, html_escape::encode_text(e)))
        .unwrap_or_default();

    page(
        "Login",
        &format!(
            r#"{error}
<form method="post" action="{action}">
    <input type="text" name="username" placeholder="Username" required>
    <input type="password" name="password" placeholder="Password" required>
    <button type="submit" name="login">Login</button>
</form>"#,
            action = attr(&dir_query(dir, None)),
        ),
    )
}

/// Render the listing page.
pub fn listing_page(view: &ListingView<'_>) -> String {
    let dir = display_path(view.dir);
    let self_link = attr(&dir_query(view.dir, None));

    let mut body = format!(
        r#"<p>Current Directory: <a href="{parent}">{dir}</a></p>
<form method="post" action="{self_link}" enctype="multipart/form-data">
    <input type="file" name="file">
    <button type="submit" name="upload">Upload</button>
</form>
<form method="post" action="{self_link}">
    <input type="text" name="new_file_name" placeholder="New File Name" required>
    <button type="submit" name="create_file">Create File</button>
</form>
<form method="post" action="{self_link}">
    <input type="text" name="new_folder_name" placeholder="New Folder Name" required>
    <button type="submit" name="create_folder">Create Folder</button>
</form>
"#,
        parent = attr(&dir_query(view.parent, None)),
        dir = html_escape::encode_text(&dir),
    );

    match view.panel {
        Some(Panel::Edit { name, content }) => {
            body.push_str(&format!(
                r#"<h2>Edit File: {title}</h2>
<form method="post" action="{self_link}">
    <textarea name="file_content">
{content}</textarea>
    <input type="hidden" name="file_name" value="{name}">
    <button type="submit" name="save_edit">Save</button>
</form>
"#,
                title = html_escape::encode_text(name),
                content = html_escape::encode_text(content),
                name = html_escape::encode_double_quoted_attribute(name),
            ));
        }
        Some(Panel::Rename { name }) => {
            body.push_str(&format!(
                r#"<h2>Rename: {title}</h2>
<form method="post" action="{self_link}">
    <input type="hidden" name="old_name" value="{name}">
    <input type="text" name="new_name" placeholder="New Name" required>
    <button type="submit" name="rename_file">Rename</button>
</form>
"#,
                title = html_escape::encode_text(name),
                name = html_escape::encode_double_quoted_attribute(name),
            ));
        }
        None => {}
    }

    body.push_str(
        "<table>\n<thead>\n<tr><th>File/Folder</th><th>Size</th><th>Last Modified</th><th>Actions</th></tr>\n</thead>\n<tbody>\n",
    );
    for entry in view.listing.iter() {
        body.push_str(&entry_row(view.dir, entry));
    }
    body.push_str("</tbody>\n</table>");

    page(&format!("FileDeck - {}", dir), &body)
}

fn entry_row(dir: &Path, entry: &DirectoryEntry) -> String {
    let name = html_escape::encode_text(&entry.name);
    let (label, size) = if entry.is_dir() {
        (
            format!(
                r#"<a href="{}">&#128193; {}</a>"#,
                attr(&dir_query(&entry.path, None)),
                name
            ),
            "Folder".to_string(),
        )
    } else {
        (name.to_string(), format!("{} bytes", entry.size))
    };

    let actions = ["edit", "delete", "rename", "download"]
        .into_iter()
        .map(|action| {
            format!(
                r#"<a href="{}">{}</a>"#,
                attr(&dir_query(dir, Some((action, entry.name.as_str())))),
                capitalize(action)
            )
        })
        .collect::<Vec<_>>()
        .join(" | ");

    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
        label,
        size,
        format_modified(entry.modified),
        actions
    )
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>{title}</title>
<style>{style}</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = html_escape::encode_text(title),
        style = STYLE,
    )
}

/// Build `/?dir=<dir>[&<action>=<name>]`.
pub fn dir_query(dir: &Path, action: Option<(&str, &str)>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("dir", &display_path(dir));
    if let Some((key, value)) = action {
        query.append_pair(key, value);
    }
    format!("/?{}", query.finish())
}

/// Format a modification time in local time.
pub fn format_modified(modified: SystemTime) -> String {
    DateTime::<Local>::from(modified)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn attr(value: &str) -> String {
    html_escape::encode_double_quoted_attribute(value).into_owned()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::EntryKind;
    use std::path::PathBuf;

    fn entry(name: &str, kind: EntryKind, size: u64) -> DirectoryEntry {
        DirectoryEntry {
            name: name.to_string(),
            path: PathBuf::from("/srv").join(name),
            kind,
            size,
            modified: SystemTime::UNIX_EPOCH,
        }
    }

    fn sample_listing() -> Listing {
        Listing {
            directories: vec![entry("assets", EntryKind::Directory, 0)],
            files: vec![entry("index.html", EntryKind::File, 42)],
        }
    }

    #[test]
    fn test_login_page() {
        let html = login_page(Path::new("/srv/my dir"), None);
        assert!(html.contains(r#"action="/?dir=%2Fsrv%2Fmy+dir""#));
        assert!(html.contains(r#"name="username""#));
        assert!(html.contains(r#"name="password""#));
        assert!(html.contains(r#"name="login""#));
        assert!(!html.contains(LOGIN_FAILED));

        let html = login_page(Path::new("/srv"), Some(LOGIN_FAILED));
        assert!(html.contains(LOGIN_FAILED));
    }

    #[test]
    fn test_dir_query_encodes() {
        assert_eq!(dir_query(Path::new("/srv/my dir"), None), "/?dir=%2Fsrv%2Fmy+dir");
        assert_eq!(
            dir_query(Path::new("/srv"), Some(("delete", "a&b.txt"))),
            "/?dir=%2Fsrv&delete=a%26b.txt"
        );
    }

    #[test]
    fn test_listing_rows() {
        let listing = sample_listing();
        let html = listing_page(&ListingView {
            dir: Path::new("/srv"),
            parent: Path::new("/"),
            listing: &listing,
            panel: None,
        });

        assert!(html.contains(r#"Current Directory: <a href="/?dir=%2F">/srv</a>"#));
        assert!(html.contains(r#"<a href="/?dir=%2Fsrv%2Fassets">"#));
        assert!(html.contains("<td>Folder</td>"));
        assert!(html.contains("<td>42 bytes</td>"));
        assert!(html.contains(r#"<a href="/?dir=%2Fsrv&amp;edit=index.html">Edit</a>"#));
        assert!(html.contains(r#"<a href="/?dir=%2Fsrv&amp;download=index.html">Download</a>"#));

        // Directories come before files
        let dir_pos = html.find("assets").unwrap();
        let file_pos = html.find("index.html").unwrap();
        assert!(dir_pos < file_pos);
        assert_eq!(html.matches("<tr><td>").count(), 2);
    }

    #[test]
    fn test_listing_escapes_names() {
        let listing = Listing {
            directories: vec![],
            files: vec![entry("<script>.txt", EntryKind::File, 1)],
        };
        let html = listing_page(&ListingView {
            dir: Path::new("/srv"),
            parent: Path::new("/"),
            listing: &listing,
            panel: None,
        });

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;.txt"));
    }

    #[test]
    fn test_edit_panel() {
        let listing = Listing::default();
        let html = listing_page(&ListingView {
            dir: Path::new("/srv"),
            parent: Path::new("/"),
            listing: &listing,
            panel: Some(Panel::Edit {
                name: "a\"b.html",
                content: "</textarea><b>x</b>",
            }),
        });

        assert!(html.contains("Edit File: a\"b.html"));
        assert!(html.contains(r#"value="a&quot;b.html""#));
        assert!(html.contains("&lt;/textarea&gt;&lt;b&gt;x&lt;/b&gt;</textarea>"));
        assert!(html.contains(r#"name="save_edit""#));
    }

    #[test]
    fn test_edit_panel_keeps_leading_newline() {
        let listing = Listing::default();
        let html = listing_page(&ListingView {
            dir: Path::new("/srv"),
            parent: Path::new("/"),
            listing: &listing,
            panel: Some(Panel::Edit {
                name: "notes.txt",
                content: "\nfirst line",
            }),
        });

        // Browsers drop one newline right after the opening tag.
        assert!(html.contains("<textarea name=\"file_content\">\n\nfirst line</textarea>"));
    }

    #[test]
    fn test_rename_panel() {
        let listing = Listing::default();
        let html = listing_page(&ListingView {
            dir: Path::new("/srv"),
            parent: Path::new("/"),
            listing: &listing,
            panel: Some(Panel::Rename { name: "old.txt" }),
        });

        assert!(html.contains("Rename: old.txt"));
        assert!(html.contains(r#"<input type="hidden" name="old_name" value="old.txt">"#));
        assert!(html.contains(r#"name="rename_file""#));
    }

    #[test]
    fn test_format_modified_shape() {
        let formatted = format_modified(SystemTime::now());
        assert_eq!(formatted.len(), 19);
        assert_eq!(&formatted[4..5], "-");
        assert_eq!(&formatted[13..14], ":");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("download"), "Download");
        assert_eq!(capitalize(""), "");
    }
}
