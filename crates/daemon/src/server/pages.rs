//! HTML pages rendered with maud.

use maud::{html, Markup, PreEscaped, DOCTYPE};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::files::DirectoryEntry;

/// Characters escaped inside one URL path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Seconds before the upload acknowledgment returns to the listing.
pub const UPLOAD_REDIRECT_SECS: u32 = 10;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 2rem auto; max-width: 60rem; padding: 0 1rem; color: #222; }
h1 { font-size: 1.4rem; word-break: break-all; }
form { margin: 0.5rem 0 1rem; }
table { border-collapse: collapse; width: 100%; }
th, td { text-align: left; padding: 0.4rem 0.6rem; border-bottom: 1px solid #ddd; vertical-align: middle; }
th { background: #f4f4f4; }
td.thumb { width: 110px; }
td.thumb img { max-width: 100px; max-height: 100px; display: block; }
a { color: #0a58ca; text-decoration: none; }
a:hover { text-decoration: underline; }
.devices { margin-top: 2rem; color: #555; }
"#;

const DEVICE_SCRIPT: &str = r#"
function refreshDevices() {
  fetch('/connected_devices')
    .then(function (r) { return r.json(); })
    .then(function (data) {
      var list = document.getElementById('device-list');
      list.innerHTML = '';
      data.connected_devices.forEach(function (d) {
        var li = document.createElement('li');
        li.textContent = d.ip + ' - ' + d.browser + ' - ' + d.os;
        list.appendChild(li);
      });
    })
    .catch(function () {});
}
fetch('/connect', { method: 'POST' }).finally(refreshDevices);
setInterval(refreshDevices, 5000);
"#;

/// Percent-encode a `/`-separated relative path for use in a URL.
pub fn encode_path(relative: &str) -> String {
    relative
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| utf8_percent_encode(s, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Listing URL of the parent of `subpath`.
fn parent_href(subpath: &str) -> String {
    let trimmed = subpath.trim_matches('/');
    match trimmed.rsplit_once('/') {
        Some((parent, _)) => format!("/{}", encode_path(parent)),
        None => "/".to_string(),
    }
}

fn layout(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                style { (PreEscaped(STYLE)) }
            }
            body { (body) }
        }
    }
}

/// Directory listing with search, upload form and the connected device list.
pub fn listing_page(subpath: &str, search: &str, entries: &[DirectoryEntry]) -> Markup {
    let subpath = subpath.trim_matches('/');
    let current = format!("/{}", encode_path(subpath));
    let heading = format!("Files in /{}", subpath);

    layout(
        &heading,
        html! {
            h1 { (heading) }

            form method="get" action=(current) {
                input type="text" name="search" placeholder="Search files" value=(search);
                " "
                button type="submit" { "Search" }
            }

            form method="post" action="/upload" enctype="multipart/form-data" {
                input type="file" name="files" multiple;
                " "
                button type="submit" { "Upload" }
            }

            @if !subpath.is_empty() {
                p { a href=(parent_href(subpath)) { "\u{2190} Parent folder" } }
            }

            table {
                thead {
                    tr {
                        th { "Preview" }
                        th { "Name" }
                        th { "Type" }
                        th { "Size" }
                        th { "Action" }
                    }
                }
                tbody {
                    @for entry in entries {
                        tr {
                            td class="thumb" {
                                @if let Some(thumbnail) = &entry.thumbnail {
                                    img src=(thumbnail.to_data_uri()) alt=(entry.name);
                                }
                            }
                            @let href = encode_path(&entry.relative_path);
                            @if entry.is_dir() {
                                td { a href={ "/" (href) } { (entry.name) "/" } }
                            } @else {
                                td { (entry.name) }
                            }
                            td { (entry.type_label) }
                            td { (entry.size_label) }
                            td {
                                @if entry.is_dir() {
                                    a href={ "/" (href) } { "Open" }
                                } @else {
                                    a href={ "/download/" (href) } { "Download" }
                                }
                            }
                        }
                    }
                    @if entries.is_empty() {
                        tr { td colspan="5" { "No files found." } }
                    }
                }
            }

            div class="devices" {
                h2 { "Connected devices" }
                ul id="device-list" {}
            }
            script { (PreEscaped(DEVICE_SCRIPT)) }
        },
    )
}

/// Acknowledgment after an upload, returning to the listing after a delay.
pub fn upload_success_page(saved: &[String]) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta http-equiv="refresh" content={ (UPLOAD_REDIRECT_SECS) "; url=/" };
                title { "Upload complete" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                h1 { "File Successfully Uploaded!" }
                @if !saved.is_empty() {
                    ul {
                        @for name in saved {
                            li { (name) }
                        }
                    }
                }
                p {
                    "Returning to the file list in " (UPLOAD_REDIRECT_SECS) " seconds. "
                    a href="/" { "Go back now" }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::EntryKind;
    use std::path::PathBuf;

    fn entry(name: &str, relative: &str, kind: EntryKind) -> DirectoryEntry {
        DirectoryEntry {
            name: name.to_string(),
            path: PathBuf::from("/share").join(relative),
            kind,
            type_label: if kind.is_dir() { "Folder".into() } else { ".txt".into() },
            size: 5,
            size_label: if kind.is_dir() { "-".into() } else { "5.00 B".into() },
            relative_path: relative.to_string(),
            thumbnail: None,
        }
    }

    #[test]
    fn test_encode_path() {
        assert_eq!(encode_path("docs/My File.txt"), "docs/My%20File.txt");
        assert_eq!(encode_path("/a//b/"), "a/b");
        assert_eq!(encode_path("100%#?.txt"), "100%25%23%3F.txt");
        assert_eq!(encode_path(""), "");
    }

    #[test]
    fn test_parent_href() {
        assert_eq!(parent_href("docs"), "/");
        assert_eq!(parent_href("docs/2024 taxes"), "/docs");
        assert_eq!(parent_href("a b/c/d"), "/a%20b/c");
    }

    #[test]
    fn test_listing_page_links() {
        let entries = vec![
            entry("sub dir", "docs/sub dir", EntryKind::Directory),
            entry("a.txt", "docs/a.txt", EntryKind::File),
        ];
        let page = listing_page("docs", "", &entries).into_string();

        assert!(page.contains("Files in /docs"));
        assert!(page.contains(r#"href="/docs/sub%20dir""#));
        assert!(page.contains(r#"href="/download/docs/a.txt""#));
        assert!(page.contains(r#"action="/docs""#));
        assert!(page.contains(r#"name="files""#));
        assert!(page.contains("Parent folder"));
        assert!(page.contains("/connected_devices"));
    }

    #[test]
    fn test_listing_page_escapes_names() {
        let entries = vec![entry("<script>.txt", "<script>.txt", EntryKind::File)];
        let page = listing_page("", "<b>", &entries).into_string();

        assert!(page.contains("&lt;script&gt;.txt"));
        assert!(page.contains(r#"value="&lt;b&gt;""#));
        assert!(!page.contains("Parent folder"));
    }

    #[test]
    fn test_empty_listing() {
        let page = listing_page("", "zzz", &[]).into_string();
        assert!(page.contains("No files found."));
    }

    #[test]
    fn test_upload_success_page() {
        let page = upload_success_page(&["report.pdf".to_string()]).into_string();
        assert!(page.contains("File Successfully Uploaded!"));
        assert!(page.contains("report.pdf"));
        assert!(page.contains(r#"content="10; url=/""#));
    }
}
