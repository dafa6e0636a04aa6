//! WebDAV remote store client.
//!
//! Backups live as flat files under one collection on the configured
//! server. Every failure is classified here, at the transport boundary,
//! into the closed [`WebDavError`] set; callers never inspect error
//! message text.

use std::time::Duration;

use chrono::DateTime;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{header, Method, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::WebDavConfig;

/// Collection (directory) holding all backup files on the server.
pub const BACKUP_COLLECTION: &str = "padlock";

const REQUEST_TIMEOUT_SECS: u64 = 30;
const BACKUP_EXTENSION: &str = ".json";

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:displayname/>
    <d:getlastmodified/>
    <d:getcontentlength/>
    <d:resourcetype/>
  </d:prop>
</d:propfind>"#;

/// Errors produced by the WebDAV transport, classified at the point of failure.
#[derive(Debug, Error)]
pub enum WebDavError {
    /// Server could not be reached
    #[error("Server unreachable: {0}")]
    Unreachable(String),

    /// Request timed out
    #[error("Connection timed out: {0}")]
    Timeout(String),

    /// Credentials rejected
    #[error("Authentication failed (HTTP {0})")]
    AuthFailed(u16),

    /// Remote path does not exist
    #[error("Remote path not found: {0}")]
    NotFound(String),

    /// Any other unexpected HTTP status
    #[error("Server returned HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// Request failed below the HTTP layer
    #[error("Transport error: {0}")]
    Transport(String),

    /// PROPFIND response could not be parsed
    #[error("Invalid listing response: {0}")]
    InvalidListing(String),

    /// Backup file name is empty or contains path separators
    #[error("Invalid backup file name: {0:?}")]
    InvalidName(String),
}

pub type WebDavResult<T> = std::result::Result<T, WebDavError>;

/// Metadata for one remote backup file; content is fetched on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupFile {
    /// File name within the backup collection
    pub name: String,
    /// Last-modified timestamp (Unix ms), 0 when the server omits it
    pub modified: i64,
    /// Size in bytes, 0 when the server omits it
    pub size: u64,
}

/// Client for one configured WebDAV endpoint.
pub struct WebDavClient {
    config: WebDavConfig,
    http: reqwest::Client,
}

impl WebDavClient {
    /// Build a client with a request-level timeout.
    ///
    /// Dropping a pending operation cancels the in-flight request.
    pub fn new(config: WebDavConfig) -> WebDavResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|error| WebDavError::Transport(error.to_string()))?;

        Ok(Self { config, http })
    }

    /// Attempt an authenticated round-trip and create the backup
    /// collection when missing.
    pub async fn test_connection(&self) -> WebDavResult<()> {
        self.propfind(&format!("{}/", self.config.server_url), "0")
            .await?;
        self.ensure_collection().await
    }

    /// Upload a backup payload under the given file name.
    pub async fn upload(&self, name: &str, bytes: Vec<u8>) -> WebDavResult<()> {
        let name = normalize_file_name(name)?;
        self.ensure_collection().await?;

        let response = self
            .request(Method::PUT, &self.file_url(&name))
            .header(header::CONTENT_TYPE, "application/json")
            .body(bytes)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!("uploaded backup {name}");
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(status_error(status, &name, message))
        }
    }

    /// List backup files in the collection, newest first.
    ///
    /// Ordering is enforced here rather than assumed of the server.
    pub async fn list(&self) -> WebDavResult<Vec<BackupFile>> {
        self.ensure_collection().await?;

        let body = self.propfind(&self.collection_url(), "1").await?;
        let mut files = parse_multistatus(&body)?;
        files.retain(|file| file.name.ends_with(BACKUP_EXTENSION));
        sort_newest_first(&mut files);
        Ok(files)
    }

    /// Download the raw bytes of a backup file.
    pub async fn download(&self, name: &str) -> WebDavResult<Vec<u8>> {
        let name = normalize_file_name(name)?;

        let response = self
            .request(Method::GET, &self.file_url(&name))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(status_error(status, &name, message));
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok(bytes.to_vec())
    }

    /// Delete a backup file.
    pub async fn delete(&self, name: &str) -> WebDavResult<()> {
        let name = normalize_file_name(name)?;

        let response = self
            .request(Method::DELETE, &self.file_url(&name))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!("deleted backup {name}");
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(status_error(status, &name, message))
        }
    }

    async fn ensure_collection(&self) -> WebDavResult<()> {
        let response = self
            .request(mkcol_method(), &self.collection_url())
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            // METHOD_NOT_ALLOWED means the collection already exists
            status if status.is_success() || status == StatusCode::METHOD_NOT_ALLOWED => Ok(()),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(status_error(status, BACKUP_COLLECTION, message))
            }
        }
    }

    async fn propfind(&self, url: &str, depth: &str) -> WebDavResult<String> {
        let response = self
            .request(propfind_method(), url)
            .header("Depth", depth)
            .header(header::CONTENT_TYPE, "application/xml")
            .body(PROPFIND_BODY)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(status_error(status, url, message));
        }

        response.text().await.map_err(transport_error)
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.config.username, Some(&self.config.password))
    }

    fn collection_url(&self) -> String {
        format!("{}/{BACKUP_COLLECTION}/", self.config.server_url)
    }

    fn file_url(&self, name: &str) -> String {
        format!(
            "{}/{BACKUP_COLLECTION}/{}",
            self.config.server_url,
            urlencoding::encode(name)
        )
    }
}

fn propfind_method() -> Method {
    Method::from_bytes(b"PROPFIND").expect("static method token")
}

fn mkcol_method() -> Method {
    Method::from_bytes(b"MKCOL").expect("static method token")
}

fn transport_error(error: reqwest::Error) -> WebDavError {
    if error.is_timeout() {
        WebDavError::Timeout(error.to_string())
    } else if error.is_connect() {
        WebDavError::Unreachable(error.to_string())
    } else {
        WebDavError::Transport(error.to_string())
    }
}

fn status_error(status: StatusCode, path: &str, message: String) -> WebDavError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            WebDavError::AuthFailed(status.as_u16())
        }
        StatusCode::NOT_FOUND => WebDavError::NotFound(path.to_string()),
        _ => WebDavError::Server {
            status: status.as_u16(),
            message: compact(&message),
        },
    }
}

fn normalize_file_name(name: &str) -> WebDavResult<String> {
    let name = name.trim().trim_matches('/');
    if name.is_empty() || name.contains('/') {
        return Err(WebDavError::InvalidName(name.to_string()));
    }
    Ok(name.to_string())
}

fn sort_newest_first(files: &mut [BackupFile]) {
    files.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| b.name.cmp(&a.name))
    });
}

fn compact(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a PROPFIND multistatus body into listing entries.
///
/// Public for testability — callers can exercise parsing without a server.
/// Namespace prefixes are ignored; entries whose `resourcetype` marks a
/// collection are dropped. Names come from `displayname` when present,
/// otherwise from the decoded `href` basename.
pub fn parse_multistatus(body: &str) -> WebDavResult<Vec<BackupFile>> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut files = Vec::new();
    let mut current: Option<PendingEntry> = None;
    let mut field = TextField::None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => match element.local_name().as_ref() {
                b"response" => current = Some(PendingEntry::default()),
                b"href" => field = TextField::Href,
                b"displayname" => field = TextField::DisplayName,
                b"getlastmodified" => field = TextField::Modified,
                b"getcontentlength" => field = TextField::Size,
                b"collection" => mark_collection(current.as_mut()),
                _ => {}
            },
            Ok(Event::Empty(element)) => {
                if element.local_name().as_ref() == b"collection" {
                    mark_collection(current.as_mut());
                }
            }
            Ok(Event::Text(text)) => {
                if let Some(entry) = current.as_mut() {
                    let value = text
                        .unescape()
                        .map_err(|error| WebDavError::InvalidListing(error.to_string()))?;
                    entry.assign(field, value.trim());
                }
            }
            Ok(Event::End(element)) => match element.local_name().as_ref() {
                b"response" => {
                    if let Some(file) = current.take().and_then(PendingEntry::into_backup_file) {
                        files.push(file);
                    }
                    field = TextField::None;
                }
                b"href" | b"displayname" | b"getlastmodified" | b"getcontentlength" => {
                    field = TextField::None;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(error) => return Err(WebDavError::InvalidListing(error.to_string())),
            Ok(_) => {}
        }
    }

    Ok(files)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TextField {
    None,
    Href,
    DisplayName,
    Modified,
    Size,
}

#[derive(Default)]
struct PendingEntry {
    href: String,
    display_name: String,
    modified: Option<i64>,
    size: Option<u64>,
    is_collection: bool,
}

impl PendingEntry {
    fn assign(&mut self, field: TextField, value: &str) {
        match field {
            TextField::Href => self.href = value.to_string(),
            TextField::DisplayName => self.display_name = value.to_string(),
            TextField::Modified => self.modified = parse_http_date(value),
            TextField::Size => self.size = value.parse().ok(),
            TextField::None => {}
        }
    }

    fn into_backup_file(self) -> Option<BackupFile> {
        if self.is_collection {
            return None;
        }

        let name = if self.display_name.is_empty() {
            href_basename(&self.href)?
        } else {
            self.display_name
        };

        Some(BackupFile {
            name,
            modified: self.modified.unwrap_or(0),
            size: self.size.unwrap_or(0),
        })
    }
}

fn mark_collection(current: Option<&mut PendingEntry>) {
    if let Some(entry) = current {
        entry.is_collection = true;
    }
}

fn parse_http_date(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|moment| moment.timestamp_millis())
}

fn href_basename(href: &str) -> Option<String> {
    let basename = href.trim_end_matches('/').rsplit('/').next()?;
    if basename.is_empty() {
        return None;
    }

    let decoded = urlencoding::decode(basename)
        .map_or_else(|_| basename.to_string(), |value| value.into_owned());
    Some(decoded)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SAMPLE_MULTISTATUS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:multistatus xmlns:d="DAV:">
  <d:response>
    <d:href>/remote.php/dav/files/alice/padlock/</d:href>
    <d:propstat>
      <d:prop>
        <d:displayname>padlock</d:displayname>
        <d:resourcetype><d:collection/></d:resourcetype>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>/remote.php/dav/files/alice/padlock/padlock-backup-20250701-080000.json</d:href>
    <d:propstat>
      <d:prop>
        <d:displayname>padlock-backup-20250701-080000.json</d:displayname>
        <d:getlastmodified>Tue, 01 Jul 2025 08:00:00 GMT</d:getlastmodified>
        <d:getcontentlength>2048</d:getcontentlength>
        <d:resourcetype/>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>/remote.php/dav/files/alice/padlock/padlock-backup-20250801-090000.json</d:href>
    <d:propstat>
      <d:prop>
        <d:getlastmodified>Fri, 01 Aug 2025 09:00:00 GMT</d:getlastmodified>
        <d:getcontentlength>4096</d:getcontentlength>
        <d:resourcetype/>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

    #[test]
    fn parse_multistatus_extracts_files_and_drops_collections() {
        let files = parse_multistatus(SAMPLE_MULTISTATUS).unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "padlock-backup-20250701-080000.json");
        assert_eq!(files[0].size, 2048);
        assert!(files[0].modified > 0);
    }

    #[test]
    fn parse_multistatus_falls_back_to_decoded_href_basename() {
        let files = parse_multistatus(SAMPLE_MULTISTATUS).unwrap();

        // Second entry has no displayname; name comes from its href.
        assert_eq!(files[1].name, "padlock-backup-20250801-090000.json");
    }

    #[test]
    fn parse_multistatus_rejects_malformed_xml() {
        let error = parse_multistatus("<d:multistatus><unclosed").unwrap_err();
        assert!(matches!(error, WebDavError::InvalidListing(_)));
    }

    #[test]
    fn sort_newest_first_orders_by_modified_then_name() {
        let mut files = vec![
            BackupFile {
                name: "padlock-backup-20250701-080000.json".to_string(),
                modified: 1_000,
                size: 1,
            },
            BackupFile {
                name: "padlock-backup-20250801-090000.json".to_string(),
                modified: 2_000,
                size: 1,
            },
            BackupFile {
                name: "padlock-backup-20250801-090001.json".to_string(),
                modified: 2_000,
                size: 1,
            },
        ];

        sort_newest_first(&mut files);

        assert_eq!(files[0].name, "padlock-backup-20250801-090001.json");
        assert_eq!(files[1].name, "padlock-backup-20250801-090000.json");
        assert_eq!(files[2].modified, 1_000);
    }

    #[test]
    fn status_error_classifies_auth_and_missing_paths() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, "x", String::new()),
            WebDavError::AuthFailed(401)
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, "x", String::new()),
            WebDavError::AuthFailed(403)
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, "backup.json", String::new()),
            WebDavError::NotFound(path) if path == "backup.json"
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "x", "boom".to_string()),
            WebDavError::Server { status: 500, .. }
        ));
    }

    #[test]
    fn normalize_file_name_rejects_empty_and_nested_paths() {
        assert_eq!(
            normalize_file_name(" backup.json ").unwrap(),
            "backup.json"
        );
        assert!(matches!(
            normalize_file_name("   "),
            Err(WebDavError::InvalidName(_))
        ));
        assert!(matches!(
            normalize_file_name("a/b.json"),
            Err(WebDavError::InvalidName(_))
        ));
    }

    #[test]
    fn parse_http_date_reads_rfc1123_timestamps() {
        let parsed = parse_http_date("Fri, 01 Aug 2025 09:00:00 GMT").unwrap();
        assert_eq!(parsed, 1_754_038_800_000);

        assert_eq!(parse_http_date("not a date"), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_connection_classifies_unreachable_endpoints() {
        let config = WebDavConfig::new("http://127.0.0.1:9", "alice", "pw").unwrap();
        let client = WebDavClient::new(config).unwrap();

        let error = client.test_connection().await.unwrap_err();
        assert!(matches!(error, WebDavError::Unreachable(_)), "{error:?}");
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "Requires PADLOCK_WEBDAV_URL/USERNAME/PASSWORD plus network access"]
    async fn webdav_roundtrip_upload_list_download_delete() {
        let url = std::env::var("PADLOCK_WEBDAV_URL").expect("PADLOCK_WEBDAV_URL must be set");
        let username =
            std::env::var("PADLOCK_WEBDAV_USERNAME").expect("PADLOCK_WEBDAV_USERNAME must be set");
        let password =
            std::env::var("PADLOCK_WEBDAV_PASSWORD").expect("PADLOCK_WEBDAV_PASSWORD must be set");

        let config = WebDavConfig::new(url, username, password).unwrap();
        let client = WebDavClient::new(config).unwrap();
        client.test_connection().await.unwrap();

        let name = "padlock-backup-roundtrip-test.json";
        client
            .upload(name, br#"{"passwords":[],"secure_items":[]}"#.to_vec())
            .await
            .unwrap();

        let listed = client.list().await.unwrap();
        assert!(listed.iter().any(|file| file.name == name));

        let bytes = client.download(name).await.unwrap();
        assert!(!bytes.is_empty());

        client.delete(name).await.unwrap();
    }
}
