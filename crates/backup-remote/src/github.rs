//! Remote store backed by the GitHub contents API
//!
//! Content is fetched through `/contents`; objects larger than the inline
//! ceiling are fetched through `/git/blobs/{sha}` instead. The last change
//! time of a path is the committer date of its newest commit.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ExclusionRules, ObjectMeta, RemoteError, RemoteStore, Result, normalize_remote_path};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Largest object the contents endpoint returns inline.
pub const INLINE_CONTENT_LIMIT: u64 = 1_000_000;

/// One entry of a `/contents` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub content: Option<String>,
}

/// `/contents` returns an object for a file and an array for a directory.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ContentsResponse {
    File(ContentEntry),
    Dir(Vec<ContentEntry>),
}

#[derive(Debug, Deserialize)]
struct BlobResponse {
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitEntry {
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    committer: Option<CommitActor>,
}

#[derive(Debug, Deserialize)]
struct CommitActor {
    date: String,
}

#[derive(Debug, Serialize)]
struct PutRequest<'a> {
    message: String,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    message: String,
    sha: String,
    branch: &'a str,
}

/// A [`RemoteStore`] over one branch of a GitHub repository.
#[derive(Debug, Clone)]
pub struct GitHubStore {
    client: Client,
    api_url: String,
    repo: String,
    branch: String,
}

impl GitHubStore {
    /// Create a store for `repo` (`owner/name`) on `branch`.
    pub fn new(repo: &str, token: Option<&str>, branch: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("file-backup"));
        headers.insert("x-github-api-version", HeaderValue::from_static("2022-11-28"));
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| RemoteError::transport(repo, e))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| RemoteError::transport(repo, e))?;

        Ok(Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
            repo: repo.to_string(),
            branch: branch.to_string(),
        })
    }

    /// Point the store at a different API root (GitHub Enterprise).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str, segments: &[&str], remote_path: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/repos/{}", self.api_url, self.repo))
            .map_err(|e| RemoteError::transport(path, e))?;
        {
            let mut parts = url
                .path_segments_mut()
                .map_err(|_| RemoteError::transport(path, "API url cannot be a base"))?;
            parts.extend(segments);
            parts.extend(remote_path.split('/').filter(|p| !p.is_empty()));
        }
        Ok(url)
    }

    fn send(&self, path: &str, request: RequestBuilder) -> Result<Response> {
        request
            .send()
            .map_err(|e| RemoteError::transport(path, e))
    }

    fn contents(&self, path: &str) -> Result<ContentsResponse> {
        let url = self.url(path, &["contents"], path)?;
        let response = self.send(path, self.client.get(url).query(&[("ref", &self.branch)]))?;
        let response = check_status(path, response)?;
        response
            .json::<ContentsResponse>()
            .map_err(|e| RemoteError::decode(path, e))
    }

    fn file_entry(&self, path: &str) -> Result<ContentEntry> {
        match self.contents(path)? {
            ContentsResponse::File(entry) if entry.kind == "file" => Ok(entry),
            _ => Err(RemoteError::not_found(path)),
        }
    }

    /// Current blob sha of `path`, or `None` when it does not exist.
    fn current_sha(&self, path: &str) -> Result<Option<String>> {
        match self.file_entry(path) {
            Ok(entry) => Ok(Some(entry.sha)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn fetch_blob(&self, path: &str, sha: &str) -> Result<Vec<u8>> {
        debug!(path, sha, "fetching large object through the blobs API");
        let url = self.url(path, &["git", "blobs", sha], "")?;
        let response = check_status(path, self.send(path, self.client.get(url))?)?;
        let blob = response
            .json::<BlobResponse>()
            .map_err(|e| RemoteError::decode(path, e))?;
        match blob.encoding.as_deref() {
            None | Some("base64") => decode_content(path, &blob.content),
            Some("utf-8") => Ok(blob.content.into_bytes()),
            Some(other) => Err(RemoteError::decode(
                path,
                format!("unsupported encoding '{other}'"),
            )),
        }
    }

    fn collect(&self, path: &str, rules: &ExclusionRules, out: &mut Vec<String>) -> Result<()> {
        match self.contents(path)? {
            ContentsResponse::File(entry) => {
                if entry.kind == "file" && !rules.is_excluded(&entry.path) {
                    out.push(entry.path);
                }
            }
            ContentsResponse::Dir(mut entries) => {
                entries.sort_by(|a, b| a.path.cmp(&b.path));
                for entry in entries {
                    match entry.kind.as_str() {
                        "file" if !rules.is_excluded(&entry.path) => out.push(entry.path),
                        "dir" if !rules.is_excluded_dir(&entry.path) => {
                            self.collect(&entry.path, rules, out)?
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }
}

impl RemoteStore for GitHubStore {
    fn describe(&self) -> String {
        format!("github:{}@{}", self.repo, self.branch)
    }

    fn get_object_content(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize_remote_path(path);
        let entry = self.file_entry(&path)?;
        match entry.content.as_deref() {
            Some(inline) if !needs_blob_fallback(&entry) => decode_content(&path, inline),
            _ => self.fetch_blob(&path, &entry.sha),
        }
    }

    fn get_object_meta(&self, path: &str) -> Result<ObjectMeta> {
        let path = normalize_remote_path(path);
        let entry = self.file_entry(&path)?;
        Ok(ObjectMeta {
            path: entry.path,
            size: entry.size,
            identity: entry.sha,
        })
    }

    fn get_last_change_time(&self, path: &str) -> Result<DateTime<Utc>> {
        let path = normalize_remote_path(path);
        let url = self.url(&path, &["commits"], "")?;
        let request = self.client.get(url).query(&[
            ("path", path.as_str()),
            ("sha", self.branch.as_str()),
            ("per_page", "1"),
        ]);
        let response = check_status(&path, self.send(&path, request)?)?;
        let body = response.text().map_err(|e| RemoteError::transport(&path, e))?;
        parse_last_commit_date(&path, &body)
    }

    fn put_object(&self, path: &str, content: &[u8]) -> Result<()> {
        let path = normalize_remote_path(path);
        let sha = self.current_sha(&path)?;
        let verb = if sha.is_some() { "Update" } else { "Create" };
        let body = PutRequest {
            message: format!("{verb} {path} via file-backup"),
            content: STANDARD.encode(content),
            branch: &self.branch,
            sha,
        };
        let url = self.url(&path, &["contents"], &path)?;
        let response = self.send(&path, self.client.put(url).json(&body))?;
        check_status(&path, response)?;
        debug!(path = %path, verb, "object written");
        Ok(())
    }

    fn delete_object(&self, path: &str) -> Result<()> {
        let path = normalize_remote_path(path);
        let sha = self
            .current_sha(&path)?
            .ok_or_else(|| RemoteError::not_found(&path))?;
        let body = DeleteRequest {
            message: format!("Delete {path} via file-backup"),
            sha,
            branch: &self.branch,
        };
        let url = self.url(&path, &["contents"], &path)?;
        let response = self.send(&path, self.client.delete(url).json(&body))?;
        check_status(&path, response)?;
        Ok(())
    }

    fn list_objects(&self, prefix: &str, rules: &ExclusionRules) -> Result<Vec<String>> {
        let prefix = normalize_remote_path(prefix);
        if rules.is_excluded_dir(&prefix) {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        self.collect(&prefix, rules, &mut out)?;
        Ok(out)
    }
}

/// Whether the inline payload of a contents entry cannot be used.
pub fn needs_blob_fallback(entry: &ContentEntry) -> bool {
    entry.size > INLINE_CONTENT_LIMIT
        || entry
            .content
            .as_deref()
            .is_none_or(|c| c.trim().is_empty() && entry.size > 0)
}

/// Decode a base64 payload as returned by the API (wrapped at 60 columns).
pub fn decode_content(path: &str, encoded: &str) -> Result<Vec<u8>> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| RemoteError::decode(path, e))
}

/// Committer date of the first entry of a `/commits` response.
pub fn parse_last_commit_date(path: &str, body: &str) -> Result<DateTime<Utc>> {
    let commits: Vec<CommitEntry> =
        serde_json::from_str(body).map_err(|e| RemoteError::decode(path, e))?;
    let date = commits
        .into_iter()
        .next()
        .and_then(|c| c.commit.committer)
        .map(|actor| actor.date)
        .ok_or_else(|| RemoteError::not_found(path))?;
    DateTime::parse_from_rfc3339(&date)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RemoteError::decode(path, e))
}

/// Map a non-success HTTP status onto the remote error taxonomy.
pub fn status_error(path: &str, status: StatusCode) -> Option<RemoteError> {
    if status.is_success() {
        return None;
    }
    Some(match status {
        StatusCode::NOT_FOUND => RemoteError::not_found(path),
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => RemoteError::Stale {
            path: path.to_string(),
        },
        other => RemoteError::transport(path, format!("HTTP {other}")),
    })
}

fn check_status(path: &str, response: Response) -> Result<Response> {
    match status_error(path, response.status()) {
        Some(err) => Err(err),
        None => Ok(response),
    }
}
