//! Google Drive remote space client.
//!
//! Implements [`RemoteSpace`] over the Drive v3 REST API with plain
//! `reqwest` calls — no vendor SDK. Queries use the `q` attribute filter
//! language (`name=`, `mimeType=`, `'..' in parents`), folder creation is a
//! metadata-only `files.create`, uploads use a `multipart/related` body,
//! and reparenting is a single `files.update` with `addParents` /
//! `removeParents`.
//!
//! # Configuration
//!
//! ```toml
//! [remote]
//! api_base = "https://www.googleapis.com/drive/v3"
//! upload_base = "https://www.googleapis.com/upload/drive/v3"
//! token_url = "https://oauth2.googleapis.com/token"
//! timeout_secs = 30
//! ```
//!
//! # Environment Variables
//!
//! Credentials are read from environment variables:
//! - `GOOGLE_ACCESS_TOKEN` — optional; used as-is when set (no exchange)
//! - `GOOGLE_CLIENT_ID` — required otherwise
//! - `GOOGLE_CLIENT_SECRET` — required otherwise
//! - `GOOGLE_REFRESH_TOKEN` — required otherwise
//!
//! # Authentication
//!
//! With a refresh token, the client performs one refresh-token grant
//! against `token_url` at connect time and holds the resulting access
//! token for the run. Retry, backoff, and token renewal mid-run are outside
//! this client; a failed call aborts the export, and re-running is safe.
//!
//! # Pagination
//!
//! `files.list` responses are followed through `nextPageToken` until the
//! listing is complete.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::config::RemoteConfig;
use crate::error::ExportError;
use crate::remote::{NewFile, NodeQuery, RemoteNode, RemoteSpace, FOLDER_MIME};

/// A connected Drive client holding the access token for one run.
pub struct DriveRemote {
    client: reqwest::Client,
    api_base: String,
    upload_base: String,
    access_token: String,
}

// ============ Credentials ============

/// OAuth credentials loaded from environment variables.
struct DriveCredentials {
    access_token: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
}

impl DriveCredentials {
    fn from_env() -> Result<Self> {
        let access_token = std::env::var("GOOGLE_ACCESS_TOKEN").ok();
        if access_token.is_some() {
            return Ok(Self {
                access_token,
                client_id: None,
                client_secret: None,
                refresh_token: None,
            });
        }
        let client_id = std::env::var("GOOGLE_CLIENT_ID")
            .context("GOOGLE_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET")
            .context("GOOGLE_CLIENT_SECRET environment variable not set")?;
        let refresh_token = std::env::var("GOOGLE_REFRESH_TOKEN")
            .context("GOOGLE_REFRESH_TOKEN environment variable not set")?;
        Ok(Self {
            access_token: None,
            client_id: Some(client_id),
            client_secret: Some(client_secret),
            refresh_token: Some(refresh_token),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

// ============ Wire types ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    parents: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FileParents {
    #[serde(default)]
    parents: Vec<String>,
}

impl DriveRemote {
    /// Read credentials from the environment, exchange the refresh token if
    /// needed, and return a client ready to issue calls.
    pub async fn connect(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("building HTTP client")?;

        let creds = DriveCredentials::from_env()?;
        let access_token = match creds.access_token {
            Some(token) => token,
            None => {
                exchange_refresh_token(
                    &client,
                    &config.token_url,
                    creds.client_id.as_deref().unwrap_or_default(),
                    creds.client_secret.as_deref().unwrap_or_default(),
                    creds.refresh_token.as_deref().unwrap_or_default(),
                )
                .await?
            }
        };

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            upload_base: config.upload_base.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    /// Issue one harmless listing call to verify credentials and
    /// connectivity. Used by `wmir check`.
    pub async fn probe(&self) -> Result<()> {
        let url = format!("{}/files", self.api_base);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("pageSize", "1"), ("fields", "files(id)")])
            .send()
            .await
            .map_err(|e| remote_err("files.list", e))?;
        check_status("files.list", resp).await?;
        Ok(())
    }
}

async fn exchange_refresh_token(
    client: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<String> {
    let params = [
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];
    let resp = client
        .post(token_url)
        .form(&params)
        .send()
        .await
        .map_err(|e| remote_err("token exchange", e))?;
    let resp = check_status("token exchange", resp).await?;
    let token: TokenResponse = resp
        .json()
        .await
        .map_err(|e| remote_err("token exchange", e))?;
    Ok(token.access_token)
}

#[async_trait]
impl RemoteSpace for DriveRemote {
    async fn query(&self, filter: &NodeQuery<'_>) -> Result<Vec<RemoteNode>> {
        let q = build_query(filter);
        let url = format!("{}/files", self.api_base);

        let mut nodes = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut params = vec![
                ("q".to_string(), q.clone()),
                (
                    "fields".to_string(),
                    "nextPageToken, files(id, name, mimeType, parents)".to_string(),
                ),
                ("pageSize".to_string(), "100".to_string()),
            ];
            if let Some(ref token) = page_token {
                params.push(("pageToken".to_string(), token.clone()));
            }

            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&params)
                .send()
                .await
                .map_err(|e| remote_err("files.list", e))?;
            let resp = check_status("files.list", resp).await?;
            let list: FileList = resp
                .json()
                .await
                .map_err(|e| remote_err("files.list", e))?;

            nodes.extend(list.files.into_iter().map(|f| RemoteNode {
                id: f.id,
                name: f.name,
                mime_type: f.mime_type,
                parents: f.parents,
            }));

            match list.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(nodes)
    }

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<String> {
        let mut metadata = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME,
        });
        if let Some(parent) = parent {
            metadata["parents"] = serde_json::json!([parent]);
        }

        let url = format!("{}/files", self.api_base);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(&[("fields", "id")])
            .json(&metadata)
            .send()
            .await
            .map_err(|e| remote_err("files.create", e))?;
        let resp = check_status("files.create", resp).await?;
        let created: CreatedFile = resp
            .json()
            .await
            .map_err(|e| remote_err("files.create", e))?;
        Ok(created.id)
    }

    async fn create_file(&self, spec: &NewFile<'_>) -> Result<String> {
        let content = tokio::fs::read(spec.source).await.with_context(|| {
            format!("reading upload source: {}", spec.source.display())
        })?;

        let metadata = serde_json::json!({
            "name": spec.name,
            "parents": [spec.parent],
            "mimeType": spec.mime_type,
        });
        let boundary = format!("wmir-{}", Uuid::new_v4());
        let body = multipart_related(&boundary, &metadata, spec.content_type, &content);

        let url = format!("{}/files", self.upload_base);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header(
                "Content-Type",
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| remote_err("files.create (upload)", e))?;
        let resp = check_status("files.create (upload)", resp).await?;
        let created: CreatedFile = resp
            .json()
            .await
            .map_err(|e| remote_err("files.create (upload)", e))?;
        Ok(created.id)
    }

    async fn get_parents(&self, id: &str) -> Result<Vec<String>> {
        let url = format!("{}/files/{}", self.api_base, id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("fields", "parents")])
            .send()
            .await
            .map_err(|e| remote_err("files.get", e))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ExportError::StaleReference {
                name: String::new(),
                remote_id: id.to_string(),
            }
            .into());
        }
        let resp = check_status("files.get", resp).await?;
        let file: FileParents = resp.json().await.map_err(|e| remote_err("files.get", e))?;
        Ok(file.parents)
    }

    async fn set_parents(&self, id: &str, add: &str, remove: &[String]) -> Result<()> {
        let url = format!("{}/files/{}", self.api_base, id);
        let mut params = vec![
            ("addParents".to_string(), add.to_string()),
            ("fields".to_string(), "id, parents".to_string()),
        ];
        if !remove.is_empty() {
            params.push(("removeParents".to_string(), remove.join(",")));
        }

        let resp = self
            .client
            .patch(&url)
            .bearer_auth(&self.access_token)
            .query(&params)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| remote_err("files.update", e))?;
        check_status("files.update", resp).await?;
        Ok(())
    }
}

// ============ Request helpers ============

/// Build the `q` attribute filter expression for a [`NodeQuery`].
fn build_query(filter: &NodeQuery<'_>) -> String {
    let mut q = format!("name='{}'", escape_q(filter.name));
    if let Some(mime) = filter.mime_type {
        q.push_str(&format!(" and mimeType='{mime}'"));
    }
    if let Some(parent) = filter.parent {
        q.push_str(&format!(" and '{}' in parents", escape_q(parent)));
    }
    q.push_str(" and trashed=false");
    q
}

/// Escape a value for embedding in a single-quoted `q` string literal.
fn escape_q(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Assemble a `multipart/related` upload body: a JSON metadata part
/// followed by the content part.
fn multipart_related(
    boundary: &str,
    metadata: &serde_json::Value,
    content_type: &str,
    content: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 512);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: {content_type}\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

fn remote_err(op: &str, detail: impl std::fmt::Display) -> anyhow::Error {
    ExportError::RemoteUnavailable {
        op: op.to_string(),
        detail: detail.to_string(),
    }
    .into()
}

/// Map a non-success HTTP status to [`ExportError::RemoteUnavailable`],
/// keeping a truncated response body for diagnosis.
async fn check_status(op: &str, resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(remote_err(
        op,
        format!(
            "HTTP {}: {}",
            status,
            body.chars().take(500).collect::<String>()
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_includes_all_filters() {
        let q = build_query(&NodeQuery {
            name: "Home",
            mime_type: Some(FOLDER_MIME),
            parent: Some("folder-1"),
        });
        assert_eq!(
            q,
            "name='Home' and mimeType='application/vnd.google-apps.folder' \
             and 'folder-1' in parents and trashed=false"
        );
    }

    #[test]
    fn query_escapes_single_quotes() {
        let q = build_query(&NodeQuery {
            name: "Bob's Page",
            mime_type: None,
            parent: None,
        });
        assert_eq!(q, "name='Bob\\'s Page' and trashed=false");
    }

    #[test]
    fn multipart_body_shape() {
        let metadata = serde_json::json!({ "name": "_Home" });
        let body = multipart_related("b1", &metadata, "text/html", b"<p>hi</p>");
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("--b1\r\nContent-Type: application/json"));
        assert!(text.contains("\"name\":\"_Home\""));
        assert!(text.contains("Content-Type: text/html\r\n\r\n<p>hi</p>"));
        assert!(text.ends_with("\r\n--b1--\r\n"));
    }
}
