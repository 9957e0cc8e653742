//! Remote space abstraction for wiki-mirror.
//!
//! The [`RemoteSpace`] trait defines the handful of operations the
//! reconciliation core needs from the remote store, enabling pluggable
//! backends (Google Drive over REST, in-memory for tests).
//!
//! The remote model is deliberately thin: nodes are addressed by
//! name + parent through [`query`](RemoteSpace::query), never by path, and
//! the API offers no transactions, no unique-name constraint, and no
//! server-side upsert. Everything idempotent about this system is built in
//! the layer above, on top of these primitives.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

/// Mime type Drive uses for folders.
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
/// Mime type Drive uses for native documents (page dumps, linked docs).
pub const DOCUMENT_MIME: &str = "application/vnd.google-apps.document";
/// Mime type Drive uses for native spreadsheets (linked docs).
pub const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// A node as the remote space reports it.
///
/// `id` is opaque and stable once created. `parents` is a set in the remote
/// model; this system treats each node as having exactly one logical parent
/// and always fully replaces the set on move.
#[derive(Debug, Clone)]
pub struct RemoteNode {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub parents: Vec<String>,
}

/// Attribute filter for [`RemoteSpace::query`].
///
/// `name` is always required; `mime_type` and `parent` narrow the match.
/// With `parent` unset the query matches nodes anywhere in the space,
/// which the exporter only uses for the root folder.
#[derive(Debug, Clone)]
pub struct NodeQuery<'a> {
    pub name: &'a str,
    pub mime_type: Option<&'a str>,
    pub parent: Option<&'a str>,
}

impl<'a> NodeQuery<'a> {
    /// Filter for a folder of `name` under `parent` (or root-level).
    pub fn folder(name: &'a str, parent: Option<&'a str>) -> Self {
        Self {
            name,
            mime_type: Some(FOLDER_MIME),
            parent,
        }
    }

    /// Filter by name only, under `parent`. Used for attachments, where
    /// the uploaded mime type is whatever the content detection produced.
    pub fn named(name: &'a str, parent: &'a str) -> Self {
        Self {
            name,
            mime_type: None,
            parent: Some(parent),
        }
    }
}

/// Description of a file to create remotely, with content read from a
/// local path at upload time.
#[derive(Debug, Clone)]
pub struct NewFile<'a> {
    /// Remote name of the new file.
    pub name: &'a str,
    /// Parent folder id.
    pub parent: &'a str,
    /// Target mime type of the remote node (e.g. a Drive document).
    pub mime_type: &'a str,
    /// Mime type of the uploaded bytes (e.g. `text/html` for a rendered dump).
    pub content_type: &'a str,
    /// Local file whose bytes become the remote content.
    pub source: &'a Path,
}

/// Abstract remote store the export reconciles against.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`query`](RemoteSpace::query) | Name/parent-scoped lookup, order not guaranteed |
/// | [`create_folder`](RemoteSpace::create_folder) | Create one folder, returns its new id |
/// | [`create_file`](RemoteSpace::create_file) | Upload one file, returns its new id |
/// | [`get_parents`](RemoteSpace::get_parents) | Current parent set of a node |
/// | [`set_parents`](RemoteSpace::set_parents) | Atomic add-one / remove-many reparent |
#[async_trait]
pub trait RemoteSpace: Send + Sync {
    /// Query nodes matching the filter. The remote contract does not
    /// guarantee result order, and duplicates are possible — deciding what
    /// to do about multiple matches is the caller's job.
    async fn query(&self, filter: &NodeQuery<'_>) -> Result<Vec<RemoteNode>>;

    /// Create a folder named `name` under `parent` (root-level when `None`).
    /// Returns the new folder's id.
    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<String>;

    /// Upload a new file from `spec.source`. Returns the new file's id.
    async fn create_file(&self, spec: &NewFile<'_>) -> Result<String>;

    /// Fetch the current parent set of a node.
    ///
    /// A node id that no longer resolves surfaces as
    /// [`ExportError::StaleReference`](crate::error::ExportError::StaleReference).
    async fn get_parents(&self, id: &str) -> Result<Vec<String>>;

    /// Reparent a node: add `add` and remove every id in `remove` in a
    /// single update. The remote applies this atomically, which is the only
    /// reason leaving stale parents behind is avoidable at all.
    async fn set_parents(&self, id: &str, add: &str, remove: &[String]) -> Result<()>;
}
