//! Core data models used throughout wiki-mirror.
//!
//! These types represent the source wiki tree that flows through the export
//! pipeline. They are immutable during an export: the walker only reads them
//! and threads resolved remote ids down to children.

/// What kind of remote object a page maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    /// A folder-backed page: mirrored as a remote folder containing a
    /// rendered dump file and an optional attachments sub-folder.
    Standard,
    /// A page that references a pre-existing remote document to be
    /// relocated in place, never created by this system.
    Linked { doc: LinkedKind, remote_id: String },
}

/// Document flavor of a linked page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkedKind {
    Spreadsheet,
    Document,
}

/// A single page of the source wiki.
///
/// `name` doubles as the remote lookup key, so it must be unique among
/// siblings; the tree loader enforces this before an export starts.
#[derive(Debug, Clone)]
pub struct PageNode {
    pub name: String,
    pub kind: PageKind,
    /// Body markup, consumed only by the [`Renderer`](crate::render::Renderer).
    pub body: String,
    pub attachments: Vec<AttachmentRef>,
    pub children: Vec<PageNode>,
}

impl PageNode {
    /// Whether this page is backed by a pre-existing remote document.
    pub fn is_linked(&self) -> bool {
        matches!(self.kind, PageKind::Linked { .. })
    }
}

/// A file attached to a page.
///
/// `filename` is both the remote lookup key and the local content locator,
/// resolved against the configured content root at upload time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    pub filename: String,
}
