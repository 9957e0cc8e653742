//! Export progress reporting.
//!
//! Reports observable progress during `wmir export` so users see which page
//! is being reconciled and what the run actually did to the remote space.
//! Progress is emitted on **stderr** so stdout remains parseable for
//! scripts. No export behavior depends on a reporter; it is a side-channel
//! only.

use std::io::Write;

/// A single progress event during export.
#[derive(Clone, Debug)]
pub enum ExportEvent {
    /// The walker started reconciling a page. `path` is the slash-joined
    /// position in the source tree, e.g. `Team Wiki/Home/Roadmap`.
    PageStart { path: String },
    /// A folder was created remotely.
    FolderCreated { name: String, id: String },
    /// A folder of that name already existed; its id was reused.
    FolderFound { name: String, id: String },
    /// A dump file was rendered and uploaded.
    DumpCreated { name: String, id: String },
    /// The dump file already existed.
    DumpFound { name: String, id: String },
    /// An attachment was uploaded.
    AttachmentCreated { filename: String },
    /// The attachment already existed.
    AttachmentFound { filename: String },
    /// A linked document was moved under its resolved parent.
    DocumentMoved { name: String, parent: String },
    /// The linked document was already in the right place.
    DocumentInPlace { name: String },
    /// Reconciling this page failed; the export aborts after this event.
    PageFailed { path: String, error: String },
}

/// Reports export progress. Implementations write to stderr (human or JSON).
pub trait Reporter: Send + Sync {
    /// Emit a progress event. Called from the export walker.
    fn report(&self, event: ExportEvent);
}

/// Human-friendly progress on stderr, one line per event.
pub struct StderrReporter;

impl Reporter for StderrReporter {
    fn report(&self, event: ExportEvent) {
        let line = match &event {
            ExportEvent::PageStart { path } => format!("export  {path}\n"),
            ExportEvent::FolderCreated { name, id } => {
                format!("  folder '{name}' created ({id})\n")
            }
            ExportEvent::FolderFound { name, .. } => format!("  folder '{name}' already present\n"),
            ExportEvent::DumpCreated { name, id } => format!("  dump '{name}' uploaded ({id})\n"),
            ExportEvent::DumpFound { name, .. } => format!("  dump '{name}' already present\n"),
            ExportEvent::AttachmentCreated { filename } => {
                format!("  attachment '{filename}' uploaded\n")
            }
            ExportEvent::AttachmentFound { filename } => {
                format!("  attachment '{filename}' already present\n")
            }
            ExportEvent::DocumentMoved { name, parent } => {
                format!("  document '{name}' moved under {parent}\n")
            }
            ExportEvent::DocumentInPlace { name } => {
                format!("  document '{name}' already in place\n")
            }
            ExportEvent::PageFailed { path, error } => {
                format!("export  {path}  FAILED: {error}\n")
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonReporter;

impl Reporter for JsonReporter {
    fn report(&self, event: ExportEvent) {
        let ts = chrono::Utc::now().to_rfc3339();
        let obj = match &event {
            ExportEvent::PageStart { path } => serde_json::json!({
                "event": "page_start", "path": path, "ts": ts
            }),
            ExportEvent::FolderCreated { name, id } => serde_json::json!({
                "event": "folder_created", "name": name, "id": id, "ts": ts
            }),
            ExportEvent::FolderFound { name, id } => serde_json::json!({
                "event": "folder_found", "name": name, "id": id, "ts": ts
            }),
            ExportEvent::DumpCreated { name, id } => serde_json::json!({
                "event": "dump_created", "name": name, "id": id, "ts": ts
            }),
            ExportEvent::DumpFound { name, id } => serde_json::json!({
                "event": "dump_found", "name": name, "id": id, "ts": ts
            }),
            ExportEvent::AttachmentCreated { filename } => serde_json::json!({
                "event": "attachment_created", "filename": filename, "ts": ts
            }),
            ExportEvent::AttachmentFound { filename } => serde_json::json!({
                "event": "attachment_found", "filename": filename, "ts": ts
            }),
            ExportEvent::DocumentMoved { name, parent } => serde_json::json!({
                "event": "document_moved", "name": name, "parent": parent, "ts": ts
            }),
            ExportEvent::DocumentInPlace { name } => serde_json::json!({
                "event": "document_in_place", "name": name, "ts": ts
            }),
            ExportEvent::PageFailed { path, error } => serde_json::json!({
                "event": "page_failed", "path": path, "error": error, "ts": ts
            }),
        };
        let _ = writeln!(std::io::stderr().lock(), "{obj}");
    }
}

/// Discards all events. Used by tests and `wmir tree`.
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _event: ExportEvent) {}
}
