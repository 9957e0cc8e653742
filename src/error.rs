//! Export error taxonomy.
//!
//! These are the failure cases the reconciliation core can distinguish.
//! They travel inside [`anyhow::Error`] like every other error in the crate;
//! callers that need to branch on a case downcast with
//! `err.downcast_ref::<ExportError>()`.
//!
//! Nothing here is recovered locally: any failure aborts the running export
//! and propagates. A subsequent run repairs the remote space through the
//! same find-or-create logic, so retry is simply re-invoking the export.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    /// Transport or auth failure on a remote call.
    #[error("remote space unavailable during {op}: {detail}")]
    RemoteUnavailable { op: String, detail: String },

    /// A find query matched more than one remote node. Duplicates usually
    /// mean a concurrent run raced the find-or-create sequence; picking one
    /// silently would hide that, so the export fails instead.
    #[error("ambiguous match: {count} remote nodes named '{name}'{}", parent_suffix(.parent))]
    AmbiguousMatch {
        name: String,
        parent: Option<String>,
        count: usize,
    },

    /// The renderer could not produce a body for a page.
    #[error("failed to render body for page '{page}': {detail}")]
    RenderFailure { page: String, detail: String },

    /// A linked document's remote id no longer resolves.
    #[error("linked document '{name}' points at remote id '{remote_id}' which no longer resolves")]
    StaleReference { name: String, remote_id: String },
}

fn parent_suffix(parent: &Option<String>) -> String {
    match parent {
        Some(p) => format!(" under parent {p}"),
        None => " at root level".to_string(),
    }
}
