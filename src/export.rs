//! Export reconciliation core.
//!
//! Walks the source wiki tree and brings the remote space into
//! correspondence with it: one remote folder per folder-backed page, a
//! rendered dump file inside it, an `_Attachments` sub-folder for pages
//! that carry attachments, and linked documents relocated under their
//! resolved parent.
//!
//! Every mutation is guarded by a query proving absence (find-or-create),
//! so a repeated export over an unchanged tree issues zero creations and an
//! interrupted run can simply be re-invoked — the next run converges on the
//! same structure without duplicates. The remote API offers no transactions
//! and no unique-name constraint, which also means two exports running
//! concurrently against one space can race the find-or-create sequence;
//! single-writer usage is assumed.
//!
//! The walk is an explicit work-stack traversal (pre-order, depth-first,
//! siblings in source order) rather than recursion: the resolved remote
//! parent id is pushed with each child, and nothing else crosses entries.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::error::ExportError;
use crate::models::{AttachmentRef, PageKind, PageNode};
use crate::progress::{ExportEvent, Reporter};
use crate::remote::{NewFile, NodeQuery, RemoteSpace, DOCUMENT_MIME};
use crate::render::Renderer;

/// Name of the per-page sub-folder holding attachments. The underscore
/// prefix keeps it from colliding with a child page of the same name.
const ATTACHMENTS_FOLDER: &str = "_Attachments";

/// What an export run actually did to the remote space.
///
/// Found-and-reused nodes are not counted; on an unchanged tree a second
/// run reports all-zero creation counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub pages: u64,
    pub folders_created: u64,
    pub dumps_created: u64,
    pub attachments_created: u64,
    pub documents_moved: u64,
}

/// The export engine. Holds the injected collaborators for one run; all
/// state that varies during the walk lives on the work stack.
pub struct Exporter<'a> {
    remote: &'a dyn RemoteSpace,
    renderer: &'a dyn Renderer,
    reporter: &'a dyn Reporter,
    content_root: PathBuf,
}

impl<'a> Exporter<'a> {
    pub fn new(
        remote: &'a dyn RemoteSpace,
        renderer: &'a dyn Renderer,
        reporter: &'a dyn Reporter,
        content_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            remote,
            renderer,
            reporter,
            content_root: content_root.into(),
        }
    }

    /// Mirror `pages` into the remote space under a root folder named
    /// `root_folder`, resolving it first (creating it if absent).
    ///
    /// Failures abort the walk and propagate; the failing page's path is
    /// reported through the progress side-channel before propagation so an
    /// operator knows where to look before re-running.
    pub async fn export(&self, root_folder: &str, pages: &[PageNode]) -> Result<ExportSummary> {
        let mut summary = ExportSummary::default();
        let root_id = self.resolve_folder(root_folder, None, &mut summary).await?;

        // Pre-order work stack of (page, resolved parent id, path). Children
        // are pushed in reverse so siblings pop in source order.
        let mut stack: Vec<(&PageNode, String, String)> = Vec::new();
        for page in pages.iter().rev() {
            stack.push((page, root_id.clone(), root_folder.to_string()));
        }

        while let Some((page, parent_id, parent_path)) = stack.pop() {
            let path = format!("{parent_path}/{}", page.name);
            self.reporter
                .report(ExportEvent::PageStart { path: path.clone() });

            let id = match self.reconcile_page(page, &parent_id, &mut summary).await {
                Ok(id) => id,
                Err(err) => {
                    self.reporter.report(ExportEvent::PageFailed {
                        path: path.clone(),
                        error: format!("{err:#}"),
                    });
                    return Err(err.context(format!("while exporting page '{path}'")));
                }
            };
            summary.pages += 1;

            for child in page.children.iter().rev() {
                stack.push((child, id.clone(), path.clone()));
            }
        }

        Ok(summary)
    }

    /// Reconcile a single page and return the remote id its children hang
    /// under: the page folder for standard pages, the (unchanged) remote
    /// document id for linked ones.
    async fn reconcile_page(
        &self,
        page: &PageNode,
        parent_id: &str,
        summary: &mut ExportSummary,
    ) -> Result<String> {
        match &page.kind {
            PageKind::Standard => {
                let id = self.resolve_folder(&page.name, Some(parent_id), summary).await?;
                self.materialize_dump(page, &id, summary).await?;
                self.reconcile_attachments(page, &id, summary).await?;
                Ok(id)
            }
            PageKind::Linked { remote_id, .. } => {
                self.reparent_document(page, remote_id, parent_id, summary)
                    .await?;
                Ok(remote_id.clone())
            }
        }
    }

    /// Find-or-create a folder of `name` under `parent`.
    ///
    /// More than one match means a previous run (or a concurrent writer)
    /// left duplicates behind; that fails fast rather than silently picking
    /// one, since any pick would keep feeding children into an arbitrary
    /// copy.
    async fn resolve_folder(
        &self,
        name: &str,
        parent: Option<&str>,
        summary: &mut ExportSummary,
    ) -> Result<String> {
        let matches = self.remote.query(&NodeQuery::folder(name, parent)).await?;
        match matches.as_slice() {
            [] => {
                let id = self
                    .remote
                    .create_folder(name, parent)
                    .await
                    .with_context(|| format!("creating folder '{name}'"))?;
                summary.folders_created += 1;
                self.reporter.report(ExportEvent::FolderCreated {
                    name: name.to_string(),
                    id: id.clone(),
                });
                Ok(id)
            }
            [node] => {
                let id = node.id.clone();
                self.reporter.report(ExportEvent::FolderFound {
                    name: name.to_string(),
                    id: id.clone(),
                });
                Ok(id)
            }
            _ => Err(ExportError::AmbiguousMatch {
                name: name.to_string(),
                parent: parent.map(|p| p.to_string()),
                count: matches.len(),
            }
            .into()),
        }
    }

    /// Ensure the rendered dump file `_<name>` exists inside the page
    /// folder. Rendering and upload staging only happen when the file is
    /// absent; the staged temp file is released on every exit path.
    async fn materialize_dump(
        &self,
        page: &PageNode,
        folder_id: &str,
        summary: &mut ExportSummary,
    ) -> Result<()> {
        let dump_name = format!("_{}", page.name);
        let matches = self
            .remote
            .query(&NodeQuery {
                name: &dump_name,
                mime_type: Some(DOCUMENT_MIME),
                parent: Some(folder_id),
            })
            .await?;

        match matches.len() {
            0 => {
                let body =
                    self.renderer
                        .render(page)
                        .map_err(|err| ExportError::RenderFailure {
                            page: page.name.clone(),
                            detail: format!("{err:#}"),
                        })?;

                let mut staged =
                    NamedTempFile::new().context("staging rendered body in a temp file")?;
                staged.write_all(&body).context("writing staged body")?;
                staged.flush().context("flushing staged body")?;

                let id = self
                    .remote
                    .create_file(&NewFile {
                        name: &dump_name,
                        parent: folder_id,
                        mime_type: DOCUMENT_MIME,
                        content_type: "text/html",
                        source: staged.path(),
                    })
                    .await
                    .with_context(|| format!("uploading dump '{dump_name}'"))?;

                summary.dumps_created += 1;
                self.reporter
                    .report(ExportEvent::DumpCreated { name: dump_name, id });
                Ok(())
            }
            1 => {
                self.reporter.report(ExportEvent::DumpFound {
                    name: dump_name,
                    id: matches[0].id.clone(),
                });
                Ok(())
            }
            n => Err(ExportError::AmbiguousMatch {
                name: dump_name,
                parent: Some(folder_id.to_string()),
                count: n,
            }
            .into()),
        }
    }

    /// Ensure every attachment of the page exists inside its
    /// `_Attachments` sub-folder. Pages without attachments get no
    /// sub-folder. Each attachment is independently create-or-skip.
    async fn reconcile_attachments(
        &self,
        page: &PageNode,
        folder_id: &str,
        summary: &mut ExportSummary,
    ) -> Result<()> {
        if page.attachments.is_empty() {
            return Ok(());
        }

        let attachments_id = self
            .resolve_folder(ATTACHMENTS_FOLDER, Some(folder_id), summary)
            .await?;

        for attachment in &page.attachments {
            self.reconcile_attachment(attachment, &attachments_id, summary)
                .await?;
        }
        Ok(())
    }

    async fn reconcile_attachment(
        &self,
        attachment: &AttachmentRef,
        folder_id: &str,
        summary: &mut ExportSummary,
    ) -> Result<()> {
        let matches = self
            .remote
            .query(&NodeQuery::named(&attachment.filename, folder_id))
            .await?;

        match matches.len() {
            0 => {
                let source = self.content_root.join(&attachment.filename);
                let content_type = detect_content_type(&attachment.filename);
                self.remote
                    .create_file(&NewFile {
                        name: &attachment.filename,
                        parent: folder_id,
                        mime_type: content_type,
                        content_type,
                        source: &source,
                    })
                    .await
                    .with_context(|| format!("uploading attachment '{}'", attachment.filename))?;
                summary.attachments_created += 1;
                self.reporter.report(ExportEvent::AttachmentCreated {
                    filename: attachment.filename.clone(),
                });
                Ok(())
            }
            1 => {
                self.reporter.report(ExportEvent::AttachmentFound {
                    filename: attachment.filename.clone(),
                });
                Ok(())
            }
            n => Err(ExportError::AmbiguousMatch {
                name: attachment.filename.clone(),
                parent: Some(folder_id.to_string()),
                count: n,
            }
            .into()),
        }
    }

    /// Correct parent-folder drift for a linked document. No update is
    /// issued when the current parent set is already exactly the resolved
    /// parent; otherwise one add-and-remove call replaces the whole set.
    async fn reparent_document(
        &self,
        page: &PageNode,
        remote_id: &str,
        parent_id: &str,
        summary: &mut ExportSummary,
    ) -> Result<()> {
        let current = self.remote.get_parents(remote_id).await.map_err(|err| {
            match err.downcast::<ExportError>() {
                Ok(ExportError::StaleReference { remote_id, .. }) => {
                    anyhow::Error::from(ExportError::StaleReference {
                        name: page.name.clone(),
                        remote_id,
                    })
                }
                Ok(other) => anyhow::Error::from(other),
                Err(other) => other,
            }
        })?;

        if current.len() == 1 && current[0] == parent_id {
            self.reporter.report(ExportEvent::DocumentInPlace {
                name: page.name.clone(),
            });
            return Ok(());
        }

        // Do not remove the parent we are adding, in case it is already a
        // member alongside stale ones.
        let remove: Vec<String> = current.into_iter().filter(|p| p != parent_id).collect();
        self.remote
            .set_parents(remote_id, parent_id, &remove)
            .await
            .with_context(|| format!("moving document '{}'", page.name))?;

        summary.documents_moved += 1;
        self.reporter.report(ExportEvent::DocumentMoved {
            name: page.name.clone(),
            parent: parent_id.to_string(),
        });
        Ok(())
    }
}

/// Map an attachment filename to the content type it is uploaded with.
fn detect_content_type(filename: &str) -> &'static str {
    match filename.rsplit('.').next() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("md") => "text/markdown",
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("html" | "htm") => "text/html",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::detect_content_type;

    #[test]
    fn content_type_from_extension() {
        assert_eq!(detect_content_type("diagram.png"), "image/png");
        assert_eq!(detect_content_type("notes.md"), "text/markdown");
        assert_eq!(detect_content_type("no_extension"), "application/octet-stream");
    }
}
