//! End-to-end reconciliation tests against the in-memory remote space.

use anyhow::Result;
use tempfile::TempDir;

use wiki_mirror::export::{ExportSummary, Exporter};
use wiki_mirror::models::{AttachmentRef, LinkedKind, PageKind, PageNode};
use wiki_mirror::progress::NullReporter;
use wiki_mirror::remote::{FOLDER_MIME, SPREADSHEET_MIME};
use wiki_mirror::remote_memory::InMemoryRemote;
use wiki_mirror::render::{HtmlRenderer, Renderer};
use wiki_mirror::ExportError;

fn page(name: &str, attachments: &[&str], children: Vec<PageNode>) -> PageNode {
    PageNode {
        name: name.to_string(),
        kind: PageKind::Standard,
        body: format!("<p>{name}</p>"),
        attachments: attachments
            .iter()
            .map(|f| AttachmentRef {
                filename: f.to_string(),
            })
            .collect(),
        children,
    }
}

fn linked(name: &str, remote_id: &str, children: Vec<PageNode>) -> PageNode {
    PageNode {
        name: name.to_string(),
        kind: PageKind::Linked {
            doc: LinkedKind::Spreadsheet,
            remote_id: remote_id.to_string(),
        },
        body: String::new(),
        attachments: vec![],
        children,
    }
}

/// The tree from the structural-correspondence property:
/// `root -> [A(attachments=[x.png]), B -> [C]]`.
fn sample_tree() -> Vec<PageNode> {
    vec![
        page("A", &["x.png"], vec![]),
        page("B", &[], vec![page("C", &[], vec![])]),
    ]
}

async fn export_with(
    remote: &InMemoryRemote,
    renderer: &dyn Renderer,
    root: &str,
    pages: &[PageNode],
) -> Result<ExportSummary> {
    let scratch = TempDir::new().unwrap();
    let exporter = Exporter::new(remote, renderer, &NullReporter, scratch.path());
    exporter.export(root, pages).await
}

async fn export(remote: &InMemoryRemote, root: &str, pages: &[PageNode]) -> Result<ExportSummary> {
    export_with(remote, &HtmlRenderer, root, pages).await
}

#[tokio::test]
async fn first_export_builds_expected_structure() {
    let remote = InMemoryRemote::new();
    let summary = export(&remote, "root", &sample_tree()).await.unwrap();

    let root = remote.find_one("root", None).expect("root folder");
    assert_eq!(root.mime_type, FOLDER_MIME);

    let a = remote.find_one("A", Some(&root.id)).expect("folder A");
    let b = remote.find_one("B", Some(&root.id)).expect("folder B");
    assert!(remote.find_one("_A", Some(&a.id)).is_some(), "dump _A");
    assert!(remote.find_one("_B", Some(&b.id)).is_some(), "dump _B");

    let attachments = remote
        .find_one("_Attachments", Some(&a.id))
        .expect("_Attachments under A");
    assert!(remote.find_one("x.png", Some(&attachments.id)).is_some());

    // B has no attachments, so it gets no _Attachments sub-folder.
    assert!(remote.find_one("_Attachments", Some(&b.id)).is_none());

    let c = remote.find_one("C", Some(&b.id)).expect("folder C under B");
    assert!(remote.find_one("_C", Some(&c.id)).is_some(), "dump _C");

    // root, A, _Attachments, B, C + _A, x.png, _B, _C
    assert_eq!(remote.node_count(), 9);
    assert_eq!(summary.pages, 3);
    assert_eq!(summary.folders_created, 5);
    assert_eq!(summary.dumps_created, 3);
    assert_eq!(summary.attachments_created, 1);
    assert_eq!(summary.documents_moved, 0);
}

#[tokio::test]
async fn second_export_issues_zero_creations() {
    let remote = InMemoryRemote::new();
    export(&remote, "root", &sample_tree()).await.unwrap();

    let folders_after_first = remote.folders_created();
    let files_after_first = remote.files_created();
    let nodes_after_first = remote.node_count();

    let summary = export(&remote, "root", &sample_tree()).await.unwrap();

    assert_eq!(remote.folders_created(), folders_after_first);
    assert_eq!(remote.files_created(), files_after_first);
    assert_eq!(remote.node_count(), nodes_after_first);
    assert_eq!(summary.folders_created, 0);
    assert_eq!(summary.dumps_created, 0);
    assert_eq!(summary.attachments_created, 0);
    assert_eq!(summary.pages, 3);
}

#[tokio::test]
async fn linked_document_parent_set_is_replaced() {
    let remote = InMemoryRemote::new();
    let old_home = remote.seed("Old Home", FOLDER_MIME, &[]);
    let sheet = remote.seed("Budget", SPREADSHEET_MIME, &[old_home.as_str()]);

    // Budget carries a child page, which must end up under the document id.
    let tree = vec![page(
        "Plans",
        &[],
        vec![linked("Budget", &sheet, vec![page("Notes", &[], vec![])])],
    )];
    export(&remote, "root", &tree).await.unwrap();

    let root = remote.find_one("root", None).unwrap();
    let plans = remote.find_one("Plans", Some(&root.id)).unwrap();
    assert_eq!(remote.parents_of(&sheet), vec![plans.id.clone()]);

    let notes = remote
        .find_one("Notes", Some(sheet.as_str()))
        .expect("Notes under the document");
    assert_eq!(remote.parents_of(&notes.id), vec![sheet.clone()]);
}

#[tokio::test]
async fn reparent_is_noop_when_already_in_place() {
    let remote = InMemoryRemote::new();
    let old_home = remote.seed("Old Home", FOLDER_MIME, &[]);
    let sheet = remote.seed("Budget", SPREADSHEET_MIME, &[old_home.as_str()]);

    let tree = vec![page("Plans", &[], vec![linked("Budget", &sheet, vec![])])];

    let first = export(&remote, "root", &tree).await.unwrap();
    assert_eq!(first.documents_moved, 1);
    assert_eq!(remote.reparent_calls(), 1);

    let second = export(&remote, "root", &tree).await.unwrap();
    assert_eq!(second.documents_moved, 0);
    assert_eq!(remote.reparent_calls(), 1, "no update call on the second run");
}

#[tokio::test]
async fn only_missing_attachment_is_uploaded() {
    let remote = InMemoryRemote::new();
    export(&remote, "root", &[page("A", &["x.png"], vec![])])
        .await
        .unwrap();
    let files_after_first = remote.files_created();

    let summary = export(&remote, "root", &[page("A", &["x.png", "y.png"], vec![])])
        .await
        .unwrap();

    assert_eq!(summary.attachments_created, 1);
    assert_eq!(summary.dumps_created, 0);
    assert_eq!(summary.folders_created, 0);
    assert_eq!(remote.files_created(), files_after_first + 1);

    let root = remote.find_one("root", None).unwrap();
    let a = remote.find_one("A", Some(&root.id)).unwrap();
    let attachments = remote.find_one("_Attachments", Some(&a.id)).unwrap();
    assert!(remote.find_one("y.png", Some(&attachments.id)).is_some());
}

/// Renderer that fails for one page name, for mid-walk failure tests.
struct FailingRenderer {
    fail_for: &'static str,
}

impl Renderer for FailingRenderer {
    fn render(&self, page: &PageNode) -> Result<Vec<u8>> {
        if page.name == self.fail_for {
            anyhow::bail!("simulated render failure");
        }
        HtmlRenderer.render(page)
    }
}

#[tokio::test]
async fn interrupted_export_converges_on_retry() {
    let remote = InMemoryRemote::new();

    let err = export_with(
        &remote,
        &FailingRenderer { fail_for: "B" },
        "root",
        &sample_tree(),
    )
    .await
    .unwrap_err();
    assert!(
        matches!(
            err.downcast_ref::<ExportError>(),
            Some(ExportError::RenderFailure { page, .. }) if page == "B"
        ),
        "unexpected error: {err:#}"
    );

    // A was processed first, in source order, and survives the abort.
    let root = remote.find_one("root", None).expect("root folder");
    let a = remote.find_one("A", Some(&root.id)).expect("folder A");
    assert!(remote.find_one("_A", Some(&a.id)).is_some());

    // The retry completes the structure with no duplicates.
    export(&remote, "root", &sample_tree()).await.unwrap();
    assert_eq!(remote.node_count(), 9);
    assert_eq!(remote.folders_created(), 5);
    assert_eq!(remote.files_created(), 4);
}

#[tokio::test]
async fn duplicate_candidates_fail_fast() {
    let remote = InMemoryRemote::new();
    remote.seed("root", FOLDER_MIME, &[]);
    remote.seed("root", FOLDER_MIME, &[]);

    let err = export(&remote, "root", &sample_tree()).await.unwrap_err();
    assert!(
        matches!(
            err.downcast_ref::<ExportError>(),
            Some(ExportError::AmbiguousMatch { name, count: 2, .. }) if name == "root"
        ),
        "unexpected error: {err:#}"
    );
}

#[tokio::test]
async fn stale_linked_reference_names_the_page() {
    let remote = InMemoryRemote::new();
    let tree = vec![linked("Budget", "gone-forever", vec![])];

    let err = export(&remote, "root", &tree).await.unwrap_err();
    assert!(
        matches!(
            err.downcast_ref::<ExportError>(),
            Some(ExportError::StaleReference { name, remote_id })
                if name == "Budget" && remote_id == "gone-forever"
        ),
        "unexpected error: {err:#}"
    );
}
