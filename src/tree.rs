//! Source tree loading.
//!
//! The export core is agnostic about where the wiki tree comes from; this
//! module supplies the file-based provider used by the CLI. A tree file is
//! TOML with a `root_folder` name and nested `[[pages]]` tables:
//!
//! ```toml
//! root_folder = "Team Wiki"
//!
//! [[pages]]
//! name = "Home"
//! body = "<p>Welcome</p>"
//! attachments = ["logo.png"]
//!
//! [[pages.children]]
//! name = "Quarterly Plan"
//! kind = "spreadsheet"
//! remote_id = "1grX9pLq"
//! ```
//!
//! Loading validates everything the reconciliation core relies on: page
//! names are non-empty and unique among siblings (the remote lookup key),
//! `remote_id` appears exactly on linked kinds, and linked documents carry
//! no attachments.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::models::{AttachmentRef, LinkedKind, PageKind, PageNode};

/// A parsed and validated tree file.
#[derive(Debug, Clone)]
pub struct SourceTree {
    /// Name of the remote root folder everything is mirrored under.
    pub root_folder: String,
    /// Top-level pages, in source order.
    pub pages: Vec<PageNode>,
}

#[derive(Debug, Deserialize)]
struct TreeFile {
    root_folder: String,
    #[serde(default)]
    pages: Vec<PageSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PageSpec {
    name: String,
    #[serde(default = "default_kind")]
    kind: String,
    #[serde(default)]
    body: String,
    remote_id: Option<String>,
    #[serde(default)]
    attachments: Vec<String>,
    #[serde(default)]
    children: Vec<PageSpec>,
}

fn default_kind() -> String {
    "page".to_string()
}

/// Load and validate a tree file.
pub fn load_tree(path: &Path) -> Result<SourceTree> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tree file: {}", path.display()))?;
    let tree: TreeFile = toml::from_str(&content).with_context(|| "Failed to parse tree file")?;

    if tree.root_folder.trim().is_empty() {
        bail!("root_folder must not be empty");
    }

    check_sibling_names(&tree.pages, &tree.root_folder)?;
    let pages = tree
        .pages
        .into_iter()
        .map(|spec| convert(spec, &tree.root_folder))
        .collect::<Result<Vec<_>>>()?;

    Ok(SourceTree {
        root_folder: tree.root_folder,
        pages,
    })
}

fn convert(spec: PageSpec, parent_path: &str) -> Result<PageNode> {
    if spec.name.trim().is_empty() {
        bail!("page under '{parent_path}' has an empty name");
    }
    let path = format!("{parent_path}/{}", spec.name);

    let kind = match spec.kind.as_str() {
        "page" => {
            if spec.remote_id.is_some() {
                bail!("page '{path}': remote_id is only valid on linked kinds (document, spreadsheet)");
            }
            PageKind::Standard
        }
        "document" | "spreadsheet" => {
            let remote_id = spec
                .remote_id
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| {
                    anyhow::anyhow!("page '{path}': kind '{}' requires a remote_id", spec.kind)
                })?;
            if !spec.attachments.is_empty() {
                bail!("page '{path}': attachments are not supported on linked documents");
            }
            let doc = if spec.kind == "spreadsheet" {
                LinkedKind::Spreadsheet
            } else {
                LinkedKind::Document
            };
            PageKind::Linked { doc, remote_id }
        }
        other => bail!(
            "page '{path}': unknown kind '{other}'. Must be page, document, or spreadsheet."
        ),
    };

    check_sibling_names(&spec.children, &path)?;
    let children = spec
        .children
        .into_iter()
        .map(|child| convert(child, &path))
        .collect::<Result<Vec<_>>>()?;

    Ok(PageNode {
        name: spec.name,
        kind,
        body: spec.body,
        attachments: spec
            .attachments
            .into_iter()
            .map(|filename| AttachmentRef { filename })
            .collect(),
        children,
    })
}

/// Sibling names are the remote lookup key, so duplicates would make two
/// source pages reconcile into one remote folder.
fn check_sibling_names(siblings: &[PageSpec], parent_path: &str) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for spec in siblings {
        if !seen.insert(spec.name.as_str()) {
            bail!("duplicate sibling page name '{}' under '{parent_path}'", spec.name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn load(content: &str) -> Result<SourceTree> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        load_tree(file.path())
    }

    #[test]
    fn loads_nested_tree() {
        let tree = load(
            r#"
root_folder = "Team Wiki"

[[pages]]
name = "Home"
body = "<p>Welcome</p>"
attachments = ["logo.png"]

[[pages.children]]
name = "Roadmap"
kind = "spreadsheet"
remote_id = "sheet-1"

[[pages]]
name = "Archive"
"#,
        )
        .unwrap();

        assert_eq!(tree.root_folder, "Team Wiki");
        assert_eq!(tree.pages.len(), 2);
        let home = &tree.pages[0];
        assert_eq!(home.name, "Home");
        assert_eq!(home.kind, PageKind::Standard);
        assert_eq!(home.attachments, vec![AttachmentRef { filename: "logo.png".into() }]);
        assert_eq!(home.children.len(), 1);
        assert_eq!(
            home.children[0].kind,
            PageKind::Linked {
                doc: LinkedKind::Spreadsheet,
                remote_id: "sheet-1".into()
            }
        );
    }

    #[test]
    fn rejects_duplicate_siblings() {
        let err = load(
            r#"
root_folder = "W"
[[pages]]
name = "Same"
[[pages]]
name = "Same"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate sibling page name 'Same'"));
    }

    #[test]
    fn rejects_linked_without_remote_id() {
        let err = load(
            r#"
root_folder = "W"
[[pages]]
name = "Sheet"
kind = "spreadsheet"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("requires a remote_id"));
    }

    #[test]
    fn rejects_remote_id_on_standard_page() {
        let err = load(
            r#"
root_folder = "W"
[[pages]]
name = "Home"
remote_id = "doc-1"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("only valid on linked kinds"));
    }

    #[test]
    fn rejects_attachments_on_linked_document() {
        let err = load(
            r#"
root_folder = "W"
[[pages]]
name = "Sheet"
kind = "document"
remote_id = "doc-1"
attachments = ["x.png"]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not supported on linked documents"));
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = load(
            r#"
root_folder = "W"
[[pages]]
name = "Weird"
kind = "presentation"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown kind"));
    }

    #[test]
    fn rejects_empty_root_folder() {
        let err = load("root_folder = \"\"\n").unwrap_err();
        assert!(err.to_string().contains("root_folder must not be empty"));
    }
}
