//! In-memory [`RemoteSpace`] implementation for testing.
//!
//! Uses a `HashMap` behind `std::sync::RwLock` for thread safety. Besides
//! the trait operations it counts every mutation call, so tests can assert
//! that a repeated export issues zero creations and that an already-correct
//! linked document triggers zero reparent updates.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ExportError;
use crate::remote::{NewFile, NodeQuery, RemoteNode, RemoteSpace};

struct StoredNode {
    name: String,
    mime_type: String,
    parents: Vec<String>,
}

/// In-memory remote space for tests.
pub struct InMemoryRemote {
    nodes: RwLock<HashMap<String, StoredNode>>,
    folders_created: AtomicU64,
    files_created: AtomicU64,
    reparent_calls: AtomicU64,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            folders_created: AtomicU64::new(0),
            files_created: AtomicU64::new(0),
            reparent_calls: AtomicU64::new(0),
        }
    }

    /// Seed a pre-existing node (e.g. a linked document the export will
    /// relocate, or a partially mirrored folder from an interrupted run).
    /// Returns the seeded node's id.
    pub fn seed(&self, name: &str, mime_type: &str, parents: &[&str]) -> String {
        let id = Uuid::new_v4().to_string();
        self.nodes.write().unwrap().insert(
            id.clone(),
            StoredNode {
                name: name.to_string(),
                mime_type: mime_type.to_string(),
                parents: parents.iter().map(|p| p.to_string()).collect(),
            },
        );
        id
    }

    /// Number of `create_folder` calls issued so far.
    pub fn folders_created(&self) -> u64 {
        self.folders_created.load(Ordering::SeqCst)
    }

    /// Number of `create_file` calls issued so far.
    pub fn files_created(&self) -> u64 {
        self.files_created.load(Ordering::SeqCst)
    }

    /// Number of `set_parents` calls issued so far.
    pub fn reparent_calls(&self) -> u64 {
        self.reparent_calls.load(Ordering::SeqCst)
    }

    /// Look up a single node by name under a parent, any mime type.
    /// Panics on duplicates; tests use this to assert structure.
    pub fn find_one(&self, name: &str, parent: Option<&str>) -> Option<RemoteNode> {
        let nodes = self.nodes.read().unwrap();
        let mut matches: Vec<RemoteNode> = nodes
            .iter()
            .filter(|(_, n)| {
                n.name == name
                    && match parent {
                        Some(p) => n.parents.iter().any(|np| np == p),
                        None => true,
                    }
            })
            .map(|(id, n)| RemoteNode {
                id: id.clone(),
                name: n.name.clone(),
                mime_type: n.mime_type.clone(),
                parents: n.parents.clone(),
            })
            .collect();
        assert!(
            matches.len() <= 1,
            "duplicate nodes named '{name}' in test remote"
        );
        matches.pop()
    }

    /// Total number of nodes in the space.
    pub fn node_count(&self) -> usize {
        self.nodes.read().unwrap().len()
    }

    /// Parent set of a node, for test assertions.
    pub fn parents_of(&self, id: &str) -> Vec<String> {
        self.nodes
            .read()
            .unwrap()
            .get(id)
            .map(|n| n.parents.clone())
            .unwrap_or_default()
    }
}

impl Default for InMemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteSpace for InMemoryRemote {
    async fn query(&self, filter: &NodeQuery<'_>) -> Result<Vec<RemoteNode>> {
        let nodes = self.nodes.read().unwrap();
        let mut results: Vec<RemoteNode> = nodes
            .iter()
            .filter(|(_, n)| {
                if n.name != filter.name {
                    return false;
                }
                if let Some(mime) = filter.mime_type {
                    if n.mime_type != mime {
                        return false;
                    }
                }
                if let Some(parent) = filter.parent {
                    if !n.parents.iter().any(|p| p == parent) {
                        return false;
                    }
                }
                true
            })
            .map(|(id, n)| RemoteNode {
                id: id.clone(),
                name: n.name.clone(),
                mime_type: n.mime_type.clone(),
                parents: n.parents.clone(),
            })
            .collect();
        // The real remote guarantees no order; sort by id so duplicate
        // handling in the exporter is at least observable deterministically.
        results.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(results)
    }

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<String> {
        self.folders_created.fetch_add(1, Ordering::SeqCst);
        let id = Uuid::new_v4().to_string();
        self.nodes.write().unwrap().insert(
            id.clone(),
            StoredNode {
                name: name.to_string(),
                mime_type: crate::remote::FOLDER_MIME.to_string(),
                parents: parent.map(|p| vec![p.to_string()]).unwrap_or_default(),
            },
        );
        Ok(id)
    }

    async fn create_file(&self, spec: &NewFile<'_>) -> Result<String> {
        self.files_created.fetch_add(1, Ordering::SeqCst);
        let id = Uuid::new_v4().to_string();
        self.nodes.write().unwrap().insert(
            id.clone(),
            StoredNode {
                name: spec.name.to_string(),
                mime_type: spec.mime_type.to_string(),
                parents: vec![spec.parent.to_string()],
            },
        );
        Ok(id)
    }

    async fn get_parents(&self, id: &str) -> Result<Vec<String>> {
        let nodes = self.nodes.read().unwrap();
        match nodes.get(id) {
            Some(n) => Ok(n.parents.clone()),
            None => Err(ExportError::StaleReference {
                name: String::new(),
                remote_id: id.to_string(),
            }
            .into()),
        }
    }

    async fn set_parents(&self, id: &str, add: &str, remove: &[String]) -> Result<()> {
        self.reparent_calls.fetch_add(1, Ordering::SeqCst);
        let mut nodes = self.nodes.write().unwrap();
        let node = nodes.get_mut(id).ok_or_else(|| ExportError::StaleReference {
            name: String::new(),
            remote_id: id.to_string(),
        })?;
        node.parents.retain(|p| !remove.contains(p));
        if !node.parents.iter().any(|p| p == add) {
            node.parents.push(add.to_string());
        }
        Ok(())
    }
}
