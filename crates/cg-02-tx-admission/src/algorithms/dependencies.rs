//! # Dependency Extraction
//!
//! Walks an update list once and splits the nodes it mentions into:
//!
//! - **reads**: nodes that must already exist. Their last-update clocks
//!   form the `before` set the proposed timestamp is ordered against.
//! - **creates**: nodes brought into existence by this transaction.
//! - **deletes**: nodes removed once the transaction commits.
//! - **written**: every node whose last-update clock the commit advances.
//!
//! Nodes created earlier in the same transaction are not reads.

use shared_types::NodeHandle;
use std::collections::HashSet;

use crate::domain::{AdmissionError, GraphUpdate, NodeRef};

/// Node sets of one transaction, each in first-mention order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dependencies {
    /// Pre-existing nodes the transaction depends on.
    pub reads: Vec<NodeHandle>,
    /// Nodes the transaction creates.
    pub creates: Vec<NodeHandle>,
    /// Nodes the transaction deletes.
    pub deletes: Vec<NodeHandle>,
    /// Nodes whose last-update clock the transaction sets.
    pub written: Vec<NodeHandle>,
}

#[derive(Default)]
struct Walk {
    deps: Dependencies,
    seen_reads: HashSet<NodeHandle>,
    seen_written: HashSet<NodeHandle>,
    created: HashSet<NodeHandle>,
    deleted: HashSet<NodeHandle>,
    aliases: HashSet<String>,
}

impl Walk {
    fn touch(&mut self, node: &NodeRef, kind: &str) -> Result<(), AdmissionError> {
        self.read(node, kind)?;
        self.write(&node.handle);
        Ok(())
    }

    fn read(&mut self, node: &NodeRef, kind: &str) -> Result<(), AdmissionError> {
        if self.deleted.contains(&node.handle) {
            return Err(AdmissionError::InvalidUpdate(format!(
                "{} touches node {} after deleting it",
                kind, node.handle
            )));
        }
        if !self.created.contains(&node.handle) && self.seen_reads.insert(node.handle.clone()) {
            self.deps.reads.push(node.handle.clone());
        }
        Ok(())
    }

    fn write(&mut self, handle: &NodeHandle) {
        if self.seen_written.insert(handle.clone()) {
            self.deps.written.push(handle.clone());
        }
    }
}

/// Validate an update list and extract its node dependencies.
///
/// Rejects an empty list, a node created twice (or created after being
/// read), an alias added twice, and any update touching a node deleted
/// earlier in the same list.
pub fn collect_dependencies(updates: &[GraphUpdate]) -> Result<Dependencies, AdmissionError> {
    if updates.is_empty() {
        return Err(AdmissionError::InvalidUpdate("empty update list".into()));
    }

    let mut walk = Walk::default();
    for update in updates {
        let kind = update.kind();
        match update {
            GraphUpdate::CreateNode { handle, .. } => {
                if walk.created.contains(handle) || walk.seen_reads.contains(handle) {
                    return Err(AdmissionError::InvalidUpdate(format!(
                        "node {} created twice",
                        handle
                    )));
                }
                walk.created.insert(handle.clone());
                walk.deps.creates.push(handle.clone());
                walk.write(handle);
            }
            GraphUpdate::CreateEdge { from, to, .. } => {
                walk.touch(from, kind)?;
                walk.read(to, kind)?;
            }
            GraphUpdate::DeleteNode { node } => {
                walk.touch(node, kind)?;
                walk.deleted.insert(node.handle.clone());
                walk.deps.deletes.push(node.handle.clone());
            }
            GraphUpdate::AddAlias { alias, node } => {
                if !walk.aliases.insert(alias.clone()) {
                    return Err(AdmissionError::InvalidUpdate(format!(
                        "alias {} added twice",
                        alias
                    )));
                }
                walk.touch(node, kind)?;
            }
            GraphUpdate::SetNodeProperty { node, .. }
            | GraphUpdate::DeleteEdge { node, .. }
            | GraphUpdate::SetEdgeProperty { node, .. } => {
                walk.touch(node, kind)?;
            }
        }
    }

    Ok(walk.deps)
}
