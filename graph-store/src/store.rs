//! Sled-persisted petgraph wrapper. The graph itself is a pure in-memory
//! projection rebuilt from two sled trees (`nodes`, `edges`) on open, so a
//! process restart never has to re-run the relational-store rebuild just to
//! get back to where it left off; `build::rebuild_full` is only needed after
//! the consistency validator flags drift or a force-push.

use std::collections::HashMap;
use std::path::Path;

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};

use crate::errors::Result;
use crate::model::{EdgeKind, GraphEdge, GraphNode, NodeKind};

fn edge_key(from: &str, to: &str, kind: EdgeKind) -> String {
    format!("{from}\u{0}{to}\u{0}{}", kind.as_str())
}

pub struct GraphStore {
    db: sled::Db,
    nodes: sled::Tree,
    edges: sled::Tree,
    graph: DiGraph<GraphNode, GraphEdge>,
    node_index: HashMap<String, NodeIndex>,
    edge_index: HashMap<String, EdgeIndex>,
}

impl GraphStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            std::fs::create_dir_all(path)?;
        }
        let canonical = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let db = sled::open(&canonical)?;
        let nodes = db.open_tree("nodes")?;
        let edges = db.open_tree("edges")?;

        let mut store = Self {
            db,
            nodes,
            edges,
            graph: DiGraph::new(),
            node_index: HashMap::new(),
            edge_index: HashMap::new(),
        };
        store.load_from_disk()?;
        Ok(store)
    }

    fn load_from_disk(&mut self) -> Result<()> {
        for item in self.nodes.iter() {
            let (key, value) = item?;
            let key = String::from_utf8_lossy(&key).into_owned();
            let node: GraphNode = serde_json::from_slice(&value)?;
            let idx = self.graph.add_node(node);
            self.node_index.insert(key, idx);
        }

        for item in self.edges.iter() {
            let (key, value) = item?;
            let key = String::from_utf8_lossy(&key).into_owned();
            let mut parts = key.splitn(3, '\u{0}');
            let (Some(from), Some(to)) = (parts.next(), parts.next()) else {
                continue;
            };
            let (Some(&from_idx), Some(&to_idx)) =
                (self.node_index.get(from), self.node_index.get(to))
            else {
                continue;
            };
            let edge: GraphEdge = serde_json::from_slice(&value)?;
            let edge_idx = self.graph.add_edge(from_idx, to_idx, edge);
            self.edge_index.insert(key, edge_idx);
        }

        Ok(())
    }

    /// Inserts or replaces a node, keyed on [`GraphNode::unique_key`].
    pub fn upsert_node(&mut self, node: GraphNode) -> Result<NodeIndex> {
        let key = node.unique_key();
        self.nodes.insert(key.as_bytes(), serde_json::to_vec(&node)?)?;

        if let Some(&idx) = self.node_index.get(&key) {
            self.graph[idx] = node;
            Ok(idx)
        } else {
            let idx = self.graph.add_node(node);
            self.node_index.insert(key, idx);
            Ok(idx)
        }
    }

    /// Inserts or replaces the edge of `kind` between two already-inserted
    /// nodes, found by their unique key. One logical edge per `(from, to,
    /// kind)` triple — re-running the projection over the same data updates
    /// evidence/confidence in place rather than stacking duplicate edges.
    pub fn upsert_edge(&mut self, from_key: &str, to_key: &str, edge: GraphEdge) -> Result<EdgeIndex> {
        let from_idx = *self
            .node_index
            .get(from_key)
            .ok_or_else(|| crate::errors::GraphStoreError::NodeNotFound(from_key.to_string()))?;
        let to_idx = *self
            .node_index
            .get(to_key)
            .ok_or_else(|| crate::errors::GraphStoreError::NodeNotFound(to_key.to_string()))?;

        let key = edge_key(from_key, to_key, edge.kind);
        self.edges.insert(key.as_bytes(), serde_json::to_vec(&edge)?)?;

        if let Some(&existing) = self.edge_index.get(&key) {
            self.graph[existing] = edge;
            Ok(existing)
        } else {
            let idx = self.graph.add_edge(from_idx, to_idx, edge);
            self.edge_index.insert(key, idx);
            Ok(idx)
        }
    }

    pub fn get_node(&self, key: &str) -> Option<&GraphNode> {
        self.node_index.get(key).map(|&idx| &self.graph[idx])
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights().filter(move |n| n.kind == kind)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn graph(&self) -> &DiGraph<GraphNode, GraphEdge> {
        &self.graph
    }

    /// Wipes both sled trees and the in-memory graph, for a full rebuild.
    pub fn clear(&mut self) -> Result<()> {
        self.nodes.clear()?;
        self.edges.clear()?;
        self.graph = DiGraph::new();
        self.node_index.clear();
        self.edge_index.clear();
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn node(kind: NodeKind, key: &str) -> GraphNode {
        GraphNode {
            repo_id: Uuid::nil(),
            kind,
            key: key.to_string(),
            attrs: serde_json::json!({}),
        }
    }

    #[test]
    fn round_trips_nodes_and_edges_through_sled() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = GraphStore::open(dir.path()).unwrap();
            let dev = node(NodeKind::Developer, "a@example.com");
            let commit = node(NodeKind::Commit, "deadbeef");
            store.upsert_node(dev.clone()).unwrap();
            store.upsert_node(commit.clone()).unwrap();
            store
                .upsert_edge(
                    &dev.unique_key(),
                    &commit.unique_key(),
                    GraphEdge::structural(EdgeKind::Authored),
                )
                .unwrap();
            store.flush().unwrap();
            assert_eq!(store.node_count(), 2);
            assert_eq!(store.edge_count(), 1);
        }

        let reopened = GraphStore::open(dir.path()).unwrap();
        assert_eq!(reopened.node_count(), 2);
        assert_eq!(reopened.edge_count(), 1);
    }

    #[test]
    fn upserting_same_edge_does_not_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = GraphStore::open(dir.path()).unwrap();
        let dev = node(NodeKind::Developer, "a@example.com");
        let commit = node(NodeKind::Commit, "deadbeef");
        store.upsert_node(dev.clone()).unwrap();
        store.upsert_node(commit.clone()).unwrap();
        for _ in 0..3 {
            store
                .upsert_edge(
                    &dev.unique_key(),
                    &commit.unique_key(),
                    GraphEdge::structural(EdgeKind::Authored),
                )
                .unwrap();
        }
        assert_eq!(store.edge_count(), 1);
    }
}
