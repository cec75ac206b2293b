use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use petgraph::graph::DiGraph;

use crate::model::{GraphEdge, GraphNode};

/// Writes every node as JSON Lines (one node per line), in petgraph's
/// internal node-index order.
pub fn write_nodes_jsonl(path: &Path, graph: &DiGraph<GraphNode, GraphEdge>) -> Result<()> {
    let f = fs::File::create(path).with_context(|| format!("create {:?}", path))?;
    let mut w = BufWriter::new(f);
    for idx in graph.node_indices() {
        serde_json::to_writer(&mut w, &graph[idx])?;
        w.write_all(b"\n")?;
    }
    w.flush()?;
    Ok(())
}

/// Writes every edge as JSON Lines, with endpoints given as the node
/// indices used in `write_nodes_jsonl`'s output so the two files can be
/// joined without re-parsing keys.
pub fn write_edges_jsonl(path: &Path, graph: &DiGraph<GraphNode, GraphEdge>) -> Result<()> {
    let f = fs::File::create(path).with_context(|| format!("create {:?}", path))?;
    let mut w = BufWriter::new(f);
    for eidx in graph.edge_indices() {
        let (src, dst) = graph.edge_endpoints(eidx).expect("edge index from this graph");
        let edge = &graph[eidx];
        let rec = serde_json::json!({
            "src": src.index(),
            "dst": dst.index(),
            "kind": edge.kind.as_str(),
            "evidence": edge.evidence,
            "confidence": edge.confidence,
        });
        serde_json::to_writer(&mut w, &rec)?;
        w.write_all(b"\n")?;
    }
    w.flush()?;
    Ok(())
}
