use std::{
    collections::HashMap,
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::export::{write_edges_jsonl, write_graphml, write_nodes_jsonl};
use crate::store::GraphStore;

#[derive(Debug, Serialize, Clone)]
pub struct PersistSummary {
    pub root: String,
    pub out_dir: String,
    pub timestamp: String,
    pub graph_nodes: usize,
    pub graph_edges: usize,
    pub files: PersistFiles,
    pub counts_by_kind: HashMap<String, usize>,
    pub counts_by_edge_kind: HashMap<String, usize>,
}

#[derive(Debug, Serialize, Clone)]
pub struct PersistFiles {
    pub nodes_jsonl: String,
    pub edges_jsonl: String,
    pub graphml: String,
    pub summary_json: String,
}

/// Dumps the whole graph under `<root>/graphs_data/<timestamp>/` — JSONL
/// for programmatic consumers, GraphML for visual inspection in Gephi.
/// `as_of` must be supplied by the caller since this crate never calls
/// `Utc::now()` internally (keeps export runs reproducible in tests).
pub fn save_all(root: &str, store: &GraphStore, as_of: DateTime<Utc>) -> Result<PersistSummary> {
    let target_dir = make_output_dir(root, as_of)?;
    let p_nodes = target_dir.join("graph_nodes.jsonl");
    let p_edges = target_dir.join("graph_edges.jsonl");
    let p_graphml = target_dir.join("graph.graphml");
    let p_summary = target_dir.join("summary.json");

    let graph = store.graph();
    write_nodes_jsonl(&p_nodes, graph)?;
    write_edges_jsonl(&p_edges, graph)?;
    write_graphml(&p_graphml, graph)?;

    let mut counts_by_kind = HashMap::new();
    for idx in graph.node_indices() {
        let kind = format!("{:?}", graph[idx].kind);
        *counts_by_kind.entry(kind).or_insert(0) += 1;
    }

    let mut counts_by_edge_kind = HashMap::new();
    for eidx in graph.edge_indices() {
        let kind = graph[eidx].kind.as_str().to_string();
        *counts_by_edge_kind.entry(kind).or_insert(0) += 1;
    }

    let files = PersistFiles {
        nodes_jsonl: p_nodes.to_string_lossy().into_owned(),
        edges_jsonl: p_edges.to_string_lossy().into_owned(),
        graphml: p_graphml.to_string_lossy().into_owned(),
        summary_json: p_summary.to_string_lossy().into_owned(),
    };

    let summary = PersistSummary {
        root: root.to_string(),
        out_dir: target_dir.to_string_lossy().into_owned(),
        timestamp: target_dir
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string(),
        graph_nodes: store.node_count(),
        graph_edges: store.edge_count(),
        files,
        counts_by_kind,
        counts_by_edge_kind,
    };

    let f = fs::File::create(&p_summary).with_context(|| format!("create {:?}", p_summary))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, &summary)?;
    w.flush()?;

    Ok(summary)
}

fn make_output_dir(root: &str, as_of: DateTime<Utc>) -> Result<PathBuf> {
    let ts = as_of.format("%Y%m%d_%H%M%S").to_string();
    let base = Path::new(root).join("graphs_data").join(ts);
    fs::create_dir_all(&base).with_context(|| format!("create_dir_all {:?}", base))?;
    Ok(base)
}
