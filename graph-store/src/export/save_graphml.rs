use std::{
    collections::HashMap,
    fs,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use petgraph::graph::DiGraph;

use crate::model::{GraphEdge, GraphNode};

/// Writes GraphML suitable for Gephi: node kind/key/attrs plus edge
/// kind/evidence/confidence.
pub fn write_graphml(path: &Path, graph: &DiGraph<GraphNode, GraphEdge>) -> Result<()> {
    let mut idx_map: HashMap<_, String> = HashMap::new();
    for (i, idx) in graph.node_indices().enumerate() {
        idx_map.insert(idx, format!("n{i}"));
    }

    let f = fs::File::create(path).with_context(|| format!("create {:?}", path))?;
    let mut w = BufWriter::new(f);

    writeln!(w, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        w,
        r#"<graphml xmlns="http://graphml.graphdrawing.org/xmlns"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    xsi:schemaLocation="http://graphml.graphdrawing.org/xmlns
     http://graphml.graphdrawing.org/xmlns/1.0/graphml.xsd">"#
    )?;

    writeln!(w, r#"<key id="d0" for="node" attr.name="kind" attr.type="string"/>"#)?;
    writeln!(w, r#"<key id="d1" for="node" attr.name="key" attr.type="string"/>"#)?;
    writeln!(w, r#"<key id="d2" for="node" attr.name="attrs" attr.type="string"/>"#)?;
    writeln!(w, r#"<key id="e0" for="edge" attr.name="kind" attr.type="string"/>"#)?;
    writeln!(w, r#"<key id="e1" for="edge" attr.name="confidence" attr.type="double"/>"#)?;

    writeln!(w, r#"<graph edgedefault="directed">"#)?;

    for nidx in graph.node_indices() {
        let id = &idx_map[&nidx];
        let n = &graph[nidx];
        writeln!(w, r#"<node id="{id}">"#)?;
        writeln!(w, r#"  <data key="d0">{}</data>"#, xml_escape(&format!("{:?}", n.kind)))?;
        writeln!(w, r#"  <data key="d1">{}</data>"#, xml_escape(&n.key))?;
        writeln!(w, r#"  <data key="d2">{}</data>"#, xml_escape(&n.attrs.to_string()))?;
        writeln!(w, r#"</node>"#)?;
    }

    for (i, eidx) in graph.edge_indices().enumerate() {
        let (src, dst) = graph.edge_endpoints(eidx).expect("edge index from this graph");
        let src_id = &idx_map[&src];
        let dst_id = &idx_map[&dst];
        let edge = &graph[eidx];
        writeln!(w, r#"<edge id="e{i}" source="{src_id}" target="{dst_id}">"#)?;
        writeln!(w, r#"  <data key="e0">{}</data>"#, xml_escape(edge.kind.as_str()))?;
        if let Some(confidence) = edge.confidence {
            writeln!(w, r#"  <data key="e1">{confidence}</data>"#)?;
        }
        writeln!(w, r#"</edge>"#)?;
    }

    writeln!(w, r#"</graph>"#)?;
    writeln!(w, r#"</graphml>"#)?;
    w.flush()?;
    Ok(())
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
