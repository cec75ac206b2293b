mod save_all;
mod save_graphml;
mod save_json;

pub use save_all::{save_all, PersistFiles, PersistSummary};
pub use save_graphml::write_graphml;
pub use save_json::{write_edges_jsonl, write_nodes_jsonl};
