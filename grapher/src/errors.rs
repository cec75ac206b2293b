use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, GrapherError>;

#[derive(Debug, Error)]
pub enum GrapherError {
    #[error(transparent)]
    Store(#[from] relational_store::StoreError),

    #[error(transparent)]
    Graph(#[from] graph_store::GraphStoreError),

    /// `topo::assign` couldn't produce a linear extension: the staged
    /// parent-DAG for `repo_id` isn't acyclic (a corrupt `parent_shas`
    /// column, never a real git history).
    #[error("repo {repo_id} commit history is not a DAG: ordered {ordered} of {total} staged commits")]
    CyclicHistory {
        repo_id: Uuid,
        ordered: usize,
        total: usize,
    },
}
