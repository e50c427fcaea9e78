use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Positional argument, bound as text (`None` is SQL NULL)
pub type SqlParam = Option<String>;

/// Snapshot of connection pool usage
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    pub max_size: usize,
    pub size: usize,
    pub available: usize,
    pub waiting: usize,
}

/// Parameterized query execution against the backing database
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a statement whose single output column is a JSON document per row
    async fn query_json(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Value>>;

    /// Run a statement and return the number of affected rows
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64>;

    async fn ping(&self) -> bool;

    fn pool_status(&self) -> Option<PoolStatus> {
        None
    }
}
