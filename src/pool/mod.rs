mod executor;
mod manager;

pub use executor::{PoolStatus, QueryExecutor, SqlParam};
pub use manager::PoolManager;
