//! Inventory Gateway Library
//!
//! Exposes inventory, purchasing, production and sales tables as REST
//! resources, forwarding each request to a parameterized PostgreSQL
//! statement chosen from an immutable resource registry.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod pool;
pub mod registry;
