//! Request dispatch
//!
//! Maps (method, path, body) onto a resource descriptor and one of its
//! statements, binds the arguments, and runs the statement under the
//! in-flight limit and query timeout.

pub mod binder;
pub mod matcher;

use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::pool::{QueryExecutor, SqlParam};
use crate::registry::{Registry, ResourceDescriptor};
use axum::http::Method;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::debug;

use self::matcher::{match_path, RouteMatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

/// Result of a dispatched request, before it becomes an HTTP response
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// Row sequence (collection reads, multi-row item reads)
    Rows(Vec<Value>),
    /// Exactly one row from an item read
    Row(Value),
    /// Rows returned by an insert
    Created(Vec<Value>),
    Updated { resource: String, id: String },
    Deleted { resource: String, id: String },
}

#[derive(Debug, Clone, Copy)]
pub struct DispatchLimits {
    pub max_in_flight: usize,
    pub queue_timeout: Duration,
    pub query_timeout: Duration,
}

impl From<&Config> for DispatchLimits {
    fn from(config: &Config) -> Self {
        Self {
            max_in_flight: config.max_in_flight,
            queue_timeout: config.queue_timeout,
            query_timeout: config.query_timeout,
        }
    }
}

pub struct Dispatcher {
    registry: Arc<Registry>,
    executor: Arc<dyn QueryExecutor>,
    permits: Semaphore,
    limits: DispatchLimits,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        executor: Arc<dyn QueryExecutor>,
        limits: DispatchLimits,
    ) -> Self {
        Self {
            registry,
            executor,
            permits: Semaphore::new(limits.max_in_flight.max(1)),
            limits,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn executor(&self) -> &dyn QueryExecutor {
        self.executor.as_ref()
    }

    /// Database calls currently holding an in-flight slot
    pub fn in_flight(&self) -> usize {
        self.limits
            .max_in_flight
            .max(1)
            .saturating_sub(self.permits.available_permits())
    }

    pub async fn dispatch(&self, method: &Method, path: &str, body: &[u8]) -> Result<Outcome> {
        let route = match_path(&self.registry, path)?;
        let resource = route.resource();

        let operation = match (&route, method) {
            (RouteMatch::Collection(_), &Method::GET | &Method::HEAD) => Operation::List,
            (RouteMatch::Collection(_), &Method::POST) if resource.insert_query.is_some() => {
                Operation::Create
            }
            (RouteMatch::Item { .. }, &Method::GET | &Method::HEAD) => Operation::Get,
            (RouteMatch::Item { .. }, &Method::PUT) if resource.update_query.is_some() => {
                Operation::Update
            }
            (RouteMatch::Item { .. }, &Method::DELETE) if resource.delete_query.is_some() => {
                Operation::Delete
            }
            _ => {
                return Err(GatewayError::MethodNotAllowed {
                    method: method.to_string(),
                    path: path.to_string(),
                })
            }
        };

        let id = match &route {
            RouteMatch::Item { id, .. } => id.as_str(),
            RouteMatch::Collection(_) => "",
        };

        let started = Instant::now();
        let outcome = self
            .run(resource, operation, id, body)
            .await
            .map_err(|e| e.for_resource(resource.name))?;

        debug!(
            resource = resource.name,
            operation = operation.as_str(),
            rows = outcome.row_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dispatched {} {}",
            method,
            path
        );

        Ok(outcome)
    }

    async fn run(
        &self,
        resource: &ResourceDescriptor,
        operation: Operation,
        id: &str,
        body: &[u8],
    ) -> Result<Outcome> {
        match operation {
            Operation::List => {
                let rows = self.query(&resource.select_all_query, &[]).await?;
                Ok(Outcome::Rows(rows))
            }
            Operation::Get => {
                let mut rows = self
                    .query(&resource.select_one_query, &binder::bind_identifier(id))
                    .await?;
                match rows.len() {
                    0 => Err(GatewayError::NoMatches {
                        resource: resource.name.to_string(),
                        id: id.to_string(),
                    }),
                    1 => Ok(Outcome::Row(rows.remove(0))),
                    _ => Ok(Outcome::Rows(rows)),
                }
            }
            Operation::Create => {
                let fields = binder::parse_body(resource, body)?;
                let params = binder::bind_insert(resource, &fields)?;
                let rows = self
                    .query(resource.insert_query.as_deref().unwrap_or_default(), &params)
                    .await?;
                Ok(Outcome::Created(rows))
            }
            Operation::Update => {
                let fields = binder::parse_body(resource, body)?;
                let params = binder::bind_update(resource, &fields, id)?;
                let affected = self
                    .execute(resource.update_query.as_deref().unwrap_or_default(), &params)
                    .await?;
                self.require_affected(resource, id, affected)?;
                Ok(Outcome::Updated {
                    resource: resource.name.to_string(),
                    id: id.to_string(),
                })
            }
            Operation::Delete => {
                let affected = self
                    .execute(
                        resource.delete_query.as_deref().unwrap_or_default(),
                        &binder::bind_identifier(id),
                    )
                    .await?;
                self.require_affected(resource, id, affected)?;
                Ok(Outcome::Deleted {
                    resource: resource.name.to_string(),
                    id: id.to_string(),
                })
            }
        }
    }

    fn require_affected(&self, resource: &ResourceDescriptor, id: &str, affected: u64) -> Result<()> {
        if affected == 0 {
            return Err(GatewayError::NoMatches {
                resource: resource.name.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Value>> {
        self.limited(self.executor.query_json(sql, params)).await
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        self.limited(self.executor.execute(sql, params)).await
    }

    /// Run a database call holding an in-flight permit, bounded by the query timeout
    async fn limited<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _permit = match timeout(self.limits.queue_timeout, self.permits.acquire()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(GatewayError::Internal("dispatcher is shut down".to_string())),
            Err(_) => return Err(GatewayError::Overloaded),
        };

        let started = Instant::now();
        match timeout(self.limits.query_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout {
                elapsed: started.elapsed(),
            }),
        }
    }
}

impl Outcome {
    pub fn row_count(&self) -> usize {
        match self {
            Outcome::Rows(rows) | Outcome::Created(rows) => rows.len(),
            Outcome::Row(_) | Outcome::Updated { .. } | Outcome::Deleted { .. } => 1,
        }
    }
}
