//! Resource Registry
//!
//! Immutable mapping from resource name to its descriptor. Built once at
//! startup, validated, then shared read-only by every handler.

mod descriptor;
mod resources;

pub use descriptor::{Column, ColumnKind, DescriptorBuilder, ResourceDescriptor};
pub use resources::inventory_resources;

use crate::error::{GatewayError, Result};
use std::collections::HashMap;
use tracing::debug;

pub struct Registry {
    resources: HashMap<&'static str, ResourceDescriptor>,
    /// Registration order, used when listing resources
    order: Vec<&'static str>,
}

impl Registry {
    pub fn new(descriptors: Vec<ResourceDescriptor>) -> Result<Self> {
        let mut resources = HashMap::with_capacity(descriptors.len());
        let mut order = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            descriptor.validate()?;

            let name = descriptor.name;
            if resources.insert(name, descriptor).is_some() {
                return Err(GatewayError::InvalidRegistry(format!(
                    "resource '{}' registered twice",
                    name
                )));
            }
            order.push(name);
            debug!("Registered resource: /{}", name);
        }

        Ok(Self { resources, order })
    }

    /// Registry holding the eight inventory resources
    pub fn inventory() -> Result<Self> {
        Self::new(inventory_resources())
    }

    pub fn get(&self, name: &str) -> Option<&ResourceDescriptor> {
        self.resources.get(name)
    }

    /// Look up by collection path (`/insumos`)
    pub fn by_collection_path(&self, path: &str) -> Option<&ResourceDescriptor> {
        path.strip_prefix('/').and_then(|name| self.get(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.order.iter().filter_map(|name| self.resources.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
