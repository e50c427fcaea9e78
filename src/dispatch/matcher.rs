//! Path matching
//!
//! - `/{resource}` matches a collection exactly (one trailing slash tolerated)
//! - `/{resource}/{id}` matches an item; the identifier is percent-decoded
//!
//! Anything else is an unknown resource.

use crate::error::{GatewayError, Result};
use crate::registry::{Registry, ResourceDescriptor};

#[derive(Debug, PartialEq)]
pub enum RouteMatch<'a> {
    Collection(&'a ResourceDescriptor),
    Item {
        resource: &'a ResourceDescriptor,
        id: String,
    },
}

impl<'a> RouteMatch<'a> {
    pub fn resource(&self) -> &'a ResourceDescriptor {
        match self {
            RouteMatch::Collection(resource) => resource,
            RouteMatch::Item { resource, .. } => resource,
        }
    }
}

pub fn match_path<'a>(registry: &'a Registry, path: &str) -> Result<RouteMatch<'a>> {
    let unknown = || GatewayError::UnknownResource {
        path: path.to_string(),
    };

    let trimmed = path.strip_suffix('/').unwrap_or(path);
    let segments: Vec<&str> = trimmed
        .strip_prefix('/')
        .ok_or_else(unknown)?
        .split('/')
        .collect();

    let resource = segments
        .first()
        .filter(|first| !first.is_empty())
        .and_then(|first| registry.by_collection_path(&format!("/{}", first)))
        .ok_or_else(unknown)?;

    match segments.as_slice() {
        [_] => Ok(RouteMatch::Collection(resource)),
        [_, last] => {
            let id = urlencoding::decode(last)
                .map_err(|_| unknown())?
                .into_owned();
            if id.is_empty() {
                return Err(unknown());
            }
            Ok(RouteMatch::Item { resource, id })
        }
        _ => Err(unknown()),
    }
}
