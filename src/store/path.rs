//! Slash separated addresses of collections and documents
//!
//! A collection path has an odd number of segments (`games`,
//! `games/{id}/votes`), a document path an even number (`games/{id}`).

use super::error::{StoreError, StoreResult};
use std::fmt;

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.contains('/')
}

/// Address of a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Top level collection. `name` comes from configuration and is trusted.
    pub fn root(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Parse a full collection path
    pub fn parse(path: &str) -> StoreResult<Self> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() % 2 == 0 || !segments.iter().all(|s| valid_segment(s)) {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(Self(path.to_string()))
    }

    /// Address a document inside this collection.
    ///
    /// Ids arrive from callers and are rejected when empty or when they would
    /// address a deeper path.
    pub fn doc(&self, id: &str) -> StoreResult<DocumentPath> {
        if !valid_segment(id) {
            return Err(StoreError::InvalidPath(format!("{}/{}", self.0, id)));
        }
        Ok(DocumentPath(format!("{}/{}", self.0, id)))
    }

    /// Last segment of the path
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address of a single document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath(String);

impl DocumentPath {
    /// Parse a full document path
    pub fn parse(path: &str) -> StoreResult<Self> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() % 2 != 0 || !segments.iter().all(|s| valid_segment(s)) {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(Self(path.to_string()))
    }

    /// Document id, the last segment
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The collection holding this document
    pub fn parent(&self) -> CollectionPath {
        match self.0.rsplit_once('/') {
            Some((parent, _)) => CollectionPath(parent.to_string()),
            None => CollectionPath(String::new()),
        }
    }

    /// Sub-collection owned by this document
    pub fn collection(&self, name: &str) -> CollectionPath {
        CollectionPath(format!("{}/{}", self.0, name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
