//! Storage collaborator trait
//!
//! The query engine and the permission cascade only talk to storage
//! through [`Collection`]. Implementations decide how documents are
//! physically kept.

use crate::core::error::AdminResult;
use crate::core::filter::Selector;
use crate::core::id::ObjectId;
use crate::core::query::SortKey;
use crate::core::resource::Resource;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Sorting and windowing applied by [`Collection::find`]
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub sort: Vec<SortKey>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl FindOptions {
    /// Options returning at most one document
    pub fn first() -> Self {
        Self {
            limit: Some(1),
            ..Self::default()
        }
    }
}

/// A collection of documents of one resource type
#[async_trait]
pub trait Collection<T: Resource>: Send + Sync {
    /// Matching documents, sorted and windowed
    async fn find(&self, selector: &Selector, options: &FindOptions) -> AdminResult<Vec<T>>;

    /// Number of matching documents, ignoring any window
    async fn count(&self, selector: &Selector) -> AdminResult<usize>;

    /// Get a document by id
    async fn find_by_id(&self, id: &ObjectId) -> AdminResult<Option<T>>;

    /// Insert or replace a document
    ///
    /// Unique field violations fail with a `ValidationError`.
    async fn save(&self, entity: T) -> AdminResult<T>;

    /// Apply a partial update and return the new version
    ///
    /// Returns `None` when no document has this id.
    async fn update_by_id(&self, id: &ObjectId, patch: &Map<String, Value>)
    -> AdminResult<Option<T>>;

    /// Delete a document, returning the number removed
    async fn delete_by_id(&self, id: &ObjectId) -> AdminResult<usize>;

    /// First matching document in storage order
    async fn find_one(&self, selector: &Selector) -> AdminResult<Option<T>> {
        Ok(self
            .find(selector, &FindOptions::first())
            .await?
            .into_iter()
            .next())
    }
}
