//! In-memory implementation of Collection for testing and development

use crate::core::error::{AdminResult, StorageError, ValidationError};
use crate::core::field::FieldValue;
use crate::core::filter::{Selector, compare_by};
use crate::core::id::ObjectId;
use crate::core::resource::Resource;
use crate::core::store::{Collection, FindOptions};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::{Arc, RwLock};

const BACKEND: &str = "memory";

fn lock_error(message: impl std::fmt::Display) -> StorageError {
    StorageError::QueryError {
        backend: BACKEND.to_string(),
        message: message.to_string(),
    }
}

/// In-memory collection
///
/// Useful for testing and development. Uses RwLock for thread-safe access;
/// documents keep insertion order, which is also the tie-break order of
/// sorted reads.
#[derive(Clone)]
pub struct InMemoryCollection<T: Resource> {
    documents: Arc<RwLock<IndexMap<ObjectId, T>>>,
}

impl<T: Resource> InMemoryCollection<T> {
    /// Create a new empty collection
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(IndexMap::new())),
        }
    }

    /// Reject `entity` if it collides on a unique field with another document
    fn check_unique(documents: &IndexMap<ObjectId, T>, entity: &T) -> Result<(), ValidationError> {
        let schema = T::schema();
        for field in schema.unique {
            let Some(value) = entity.field_value(field).filter(|v| !v.is_null()) else {
                continue;
            };
            let taken = documents
                .values()
                .any(|other| other.id() != entity.id() && other.field_value(field).as_ref() == Some(&value));
            if taken {
                let shown = match &value {
                    FieldValue::String(s) => s.clone(),
                    other => format!("{:?}", other),
                };
                return Err(ValidationError::field(
                    *field,
                    shown.clone(),
                    "unique",
                    format!("A {} with {} '{}' already exists", schema.singular, field, shown),
                ));
            }
        }
        Ok(())
    }
}

impl<T: Resource> Default for InMemoryCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Resource> Collection<T> for InMemoryCollection<T> {
    async fn find(&self, selector: &Selector, options: &FindOptions) -> AdminResult<Vec<T>> {
        let documents = self
            .documents
            .read()
            .map_err(|e| lock_error(format!("Failed to acquire read lock: {}", e)))?;

        let mut matching: Vec<T> = documents
            .values()
            .filter(|doc| selector.matches(*doc))
            .cloned()
            .collect();
        drop(documents);

        if !options.sort.is_empty() {
            matching.sort_by(|a, b| compare_by(a, b, &options.sort));
        }

        let window = matching
            .into_iter()
            .skip(options.skip)
            .take(options.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(window)
    }

    async fn count(&self, selector: &Selector) -> AdminResult<usize> {
        let documents = self
            .documents
            .read()
            .map_err(|e| lock_error(format!("Failed to acquire read lock: {}", e)))?;

        Ok(documents.values().filter(|doc| selector.matches(*doc)).count())
    }

    async fn find_by_id(&self, id: &ObjectId) -> AdminResult<Option<T>> {
        let documents = self
            .documents
            .read()
            .map_err(|e| lock_error(format!("Failed to acquire read lock: {}", e)))?;

        Ok(documents.get(id).cloned())
    }

    async fn save(&self, entity: T) -> AdminResult<T> {
        let mut documents = self
            .documents
            .write()
            .map_err(|e| lock_error(format!("Failed to acquire write lock: {}", e)))?;

        Self::check_unique(&documents, &entity)?;
        documents.insert(entity.id(), entity.clone());

        tracing::debug!(resource = T::schema().plural, id = %entity.id(), "saved");
        Ok(entity)
    }

    async fn update_by_id(
        &self,
        id: &ObjectId,
        patch: &Map<String, Value>,
    ) -> AdminResult<Option<T>> {
        let mut documents = self
            .documents
            .write()
            .map_err(|e| lock_error(format!("Failed to acquire write lock: {}", e)))?;

        let Some(current) = documents.get(id) else {
            return Ok(None);
        };

        let mut updated = current.clone();
        if !patch.is_empty() {
            updated.apply_patch(patch)?;
            updated.touch();
            Self::check_unique(&documents, &updated)?;
        }
        documents.insert(*id, updated.clone());

        tracing::debug!(resource = T::schema().plural, %id, "updated");
        Ok(Some(updated))
    }

    async fn delete_by_id(&self, id: &ObjectId) -> AdminResult<usize> {
        let mut documents = self
            .documents
            .write()
            .map_err(|e| lock_error(format!("Failed to acquire write lock: {}", e)))?;

        Ok(documents.shift_remove(id).map_or(0, |_| 1))
    }
}
