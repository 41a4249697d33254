//! Generic CRUD operations over one resource type
//!
//! [`Crud`] composes the query parser, filter evaluator, paginator and
//! projector on top of a [`Collection`]. It is stateless across requests;
//! the only shared state is the collection itself.

use crate::core::error::{AdminError, AdminResult};
use crate::core::filter::FilterEvaluator;
use crate::core::id::ObjectId;
use crate::core::pagination::{PageLinks, Paginator};
use crate::core::projection::{EmbedResolver, Projector, View};
use crate::core::query::{QueryParser, RawQuery};
use crate::core::resource::Resource;
use crate::core::store::Collection;
use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::{Map, Value};
use std::sync::Arc;
use url::Url;

/// Entity specific side effects around writes
#[async_trait]
pub trait WriteHook<T: Resource>: Send + Sync {
    /// Runs on a freshly built entity before it is first saved
    async fn before_create(&self, _entity: &mut T, _input: &Map<String, Value>) -> AdminResult<()> {
        Ok(())
    }

    /// Runs after a create or update was persisted
    ///
    /// Returns the entity as it should be rendered. A failure after a
    /// create removes the new document again.
    async fn after_write(&self, entity: T, _input: &Map<String, Value>) -> AdminResult<T> {
        Ok(entity)
    }

    /// Runs before a partial update is applied to `current`
    async fn before_update(&self, _current: &T, _patch: &Map<String, Value>) -> AdminResult<()> {
        Ok(())
    }

    /// Runs before `entity` is deleted; an error keeps it
    async fn before_delete(&self, _entity: &T) -> AdminResult<()> {
        Ok(())
    }
}

/// One rendered page of a list request
#[derive(Debug, Clone)]
pub struct ListPage {
    pub items: Vec<Value>,
    /// Matches ignoring pagination
    pub total: usize,
    pub links: PageLinks,
}

/// CRUD operations for resource `T`
pub struct Crud<T: Resource> {
    collection: Arc<dyn Collection<T>>,
    resolver: Arc<dyn EmbedResolver>,
    projector: Projector,
    parser: QueryParser,
    hook: Option<Arc<dyn WriteHook<T>>>,
}

impl<T: Resource> Clone for Crud<T> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            resolver: self.resolver.clone(),
            projector: self.projector.clone(),
            parser: self.parser.clone(),
            hook: self.hook.clone(),
        }
    }
}

impl<T: Resource> Crud<T> {
    pub fn new(
        collection: Arc<dyn Collection<T>>,
        resolver: Arc<dyn EmbedResolver>,
        projector: Projector,
        parser: QueryParser,
    ) -> Self {
        Self {
            collection,
            resolver,
            projector,
            parser,
            hook: None,
        }
    }

    /// Attach a write hook
    pub fn with_hook(mut self, hook: Arc<dyn WriteHook<T>>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// The underlying collection
    pub fn collection(&self) -> &Arc<dyn Collection<T>> {
        &self.collection
    }

    /// List a page of documents
    pub async fn list(&self, raw: &RawQuery, current: &Url) -> AdminResult<ListPage> {
        let schema = T::schema();
        let query = self.parser.parse(raw)?;
        if query.fields_requested {
            self.projector.validate_fields(schema, &query.fields)?;
        }
        let view = View::from_query(&query);
        self.projector.validate(schema, &view)?;

        let page = FilterEvaluator::find_page(self.collection.as_ref(), &query).await?;
        let links = Paginator::links(page.total, query.pagination, current);

        let items = try_join_all(
            page.items
                .iter()
                .map(|entity| self.projector.render(entity, &view, self.resolver.as_ref())),
        )
        .await?;

        Ok(ListPage {
            items,
            total: page.total,
            links,
        })
    }

    /// Read one document
    ///
    /// Without `fields` and `embed` every readable field is rendered and
    /// every reference embedded.
    pub async fn read(&self, id: &str, raw: &RawQuery) -> AdminResult<Value> {
        let schema = T::schema();
        let id = parse_id(id)?;
        let query = self.parser.parse(raw)?;
        if query.fields_requested {
            self.projector.validate_fields(schema, &query.fields)?;
        }
        let view = if query.fields_requested || query.embed_requested {
            View::from_query(&query)
        } else {
            View::full(schema)
        };

        let entity = self
            .collection
            .find_by_id(&id)
            .await?
            .ok_or_else(|| AdminError::not_found(schema.singular, id))?;

        self.projector
            .render(&entity, &view, self.resolver.as_ref())
            .await
    }

    /// Create a document from a request body
    pub async fn create(&self, body: &Value) -> AdminResult<Value> {
        let schema = T::schema();
        let input = schema.whitelist(body)?;

        let mut entity = T::from_input(&input)?;
        if let Some(hook) = &self.hook {
            hook.before_create(&mut entity, &input).await?;
        }

        let saved = self.collection.save(entity).await?;
        let saved = match &self.hook {
            Some(hook) => match hook.after_write(saved.clone(), &input).await {
                Ok(entity) => entity,
                Err(err) => {
                    self.discard(&saved).await;
                    return Err(err);
                }
            },
            None => saved,
        };

        tracing::info!(resource = schema.plural, id = %saved.id(), "created");
        self.render_full(&saved).await
    }

    /// Apply a partial update to a document
    pub async fn update(&self, id: &str, body: &Value) -> AdminResult<Value> {
        let schema = T::schema();
        let id = parse_id(id)?;
        let patch = schema.whitelist(body)?;

        if let Some(hook) = &self.hook {
            let current = self.load(&id).await?;
            hook.before_update(&current, &patch).await?;
        }

        let mut updated = self
            .collection
            .update_by_id(&id, &patch)
            .await?
            .ok_or_else(|| AdminError::not_found(schema.singular, id))?;
        if let Some(hook) = &self.hook {
            updated = hook.after_write(updated, &patch).await?;
        }

        tracing::info!(resource = schema.plural, %id, "updated");
        self.render_full(&updated).await
    }

    /// Delete a document
    pub async fn destroy(&self, id: &str) -> AdminResult<()> {
        let schema = T::schema();
        let id = parse_id(id)?;

        if let Some(hook) = &self.hook {
            let entity = self.load(&id).await?;
            hook.before_delete(&entity).await?;
        }

        if self.collection.delete_by_id(&id).await? == 0 {
            return Err(AdminError::not_found(schema.singular, id));
        }

        tracing::info!(resource = schema.plural, %id, "deleted");
        Ok(())
    }

    async fn load(&self, id: &ObjectId) -> AdminResult<T> {
        self.collection
            .find_by_id(id)
            .await?
            .ok_or_else(|| AdminError::not_found(T::schema().singular, id))
    }

    /// Remove a document whose create did not complete
    async fn discard(&self, entity: &T) {
        let plural = T::schema().plural;
        match self.collection.delete_by_id(&entity.id()).await {
            Ok(_) => tracing::warn!(resource = plural, id = %entity.id(), "create rolled back"),
            Err(err) => tracing::error!(
                resource = plural,
                id = %entity.id(),
                error = %err,
                "failed to roll back create"
            ),
        }
    }

    async fn render_full(&self, entity: &T) -> AdminResult<Value> {
        self.projector
            .render(entity, &View::full(T::schema()), self.resolver.as_ref())
            .await
    }
}

/// Validate a path identifier
pub fn parse_id(value: &str) -> AdminResult<ObjectId> {
    ObjectId::parse_str(value).map_err(|_| AdminError::InvalidId {
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resource::ResourceSchema;
    use crate::entities::Permission;
    use crate::storage::InMemoryCollection;
    use serde_json::json;

    struct NoEmbeds;

    #[async_trait]
    impl EmbedResolver for NoEmbeds {
        fn schema_of(&self, _resource: &str) -> Option<&'static ResourceSchema> {
            None
        }

        async fn resolve(
            &self,
            _resource: &str,
            _ids: &[ObjectId],
        ) -> AdminResult<Vec<Map<String, Value>>> {
            Ok(Vec::new())
        }
    }

    fn crud() -> Crud<Permission> {
        Crud::new(
            Arc::new(InMemoryCollection::<Permission>::new()),
            Arc::new(NoEmbeds),
            Projector::new("http://localhost:9000/api"),
            QueryParser::default(),
        )
    }

    fn url(query: &str) -> Url {
        Url::parse(&format!("http://localhost:9000/api/permissions?{}", query)).unwrap()
    }

    async fn seed(crud: &Crud<Permission>, names: &[&str]) {
        for name in names {
            crud.create(&json!({ "name": name })).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_filter_equals_and_not_equals() {
        let crud = crud();
        seed(&crud, &["A", "B", "C"]).await;

        let raw = RawQuery::from_query_str("filters=name==A");
        let page = crud.list(&raw, &url("filters=name==A")).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0]["name"], "A");

        let raw = RawQuery::from_query_str("filters=name!=A");
        let page = crud.list(&raw, &url("filters=name!=A")).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_list_paginates_and_links() {
        let crud = crud();
        seed(&crud, &["A", "B", "C", "D", "E"]).await;

        let raw = RawQuery::from_query_str("sort=-name&size=2&page=2");
        let page = crud.list(&raw, &url("sort=-name&size=2&page=2")).await.unwrap();
        let names: Vec<&str> = page.items.iter().map(|i| i["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["C", "B"]);
        assert_eq!(page.total, 5);
        assert!(page.links.first.is_some());
        assert!(page.links.next.is_some());
    }

    #[tokio::test]
    async fn test_create_whitelists_body() {
        let crud = crud();
        let created = crud
            .create(&json!({ "name": "users:read", "isAdmin": true, "_rev": 9 }))
            .await
            .unwrap();
        assert_eq!(created["name"], "users:read");
        assert!(created.get("isAdmin").is_none());
        assert!(created.get("_rev").is_none());
        assert!(ObjectId::is_valid(created["id"].as_str().unwrap()));
    }

    #[tokio::test]
    async fn test_create_reports_validation_errors() {
        let err = crud().create(&json!({ "name": "" })).await.unwrap_err();
        match err {
            AdminError::Validation(v) => assert_eq!(v.fields(), vec!["name"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_read_update_destroy() {
        let crud = crud();
        let created = crud.create(&json!({ "name": "A" })).await.unwrap();
        let id = created["id"].as_str().unwrap().to_string();

        let read = crud.read(&id, &RawQuery::new()).await.unwrap();
        assert_eq!(read["active"], true);

        let updated = crud
            .update(&id, &json!({ "description": "first letter" }))
            .await
            .unwrap();
        assert_eq!(updated["description"], "first letter");
        assert_eq!(updated["name"], "A");

        crud.destroy(&id).await.unwrap();
        assert!(matches!(
            crud.read(&id, &RawQuery::new()).await,
            Err(AdminError::NotFound { .. })
        ));
        assert!(matches!(
            crud.destroy(&id).await,
            Err(AdminError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_ids() {
        let crud = crud();
        assert!(matches!(
            crud.read("1234", &RawQuery::new()).await,
            Err(AdminError::InvalidId { .. })
        ));
        assert!(matches!(
            crud.update("zzzzzzzzzzzzzzzzzzzzzzzz", &json!({})).await,
            Err(AdminError::InvalidId { .. })
        ));
        assert!(matches!(
            crud.update(&ObjectId::new().to_hex(), &json!({})).await,
            Err(AdminError::NotFound { .. })
        ));
    }
}
