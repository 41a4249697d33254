//! Projection of raw documents into client-facing representations
//!
//! A projection:
//! - strips internal fields (`_rev`, credential material) and renders
//!   `_id` as `id`
//! - keeps only the requested fields, always adding `id` and `href`
//! - replaces embedded reference fields with the referenced documents,
//!   themselves projected with the requested sub-fields
//!
//! Embedding is single-level: `role.name` is accepted,
//! `role.permissions.name` is rejected.

use crate::core::error::{AdminResult, ValidationError};
use crate::core::id::ObjectId;
use crate::core::query::{DEFAULT_FIELDS, ResourceQuery};
use crate::core::resource::{RAW_ID_KEY, Resource, ResourceSchema};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Fetches raw documents of any registered resource for embedding
#[async_trait]
pub trait EmbedResolver: Send + Sync {
    /// Schema of a resource by plural name
    fn schema_of(&self, resource: &str) -> Option<&'static ResourceSchema>;

    /// Raw documents for the given ids; unknown ids are skipped
    async fn resolve(&self, resource: &str, ids: &[ObjectId]) -> AdminResult<Vec<Map<String, Value>>>;
}

/// What to render for one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    /// `None` renders every readable field
    pub fields: Option<BTreeSet<String>>,
    /// Embed root -> requested sub-fields
    pub embed: BTreeMap<String, BTreeSet<String>>,
}

impl View {
    /// The view requested by a query
    pub fn from_query(query: &ResourceQuery) -> Self {
        let embed = query
            .embed_roots()
            .into_iter()
            .map(|root| (root.to_string(), query.embed_fields(root)))
            .collect();
        Self {
            fields: Some(query.fields.clone()),
            embed,
        }
    }

    /// Every readable field with every reference embedded
    pub fn full(schema: &ResourceSchema) -> Self {
        let defaults: BTreeSet<String> = DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect();
        Self {
            fields: None,
            embed: schema
                .references()
                .map(|def| (def.name.to_string(), defaults.clone()))
                .collect(),
        }
    }
}

/// Shapes documents according to a [`View`]
#[derive(Debug, Clone)]
pub struct Projector {
    href_base: String,
}

impl Projector {
    /// `href_base` is the absolute API root, e.g. `http://localhost:9000/api`
    pub fn new(href_base: impl Into<String>) -> Self {
        Self {
            href_base: href_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Canonical link of a document
    pub fn href(&self, schema: &ResourceSchema, id: &str) -> String {
        format!("{}/{}/{}", self.href_base, schema.plural, id)
    }

    /// Check explicitly requested fields against the schema
    ///
    /// `href` is always accepted; unknown and non-readable fields are not.
    pub fn validate_fields(
        &self,
        schema: &ResourceSchema,
        fields: &BTreeSet<String>,
    ) -> Result<(), ValidationError> {
        match fields
            .iter()
            .find(|f| f.as_str() != "href" && schema.readable_field(f).is_none())
        {
            Some(field) => Err(ValidationError::unknown_field("fields", field, schema.plural)),
            None => Ok(()),
        }
    }

    /// Check embed roots against the schema
    pub fn validate(&self, schema: &ResourceSchema, view: &View) -> Result<(), ValidationError> {
        for (root, sub_fields) in &view.embed {
            if schema.reference_target(root).is_none() {
                return Err(ValidationError::field(
                    "embed",
                    root.as_str(),
                    "unsupported",
                    format!("'{}' is not an embeddable reference of {}", root, schema.plural),
                ));
            }
            if let Some(deep) = sub_fields.iter().find(|f| f.contains('.')) {
                return Err(ValidationError::field(
                    "embed",
                    format!("{}.{}", root, deep),
                    "unsupported",
                    "multi-level embedding is not supported",
                ));
            }
        }
        Ok(())
    }

    /// Shape one raw document without embedding
    ///
    /// `fields = None` keeps every readable field.
    pub fn shape(
        &self,
        raw: &Map<String, Value>,
        schema: &ResourceSchema,
        fields: Option<&BTreeSet<String>>,
    ) -> Map<String, Value> {
        let mut out = Map::new();
        let id = raw.get(RAW_ID_KEY).cloned().unwrap_or(Value::Null);

        for (key, value) in raw {
            if key == RAW_ID_KEY || schema.is_hidden(key) || schema.readable_field(key).is_none() {
                continue;
            }
            if fields.is_some_and(|wanted| !wanted.contains(key)) {
                continue;
            }
            out.insert(key.clone(), value.clone());
        }

        if let Some(id) = id.as_str() {
            out.insert("href".to_string(), Value::String(self.href(schema, id)));
        }
        out.insert("id".to_string(), id);
        out
    }

    /// Render an entity, embedding references through `resolver`
    pub async fn render<T: Resource>(
        &self,
        entity: &T,
        view: &View,
        resolver: &dyn EmbedResolver,
    ) -> AdminResult<Value> {
        let schema = T::schema();
        self.validate(schema, view)?;

        let raw = entity.to_document()?;
        let mut out = self.shape(&raw, schema, view.fields.as_ref());

        for (root, sub_fields) in &view.embed {
            if !out.contains_key(root) {
                continue;
            }
            let Some((target, is_list)) = schema.reference_target(root) else {
                continue;
            };
            let Some(target_schema) = resolver.schema_of(target) else {
                continue;
            };

            let ids = reference_ids(raw.get(root));
            let docs = if ids.is_empty() {
                Vec::new()
            } else {
                resolver.resolve(target, &ids).await?
            };

            let sub_fields = if sub_fields.is_empty() {
                DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect()
            } else {
                sub_fields.clone()
            };

            let mut by_id: HashMap<String, Map<String, Value>> = docs
                .iter()
                .filter_map(|doc| {
                    let id = doc.get(RAW_ID_KEY)?.as_str()?.to_string();
                    Some((id, self.shape(doc, target_schema, Some(&sub_fields))))
                })
                .collect();

            let embedded = if is_list {
                Value::Array(
                    ids.iter()
                        .filter_map(|id| by_id.remove(&id.to_hex()))
                        .map(Value::Object)
                        .collect(),
                )
            } else {
                ids.first()
                    .and_then(|id| by_id.remove(&id.to_hex()))
                    .map_or(Value::Null, Value::Object)
            };
            out.insert(root.clone(), embedded);
        }

        Ok(Value::Object(out))
    }
}

fn reference_ids(value: Option<&Value>) -> Vec<ObjectId> {
    match value {
        Some(Value::String(s)) => ObjectId::parse_str(s).into_iter().collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|s| ObjectId::parse_str(s).ok())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::{QueryParser, RawQuery};
    use crate::entities::{Permission, Role, User};

    /// Resolver over a fixed set of permissions and roles
    struct Fixture {
        permissions: Vec<Permission>,
        roles: Vec<Role>,
    }

    #[async_trait]
    impl EmbedResolver for Fixture {
        fn schema_of(&self, resource: &str) -> Option<&'static ResourceSchema> {
            match resource {
                "permissions" => Some(Permission::schema()),
                "roles" => Some(Role::schema()),
                _ => None,
            }
        }

        async fn resolve(
            &self,
            resource: &str,
            ids: &[ObjectId],
        ) -> AdminResult<Vec<Map<String, Value>>> {
            let mut docs = Vec::new();
            match resource {
                "permissions" => {
                    for p in self.permissions.iter().filter(|p| ids.contains(&p.id)) {
                        docs.push(p.to_document()?);
                    }
                }
                "roles" => {
                    for r in self.roles.iter().filter(|r| ids.contains(&r.id)) {
                        docs.push(r.to_document()?);
                    }
                }
                _ => {}
            }
            Ok(docs)
        }
    }

    fn view(query: &str) -> View {
        let query = QueryParser::default()
            .parse(&RawQuery::from_query_str(query))
            .unwrap();
        View::from_query(&query)
    }

    fn projector() -> Projector {
        Projector::new("http://localhost:9000/api/")
    }

    fn fields(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_requested_fields_must_be_readable() {
        assert!(
            projector()
                .validate_fields(User::schema(), &fields(&["username", "href", "role"]))
                .is_ok()
        );

        let err = projector()
            .validate_fields(User::schema(), &fields(&["passwordHash"]))
            .unwrap_err();
        assert_eq!(err.fields(), vec!["fields"]);
        assert_eq!(err.errors[0].kind, "unknown_field");

        assert!(
            projector()
                .validate_fields(Permission::schema(), &fields(&["bogus"]))
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_requested_fields_always_include_id_and_href() {
        let p = Permission::named("users:read");
        let fixture = Fixture {
            permissions: vec![],
            roles: vec![],
        };
        let out = projector()
            .render(&p, &view("fields=name"), &fixture)
            .await
            .unwrap();

        assert_eq!(out["name"], "users:read");
        assert_eq!(out["id"], p.id.to_hex());
        assert_eq!(
            out["href"],
            format!("http://localhost:9000/api/permissions/{}", p.id)
        );
        assert!(out.get("description").is_none());
        assert!(out.get("_id").is_none());
        assert!(out.get("_rev").is_none());
    }

    #[tokio::test]
    async fn test_internal_fields_are_never_rendered() {
        let user = User::from_input(
            serde_json::json!({
                "username": "jdoe",
                "email": "jdoe@example.com",
                "password": "password123"
            })
            .as_object()
            .unwrap(),
        )
        .unwrap();
        let fixture = Fixture {
            permissions: vec![],
            roles: vec![],
        };
        let out = projector()
            .render(&user, &View::full(User::schema()), &fixture)
            .await
            .unwrap();

        assert_eq!(out["username"], "jdoe");
        assert!(out.get("passwordHash").is_none());
        assert!(out.get("salt").is_none());
        assert!(out.get("password").is_none());
    }

    #[tokio::test]
    async fn test_embed_list_keeps_reference_order() {
        let read = Permission::named("read");
        let write = Permission::named("write");
        let mut role = Role::named("editor");
        role.permissions = vec![write.id, read.id];

        let fixture = Fixture {
            permissions: vec![read.clone(), write.clone()],
            roles: vec![],
        };
        let out = projector()
            .render(&role, &view("embed=permissions.name"), &fixture)
            .await
            .unwrap();

        let embedded = out["permissions"].as_array().unwrap();
        assert_eq!(embedded.len(), 2);
        assert_eq!(embedded[0]["name"], "write");
        assert_eq!(embedded[1]["name"], "read");
        assert!(embedded[0].get("id").is_some());
        assert!(embedded[0].get("createdAt").is_none());
    }

    #[tokio::test]
    async fn test_embed_single_reference_with_default_fields() {
        let role = Role::named("member");
        let mut user = User::from_input(
            serde_json::json!({
                "username": "jdoe",
                "email": "jdoe@example.com",
                "password": "password123"
            })
            .as_object()
            .unwrap(),
        )
        .unwrap();
        user.role = Some(role.id);

        let fixture = Fixture {
            permissions: vec![],
            roles: vec![role.clone()],
        };
        let out = projector()
            .render(&user, &view("fields=username&embed=role"), &fixture)
            .await
            .unwrap();

        assert_eq!(out["role"]["name"], "member");
        assert_eq!(out["role"]["id"], role.id.to_hex());
        assert!(out["role"]["href"].as_str().unwrap().ends_with(&role.id.to_hex()));
        assert!(out["role"].get("permissions").is_none());
    }

    #[tokio::test]
    async fn test_dangling_reference_renders_null() {
        let mut user = User::from_input(
            serde_json::json!({
                "username": "jdoe",
                "email": "jdoe@example.com",
                "password": "password123"
            })
            .as_object()
            .unwrap(),
        )
        .unwrap();
        user.role = Some(ObjectId::new());

        let fixture = Fixture {
            permissions: vec![],
            roles: vec![],
        };
        let out = projector()
            .render(&user, &view("embed=role"), &fixture)
            .await
            .unwrap();
        assert!(out["role"].is_null());
    }

    #[tokio::test]
    async fn test_multi_level_and_non_reference_embeds_are_rejected() {
        let role = Role::named("editor");
        let fixture = Fixture {
            permissions: vec![],
            roles: vec![],
        };

        let err = projector()
            .render(&role, &view("embed=permissions.roles.name"), &fixture)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("multi-level"));

        assert!(
            projector()
                .render(&role, &view("embed=description"), &fixture)
                .await
                .is_err()
        );
    }

    #[test]
    fn test_full_view_embeds_every_reference() {
        let view = View::full(Role::schema());
        assert!(view.fields.is_none());
        assert_eq!(view.embed.keys().collect::<Vec<_>>(), vec!["permissions"]);
    }
}
