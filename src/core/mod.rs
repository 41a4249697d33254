//! Core module: identifiers, resource metadata and the resource-query engine

pub mod crud;
pub mod error;
pub mod field;
pub mod filter;
pub mod id;
pub mod pagination;
pub mod projection;
pub mod query;
pub mod resource;
pub mod store;
pub mod validation;

pub use crud::{Crud, ListPage, WriteHook};
pub use error::{AdminError, AdminResult, FieldError, StorageError, ValidationError};
pub use field::{FieldAccess, FieldDef, FieldFormat, FieldKind, FieldValue};
pub use filter::{FilterEvaluator, FilteredPage, Selector};
pub use id::ObjectId;
pub use pagination::{PageLinks, Paginator};
pub use projection::{EmbedResolver, Projector, View};
pub use query::{QueryParser, RawQuery, RawValue, ResourceQuery};
pub use resource::{Resource, ResourceSchema};
pub use store::{Collection, FindOptions};
