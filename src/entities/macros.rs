//! Macros for reducing boilerplate when defining entities
//!
//! Every stored entity carries the same bookkeeping fields (`_id`,
//! `_rev`, `createdAt`, `updatedAt`) and the same trivial parts of the
//! [`Resource`](crate::core::resource::Resource) implementation.

/// Define an entity struct and implement `Resource` for it
///
/// Injects: id (`_id`), revision (`_rev`), created_at, updated_at
///
/// The type must provide three inherent methods the generated impl
/// delegates to:
/// - `fn read_field(&self, field: &str) -> Option<FieldValue>` for its
///   own fields
/// - `fn build(input: &Map<String, Value>) -> AdminResult<Self>`
/// - `fn patch(&mut self, patch: &Map<String, Value>) -> AdminResult<()>`
///
/// # Example
/// ```rust,ignore
/// impl_resource!(
///     /// A named grant
///     Permission,
///     PERMISSION_SCHEMA,
///     {
///         name: String,
///         active: bool,
///     }
/// );
///
/// let p = Permission::from_parts("users:read".to_string(), true);
/// ```
#[macro_export]
macro_rules! impl_resource {
    (
        $(#[$meta:meta])*
        $type:ident,
        $schema:expr,
        {
            $( $(#[$field_meta:meta])* $field:ident : $field_type:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $type {
            /// Unique identifier
            #[serde(rename = "_id")]
            pub id: $crate::core::id::ObjectId,

            /// Revision marker, bumped on every update
            #[serde(rename = "_rev")]
            pub revision: u32,

            $( $(#[$field_meta])* pub $field : $field_type, )*

            /// When this entity was created
            pub created_at: ::chrono::DateTime<::chrono::Utc>,

            /// When this entity was last updated
            pub updated_at: ::chrono::DateTime<::chrono::Utc>,
        }

        impl $crate::core::resource::Resource for $type {
            fn schema() -> &'static $crate::core::resource::ResourceSchema {
                &$schema
            }

            fn id(&self) -> $crate::core::id::ObjectId {
                self.id
            }

            fn revision(&self) -> u32 {
                self.revision
            }

            fn created_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.created_at
            }

            fn field_value(&self, field: &str) -> Option<$crate::core::field::FieldValue> {
                use $crate::core::field::FieldValue;
                match field {
                    "id" => Some(FieldValue::Id(self.id)),
                    "createdAt" => Some(FieldValue::DateTime(self.created_at)),
                    "updatedAt" => Some(FieldValue::DateTime(self.updated_at)),
                    other => self.read_field(other),
                }
            }

            fn from_input(
                input: &::serde_json::Map<String, ::serde_json::Value>,
            ) -> $crate::core::error::AdminResult<Self> {
                Self::build(input)
            }

            fn apply_patch(
                &mut self,
                patch: &::serde_json::Map<String, ::serde_json::Value>,
            ) -> $crate::core::error::AdminResult<()> {
                self.patch(patch)
            }

            fn touch(&mut self) {
                self.updated_at = ::chrono::Utc::now();
                self.revision += 1;
            }
        }

        impl $type {
            /// Create a new instance with fresh bookkeeping fields
            #[allow(clippy::too_many_arguments)]
            pub fn from_parts($( $field: $field_type ),*) -> Self {
                let now = ::chrono::Utc::now();
                Self {
                    id: $crate::core::id::ObjectId::new(),
                    revision: 0,
                    $( $field, )*
                    created_at: now,
                    updated_at: now,
                }
            }
        }
    };
}
