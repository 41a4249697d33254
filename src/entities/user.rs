//! User entity

use crate::core::error::AdminResult;
use crate::core::field::{FieldAccess, FieldDef, FieldKind, FieldValue};
use crate::core::filter::Selector;
use crate::core::id::ObjectId;
use crate::core::resource::ResourceSchema;
use crate::core::store::Collection;
use crate::core::validation::validators::{email, required, string_length};
use crate::core::validation::{FieldChecks, filters};
use crate::entities::password::PasswordCrypto;
use crate::impl_resource;
use serde_json::{Map, Value};

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 6;

const MAX_PASSWORD_LENGTH: usize = 128;

static FIELDS: &[FieldDef] = &[
    FieldDef::new("id", FieldKind::Id, FieldAccess::ReadOnly),
    FieldDef::new("firstName", FieldKind::String, FieldAccess::ReadWrite),
    FieldDef::new("lastName", FieldKind::String, FieldAccess::ReadWrite),
    FieldDef::new("fullName", FieldKind::String, FieldAccess::ReadWrite),
    FieldDef::new("username", FieldKind::String, FieldAccess::ReadWrite),
    FieldDef::new("email", FieldKind::String, FieldAccess::ReadWrite),
    FieldDef::new("password", FieldKind::String, FieldAccess::WriteOnly),
    FieldDef::new("passwordHash", FieldKind::String, FieldAccess::Internal),
    FieldDef::new("salt", FieldKind::String, FieldAccess::Internal),
    FieldDef::new("role", FieldKind::Reference("roles"), FieldAccess::ReadWrite),
    FieldDef::new("createdAt", FieldKind::DateTime, FieldAccess::ReadOnly),
    FieldDef::new("updatedAt", FieldKind::DateTime, FieldAccess::ReadOnly),
];

pub static USER_SCHEMA: ResourceSchema = ResourceSchema {
    plural: "users",
    singular: "user",
    fields: FIELDS,
    unique: &["username"],
};

impl_resource!(
    /// An account holder
    ///
    /// The user owns its credential material; the role is only referenced.
    User,
    USER_SCHEMA,
    {
        first_name: Option<String>,
        last_name: Option<String>,
        full_name: String,
        username: String,
        email: String,
        password_hash: String,
        salt: String,
        role: Option<ObjectId>,
    }
);

impl User {
    /// Check a clear-text password against the stored hash
    pub fn verify_password(&self, password: &str) -> AdminResult<bool> {
        PasswordCrypto::new().verify(password, &self.password_hash)
    }

    fn set_password(&mut self, password: &str) -> AdminResult<()> {
        let hashed = PasswordCrypto::new().hash(password)?;
        self.password_hash = hashed.hash;
        self.salt = hashed.salt;
        Ok(())
    }

    /// Set first and last name from `"First Last"`
    ///
    /// The first word becomes the first name, the rest the last name.
    pub fn set_full_name(&mut self, full_name: &str) {
        let (first, last) = split_full_name(full_name);
        self.first_name = Some(first);
        self.last_name = Some(last);
        self.refresh_full_name();
    }

    fn refresh_full_name(&mut self) {
        self.full_name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
    }

    fn read_field(&self, field: &str) -> Option<FieldValue> {
        match field {
            "firstName" => Some(self.first_name.as_deref().into()),
            "lastName" => Some(self.last_name.as_deref().into()),
            "fullName" => Some(FieldValue::String(self.full_name.clone())),
            "username" => Some(FieldValue::String(self.username.clone())),
            "email" => Some(FieldValue::String(self.email.clone())),
            "role" => Some(self.role.map_or(FieldValue::Null, FieldValue::Id)),
            _ => None,
        }
    }

    fn build(input: &Map<String, Value>) -> AdminResult<Self> {
        let mut checks = FieldChecks::new(input);
        let full_name = checks.string_with("fullName", filters::trim, &[]);
        let first_name = checks.string_with("firstName", filters::trim, &[]);
        let last_name = checks.string_with("lastName", filters::trim, &[]);
        let username = checks.string_with(
            "username",
            filters::trim,
            &[&required("Username is required")],
        );
        let email_address = checks.string_with(
            "email",
            filters::trim,
            &[
                &required("Email is required"),
                &email("Please fill a valid e-mail address"),
            ],
        );
        let password = checks.string(
            "password",
            &[
                &required("Password is required"),
                &string_length(MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH),
            ],
        );
        let role = checks.id("role");
        checks.finish()?;

        let (first_name, last_name) = match full_name.as_deref().map(split_full_name) {
            Some((first, last)) => (first_name.or(Some(first)), last_name.or(Some(last))),
            None => (first_name, last_name),
        };

        let mut user = Self::from_parts(
            first_name,
            last_name,
            String::new(),
            username.unwrap_or_default(),
            email_address.unwrap_or_default(),
            String::new(),
            String::new(),
            role,
        );
        user.refresh_full_name();
        user.set_password(&password.unwrap_or_default())?;
        Ok(user)
    }

    fn patch(&mut self, patch: &Map<String, Value>) -> AdminResult<()> {
        let mut checks = FieldChecks::new(patch);
        let full_name = checks.string_with("fullName", filters::trim, &[]);
        let first_name = checks.string_with("firstName", filters::trim, &[]);
        let last_name = checks.string_with("lastName", filters::trim, &[]);
        let username = if checks.contains("username") {
            checks.string_with(
                "username",
                filters::trim,
                &[&required("Username is required")],
            )
        } else {
            None
        };
        let email_address = if checks.contains("email") {
            checks.string_with(
                "email",
                filters::trim,
                &[
                    &required("Email is required"),
                    &email("Please fill a valid e-mail address"),
                ],
            )
        } else {
            None
        };
        let password = if checks.contains("password") {
            checks.string(
                "password",
                &[
                    &required("Password is required"),
                    &string_length(MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH),
                ],
            )
        } else {
            None
        };
        let role = checks.id("role");
        checks.finish()?;

        if let Some(full_name) = full_name {
            self.set_full_name(&full_name);
        }
        if patch.contains_key("firstName") {
            self.first_name = first_name;
        }
        if patch.contains_key("lastName") {
            self.last_name = last_name;
        }
        if let Some(username) = username {
            self.username = username;
        }
        if let Some(email_address) = email_address {
            self.email = email_address;
        }
        if patch.contains_key("role") {
            self.role = role;
        }
        if let Some(password) = password {
            self.set_password(&password)?;
        }
        self.refresh_full_name();
        Ok(())
    }
}

fn split_full_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.next().unwrap_or_default().trim().to_string();
    (first, last)
}

/// First free username among `base`, `base1`, `base2`, ...
pub async fn unique_username(users: &dyn Collection<User>, base: &str) -> AdminResult<String> {
    let base = base.trim();
    let mut suffix = 0usize;
    loop {
        let candidate = match suffix {
            0 => base.to_string(),
            n => format!("{}{}", base, n),
        };
        if users
            .find_one(&Selector::eq("username", &candidate))
            .await?
            .is_none()
        {
            return Ok(candidate);
        }
        suffix += 1;
    }
}
