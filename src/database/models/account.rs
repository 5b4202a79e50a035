use crate::database::schema::{FieldSpec, ResourceSchema};
use crate::validation::FieldKind;

/// Accounts. `password` holds a bcrypt digest and is never returned.
pub static ACCOUNTS: ResourceSchema = ResourceSchema {
    label: "User",
    table: "users",
    fields: &[
        FieldSpec::required("username", FieldKind::IdentityName).unique(),
        FieldSpec::required("email", FieldKind::Email).unique(),
        FieldSpec::required("password", FieldKind::Password).create_only(),
        FieldSpec::required("role", FieldKind::Role).with_default("user"),
        FieldSpec::optional("avatar_url", FieldKind::MediaUrl),
        FieldSpec::optional("address", FieldKind::Address),
        FieldSpec::optional("phone", FieldKind::Phone),
    ],
    hidden: &["password"],
    touch_column: "updated_at",
    created_column: "created_at",
};

/// Fields accepted by public self-registration. Role is always the default.
pub const REGISTRATION_FIELDS: &[&str] = &["username", "email", "password", "address", "phone"];

/// Fields an account may change on its own profile
pub const PROFILE_FIELDS: &[&str] = &["username", "email", "avatar_url", "address", "phone"];
