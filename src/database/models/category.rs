use crate::database::schema::{FieldSpec, ResourceSchema};
use crate::validation::FieldKind;

// Category names are not unique; duplicates are allowed.
pub static CATEGORIES: ResourceSchema = ResourceSchema {
    label: "Category",
    table: "categories",
    fields: &[FieldSpec::required("name", FieldKind::DisplayName)],
    hidden: &[],
    touch_column: "updated_at",
    created_column: "created_at",
};
