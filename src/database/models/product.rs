use crate::database::schema::{FieldSpec, ResourceSchema};
use crate::validation::FieldKind;

/// Products. `category` is a free-form tag, not a foreign key.
pub static PRODUCTS: ResourceSchema = ResourceSchema {
    label: "Product",
    table: "products",
    fields: &[
        FieldSpec::required("name", FieldKind::DisplayName),
        FieldSpec::required("price", FieldKind::Price),
        FieldSpec::optional("description", FieldKind::LongText),
        FieldSpec::optional("image_url", FieldKind::MediaUrl),
        FieldSpec::optional("category", FieldKind::ShortText),
    ],
    hidden: &[],
    touch_column: "updated_at",
    created_column: "created_at",
};
