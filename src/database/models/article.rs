use crate::database::schema::{FieldSpec, ResourceSchema};
use crate::validation::FieldKind;

pub static ARTICLES: ResourceSchema = ResourceSchema {
    label: "Article",
    table: "articles",
    fields: &[
        FieldSpec::required("title", FieldKind::Title),
        FieldSpec::required("body", FieldKind::Body),
        FieldSpec::optional("image_url", FieldKind::MediaUrl),
        FieldSpec::optional("author", FieldKind::ShortText),
        FieldSpec::required("status", FieldKind::ArticleStatus).with_default("draft"),
    ],
    hidden: &[],
    touch_column: "updated_at",
    created_column: "created_at",
};
