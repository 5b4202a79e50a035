pub mod account;
pub mod article;
pub mod category;
pub mod product;

pub use account::ACCOUNTS;
pub use article::ARTICLES;
pub use category::CATEGORIES;
pub use product::PRODUCTS;

use super::schema::ResourceSchema;

/// Every resource schema, in migration order
pub static ALL: &[&ResourceSchema] = &[&ACCOUNTS, &CATEGORIES, &PRODUCTS, &ARTICLES];

pub fn by_table(table: &str) -> Option<&'static ResourceSchema> {
    ALL.iter().copied().find(|s| s.table == table)
}
