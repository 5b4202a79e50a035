// handlers/mod.rs - Tiered handler layout
//
// Public (no auth) → Protected (valid token) → admin-gated routes.
// Gating lives in the router; the generic record handlers in `records`
// serve both public reads and admin mutations.
pub mod payload;
pub mod protected; // Token required (/api/auth/profile)
pub mod public; // No authentication required
pub mod records; // Generic CRUD over a resource schema

pub use payload::{Payload, StagedUploads};
pub use records::{Articles, Categories, Products, Resource, Users};
