//! HTTP route handlers grouped by resource.
//!
//! Handlers are annotated with `#[openapi]` so `rocket_okapi` can derive an
//! OpenAPI document automatically. Authentication routes live in
//! [`crate::auth::routes`].

pub mod catchers;
pub mod health;
pub mod items;
pub mod params;
