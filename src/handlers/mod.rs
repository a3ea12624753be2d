// handlers/mod.rs - HTTP handlers
//
// resource: generic CRUD core shared by every resource kind
// routes:   axum glue mounting one ResourceHandler under /v1/{kind} (auth required)
// system:   public service description and health check
pub mod resource;
pub mod routes;
pub mod system;

pub use resource::{ResourceError, ResourceHandler};
pub use routes::{resource_routes, CreateResult, SuccessResult};
