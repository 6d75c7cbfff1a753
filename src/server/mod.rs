//! HTTP layer.
//!
//! Three surfaces share one pipeline: the IIIF surface (info documents and
//! derived images), a Deep Zoom surface for OpenSeadragon-style viewers, and
//! a version endpoint. Handlers work from the raw request path because IIIF
//! identifiers may contain percent-encoded slashes that must survive routing
//! untouched.

pub mod dzi;
pub mod handlers;
pub mod routes;

pub use handlers::{AppState, ErrorResponse};
pub use routes::{create_router, RouterConfig};
