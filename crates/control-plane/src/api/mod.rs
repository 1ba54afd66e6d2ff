// HTTP API routes
//
// Route handlers for the lifecycle API. The owner identity comes from the
// X-API-Key header; key issuance itself lives outside this service.

pub mod common;
pub mod computes;

pub use common::{ErrorResponse, ListResponse};
