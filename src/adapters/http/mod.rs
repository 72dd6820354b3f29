//! HTTP adapters - REST endpoints around the broadcast server.

pub mod error;
pub mod notification;

pub use error::{auth_error_response, domain_error_response, ErrorResponse};
pub use notification::{producer_router, ProducerAppState};
