//! Authentication adapters implementing the `SessionValidator` port.
//!
//! - `jwt` - HS256 shared-secret identity tokens
//! - `mock` - Fixed token table for tests

mod jwt;
mod mock;

pub use jwt::{IdentityClaims, JwtSessionValidator};
pub use mock::MockSessionValidator;
