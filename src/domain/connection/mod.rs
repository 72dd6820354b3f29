//! Connection module - transport lifecycles and the consumer-facing status.

mod state;
mod status;

pub use state::{PrimaryState, StreamState};
pub use status::{ConnectionError, ConnectionStatus};
