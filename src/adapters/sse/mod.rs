//! Broadcast server: fallback stream (server-sent events).

pub mod handler;
pub mod messages;

pub use handler::{
    stream_handler, stream_router, EventStreamState, StreamQuery, DEFAULT_STREAM_HEARTBEAT,
    DEFAULT_STREAM_MAX_DURATION,
};
pub use messages::StreamMessage;
