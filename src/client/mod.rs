//! Client core: both transports, reconnection, and the session that
//! reconciles what they deliver into one feed.
//!
//! - [`reconnect`] - Fixed-delay single-shot retry scheduling
//! - [`heartbeat`] - Ping ticker and liveness window for the primary channel
//! - [`primary`] - WebSocket transport
//! - [`fallback`] - SSE transport
//! - [`manager`] - `NotificationSession`, the per-session connection manager
//!
//! # Example
//!
//! ```ignore
//! let session = NotificationSession::start(
//!     ClientConfig::for_base_url("http://localhost:8080"),
//!     Identity::new(user_id, token).with_team(team_id),
//!     Arc::new(NoopObserver),
//! );
//! session.connect()?;
//! let snapshot = session.wait_until(|s| s.status.is_connected).await?;
//! ```

pub mod fallback;
pub mod heartbeat;
pub mod manager;
pub mod primary;
pub mod reconnect;

pub use fallback::{FallbackStream, StreamEvent, StreamFailure, StreamRequest};
pub use heartbeat::{Heartbeat, Liveness};
pub use manager::{Identity, NotificationSession, SessionError, SessionSnapshot};
pub use primary::{PrimaryChannel, PrimaryEvent};
pub use reconnect::ReconnectController;
