//! Primary channel liveness.
//!
//! [`Heartbeat`] ticks on a fixed interval while the channel is
//! authenticated; the session sends `ping` on each tick. [`Liveness`]
//! tracks when anything was last received so a silent connection is
//! detected before the transport notices.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Periodic tick task. Stops when dropped.
#[derive(Debug)]
pub struct Heartbeat {
    task: JoinHandle<()>,
}

impl Heartbeat {
    /// Calls `on_tick` every `interval`, first after one full interval.
    /// The task ends when `on_tick` returns false.
    pub fn start<F>(interval: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !on_tick() {
                    break;
                }
            }
        });
        Self { task }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Time since the peer was last heard from.
#[derive(Debug, Clone, Copy)]
pub struct Liveness {
    window: Duration,
    last_seen: Instant,
}

impl Liveness {
    /// A connection is dead once nothing arrived for `window`.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_seen: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn is_expired(&self) -> bool {
        self.last_seen.elapsed() > self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn ticks_on_interval_until_dropped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let heartbeat = Heartbeat::start(Duration::from_secs(30), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);

        drop(heartbeat);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_callback_declines() {
        let heartbeat = Heartbeat::start(Duration::from_secs(1), || false);

        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;

        assert!(!heartbeat.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn liveness_expires_without_traffic() {
        let mut liveness = Liveness::new(Duration::from_secs(40));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!liveness.is_expired());

        liveness.touch();
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!liveness.is_expired());

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(liveness.is_expired());
    }
}
