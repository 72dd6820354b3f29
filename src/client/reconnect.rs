//! Fixed-delay, single-shot reconnect scheduling.
//!
//! Each transport owns one controller. At most one retry is pending at a
//! time; scheduling while a retry is pending is a no-op. The pending timer
//! is cancelled on success, on explicit disconnect, and when the controller
//! is dropped.

use std::time::Duration;

use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct ReconnectController {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl ReconnectController {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `fire` once after the delay. Returns false if a retry is already pending.
    pub fn schedule<F>(&mut self, fire: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_pending() {
            return false;
        }

        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire();
        }));
        true
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }
}

impl Drop for ReconnectController {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let handle = fired.clone();
        let make = move || {
            let fired = handle.clone();
            Box::new(move || {
                fired.fetch_add(1, Ordering::SeqCst);
            }) as Box<dyn FnOnce() + Send>
        };
        (fired, make)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let (fired, make) = counter();
        let mut controller = ReconnectController::new(Duration::from_secs(3));

        assert!(controller.schedule(make()));
        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!controller.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_schedules_are_ignored() {
        let (fired, make) = counter();
        let mut controller = ReconnectController::new(Duration::from_secs(3));

        assert!(controller.schedule(make()));
        assert!(!controller.schedule(make()));
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_retry_never_fires() {
        let (fired, make) = counter();
        let mut controller = ReconnectController::new(Duration::from_secs(3));

        controller.schedule(make());
        controller.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!controller.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_pending_retry() {
        let (fired, make) = counter();
        {
            let mut controller = ReconnectController::new(Duration::from_secs(3));
            controller.schedule(make());
        }
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn can_reschedule_after_firing() {
        let (fired, make) = counter();
        let mut controller = ReconnectController::new(Duration::from_secs(1));

        controller.schedule(make());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(controller.schedule(make()));
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }
}
