//! Reconciliation engine.
//!
//! Merges notifications arriving from either transport into one
//! deduplicated, time-ordered, bounded collection whose read-state only
//! moves forward.
//!
//! # Merge rules
//!
//! - Identity is the notification id alone.
//! - A copy already cached is replaced only when it is unread and the
//!   incoming copy is read. Otherwise the cached copy wins, so the effective
//!   read flag is the OR of every copy seen.
//! - Entries are ordered by `occurred_at` descending (ties by id) and
//!   truncated to the capacity, evicting the oldest regardless of read-state.
//!
//! Together these make merging idempotent and order-independent for copies
//! of the same producer event.

use std::collections::VecDeque;

use crate::domain::foundation::NotificationId;

use super::{Notification, SystemNotification};

/// Default number of notifications kept in memory.
pub const DEFAULT_FEED_CAPACITY: usize = 50;

/// Closed set of inputs the engine accepts through [`NotificationFeed::apply`].
#[derive(Debug, Clone)]
pub enum FeedMessage {
    /// A per-user notification from either transport.
    Notification(Notification),
    /// A system-wide alert.
    SystemNotification(SystemNotification),
    /// Local optimistic read of a single entry.
    MarkRead(NotificationId),
    /// Local optimistic read of every cached entry.
    MarkAllRead,
    /// Drop everything.
    Clear,
}

/// What a single merge did to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// New id added to the collection.
    Inserted,
    /// New id, but older than everything kept; evicted immediately.
    Evicted,
    /// Existing unread entry replaced by a read copy.
    ReadAdvanced,
    /// Existing entry kept as-is.
    Duplicate,
}

/// Result of applying a [`FeedMessage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedChange {
    Merged(MergeOutcome),
    SystemAlert { added: bool },
    /// Ids whose read flag flipped to true by a local action.
    MarkedRead(Vec<NotificationId>),
    Cleared,
}

impl FeedChange {
    /// True when the message left the collection untouched.
    pub fn is_noop(&self) -> bool {
        match self {
            FeedChange::Merged(outcome) => {
                matches!(outcome, MergeOutcome::Duplicate | MergeOutcome::Evicted)
            }
            FeedChange::SystemAlert { added } => !added,
            FeedChange::MarkedRead(ids) => ids.is_empty(),
            FeedChange::Cleared => false,
        }
    }
}

/// Pure merge of one incoming notification into a collection.
///
/// Returns the new collection, sorted and truncated to `capacity`.
pub fn reconcile(
    mut entries: Vec<Notification>,
    incoming: Notification,
    capacity: usize,
) -> (Vec<Notification>, MergeOutcome) {
    let capacity = capacity.max(1);
    let incoming_id = incoming.id.clone();

    let mut outcome = match entries.iter().position(|e| e.id == incoming.id) {
        Some(pos) if incoming.read && !entries[pos].read => {
            entries[pos] = incoming;
            MergeOutcome::ReadAdvanced
        }
        Some(_) => MergeOutcome::Duplicate,
        None => {
            entries.push(incoming);
            MergeOutcome::Inserted
        }
    };

    entries.sort_by(|a, b| {
        b.occurred_at
            .cmp(&a.occurred_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    entries.truncate(capacity);

    if outcome == MergeOutcome::Inserted && !entries.iter().any(|e| e.id == incoming_id) {
        outcome = MergeOutcome::Evicted;
    }

    (entries, outcome)
}

/// In-memory notification cache with monotonic read-state.
#[derive(Debug, Clone)]
pub struct NotificationFeed {
    entries: Vec<Notification>,
    alerts: VecDeque<SystemNotification>,
    capacity: usize,
    unread_count: usize,
}

impl NotificationFeed {
    /// Creates an empty feed keeping at most `capacity` notifications.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            alerts: VecDeque::new(),
            capacity: capacity.max(1),
            unread_count: 0,
        }
    }

    /// Single intake for every transport and local action.
    pub fn apply(&mut self, message: FeedMessage) -> FeedChange {
        match message {
            FeedMessage::Notification(notification) => FeedChange::Merged(self.merge(notification)),
            FeedMessage::SystemNotification(alert) => FeedChange::SystemAlert {
                added: self.push_alert(alert),
            },
            FeedMessage::MarkRead(id) => {
                let changed = if self.mark_read(&id) { vec![id] } else { Vec::new() };
                FeedChange::MarkedRead(changed)
            }
            FeedMessage::MarkAllRead => FeedChange::MarkedRead(self.mark_all_read()),
            FeedMessage::Clear => {
                self.clear();
                FeedChange::Cleared
            }
        }
    }

    /// Merges one notification. See the module docs for the rules.
    pub fn merge(&mut self, notification: Notification) -> MergeOutcome {
        let entries = std::mem::take(&mut self.entries);
        let (entries, outcome) = reconcile(entries, notification, self.capacity);
        self.entries = entries;
        self.recount();
        outcome
    }

    /// Marks one cached entry read. Returns true if its flag flipped.
    pub fn mark_read(&mut self, id: &NotificationId) -> bool {
        let flipped = match self.entries.iter_mut().find(|e| &e.id == id) {
            Some(entry) if !entry.read => {
                entry.read = true;
                true
            }
            _ => false,
        };
        if flipped {
            self.recount();
        }
        flipped
    }

    /// Marks every cached entry read in one pass. Returns the flipped ids.
    pub fn mark_all_read(&mut self) -> Vec<NotificationId> {
        let flipped: Vec<NotificationId> = self
            .entries
            .iter_mut()
            .filter(|e| !e.read)
            .map(|e| {
                e.read = true;
                e.id.clone()
            })
            .collect();
        self.recount();
        flipped
    }

    /// Empties the cache and the alert list.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.alerts.clear();
        self.unread_count = 0;
    }

    /// Appends a system alert unless one with the same id is already held.
    pub fn push_alert(&mut self, alert: SystemNotification) -> bool {
        if self.alerts.iter().any(|a| a.id == alert.id) {
            return false;
        }
        self.alerts.push_front(alert);
        self.alerts.truncate(self.capacity);
        true
    }

    /// Removes a system alert once it has been shown.
    pub fn dismiss_alert(&mut self, id: &NotificationId) -> bool {
        let before = self.alerts.len();
        self.alerts.retain(|a| &a.id != id);
        self.alerts.len() != before
    }

    pub fn entries(&self) -> &[Notification] {
        &self.entries
    }

    pub fn get(&self, id: &NotificationId) -> Option<&Notification> {
        self.entries.iter().find(|e| &e.id == id)
    }

    /// System alerts, newest first.
    pub fn alerts(&self) -> impl Iterator<Item = &SystemNotification> {
        self.alerts.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cached entries with `read == false`.
    pub fn unread_count(&self) -> usize {
        self.unread_count
    }

    fn recount(&mut self) {
        self.unread_count = self.entries.iter().filter(|e| !e.read).count();
    }
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Timestamp, UserId};
    use crate::domain::notification::{NotificationType, SystemLevel, TransportKind};

    fn notification(id: &str, at: i64) -> Notification {
        Notification::new(
            NotificationId::new(id).unwrap(),
            UserId::new("user-1").unwrap(),
            NotificationType::PostPublished,
            "Post published",
            "Your post is live",
        )
        .occurred_at(Timestamp::from_unix_secs(at))
    }

    fn id(s: &str) -> NotificationId {
        NotificationId::new(s).unwrap()
    }

    #[test]
    fn merging_same_notification_twice_keeps_one_entry() {
        let mut feed = NotificationFeed::default();

        assert_eq!(feed.merge(notification("n1", 100)), MergeOutcome::Inserted);
        assert_eq!(feed.merge(notification("n1", 100)), MergeOutcome::Duplicate);

        assert_eq!(feed.len(), 1);
        assert_eq!(feed.unread_count(), 1);
    }

    #[test]
    fn copies_from_both_transports_collapse() {
        let mut feed = NotificationFeed::default();

        feed.merge(notification("n1", 100).delivered_via(TransportKind::Fallback));
        feed.merge(notification("n1", 100).delivered_via(TransportKind::Primary));

        assert_eq!(feed.len(), 1);
        assert_eq!(feed.entries()[0].id.as_str(), "n1");
        assert_eq!(feed.entries()[0].source_channel, Some(TransportKind::Fallback));
    }

    #[test]
    fn read_copy_advances_unread_entry() {
        let mut feed = NotificationFeed::default();
        feed.merge(notification("n1", 100));

        let outcome = feed.merge(notification("n1", 100).mark_read());

        assert_eq!(outcome, MergeOutcome::ReadAdvanced);
        assert!(feed.get(&id("n1")).unwrap().read);
        assert_eq!(feed.unread_count(), 0);
    }

    #[test]
    fn unread_copy_never_reverts_read_entry() {
        let mut feed = NotificationFeed::default();
        feed.merge(notification("n1", 100));
        assert!(feed.mark_read(&id("n1")));

        assert_eq!(feed.merge(notification("n1", 100)), MergeOutcome::Duplicate);

        assert!(feed.get(&id("n1")).unwrap().read);
        assert_eq!(feed.unread_count(), 0);
    }

    #[test]
    fn entries_are_ordered_newest_first() {
        let mut feed = NotificationFeed::default();
        feed.merge(notification("old", 100));
        feed.merge(notification("new", 300));
        feed.merge(notification("mid", 200));

        let ids: Vec<&str> = feed.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn cap_evicts_oldest_even_when_unread() {
        let mut feed = NotificationFeed::new(3);
        feed.merge(notification("a", 100));
        feed.merge(notification("b", 200).mark_read());
        feed.merge(notification("c", 300).mark_read());
        feed.merge(notification("d", 400).mark_read());

        assert_eq!(feed.len(), 3);
        assert!(feed.get(&id("a")).is_none());
        assert_eq!(feed.unread_count(), 0);
    }

    #[test]
    fn notification_older_than_full_cache_is_evicted_immediately() {
        let mut feed = NotificationFeed::new(2);
        feed.merge(notification("b", 200));
        feed.merge(notification("c", 300));

        assert_eq!(feed.merge(notification("a", 100)), MergeOutcome::Evicted);
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn cache_never_exceeds_capacity() {
        let mut feed = NotificationFeed::new(DEFAULT_FEED_CAPACITY);
        for i in 0..120 {
            feed.merge(notification(&format!("n{}", i), i));
            assert!(feed.len() <= DEFAULT_FEED_CAPACITY);
        }
        assert_eq!(feed.len(), DEFAULT_FEED_CAPACITY);
        assert_eq!(feed.entries().last().unwrap().id.as_str(), "n70");
    }

    #[test]
    fn mark_all_read_returns_only_flipped_ids() {
        let mut feed = NotificationFeed::default();
        feed.merge(notification("n1", 100));
        feed.merge(notification("n2", 200).mark_read());
        feed.merge(notification("n3", 300));

        let mut flipped = feed.mark_all_read();
        flipped.sort();

        assert_eq!(flipped, vec![id("n1"), id("n3")]);
        assert_eq!(feed.unread_count(), 0);
        assert!(feed.mark_all_read().is_empty());
    }

    #[test]
    fn mark_read_of_unknown_id_is_noop() {
        let mut feed = NotificationFeed::default();
        let change = feed.apply(FeedMessage::MarkRead(id("missing")));
        assert!(change.is_noop());
    }

    #[test]
    fn clear_resets_everything() {
        let mut feed = NotificationFeed::default();
        feed.merge(notification("n1", 100));
        feed.push_alert(SystemNotification::new("Down", "Maintenance", SystemLevel::Warning));

        assert_eq!(feed.apply(FeedMessage::Clear), FeedChange::Cleared);

        assert!(feed.is_empty());
        assert_eq!(feed.unread_count(), 0);
        assert_eq!(feed.alerts().count(), 0);
    }

    #[test]
    fn system_alerts_stay_out_of_unread_count() {
        let mut feed = NotificationFeed::default();
        let alert = SystemNotification::new("Down", "Maintenance", SystemLevel::Critical);

        assert_eq!(
            feed.apply(FeedMessage::SystemNotification(alert.clone())),
            FeedChange::SystemAlert { added: true }
        );
        assert_eq!(
            feed.apply(FeedMessage::SystemNotification(alert.clone())),
            FeedChange::SystemAlert { added: false }
        );

        assert_eq!(feed.alerts().count(), 1);
        assert_eq!(feed.unread_count(), 0);
        assert!(feed.dismiss_alert(&alert.id));
        assert_eq!(feed.alerts().count(), 0);
    }

    #[test]
    fn dual_delivery_then_mark_all_then_late_duplicate() {
        let mut feed = NotificationFeed::default();

        feed.apply(FeedMessage::Notification(
            notification("a1", 100).delivered_via(TransportKind::Primary),
        ));
        feed.apply(FeedMessage::Notification(
            notification("a1", 100).delivered_via(TransportKind::Fallback),
        ));
        assert_eq!(feed.len(), 1);
        assert_eq!(feed.unread_count(), 1);

        feed.apply(FeedMessage::MarkAllRead);
        assert_eq!(feed.unread_count(), 0);
        assert!(feed.get(&id("a1")).unwrap().read);

        feed.apply(FeedMessage::Notification(notification("a1", 100)));
        assert!(feed.get(&id("a1")).unwrap().read);
        assert_eq!(feed.unread_count(), 0);
    }

    #[test]
    fn reconcile_is_pure() {
        let (entries, outcome) = reconcile(Vec::new(), notification("n1", 1), 10);
        assert_eq!(outcome, MergeOutcome::Inserted);

        let (again, outcome) = reconcile(entries.clone(), notification("n1", 1), 10);
        assert_eq!(outcome, MergeOutcome::Duplicate);
        assert_eq!(again, entries);
    }
}
