//! Property tests for the reconciliation engine.
//!
//! Inputs model copies of producer events: each id has one fixed timestamp
//! and body, and copies differ only in their read flag.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use notification_relay::domain::foundation::{NotificationId, Timestamp, UserId};
use notification_relay::domain::notification::{
    reconcile, Notification, NotificationFeed, NotificationType,
};

const BASE_SECS: i64 = 1_700_000_000;

fn copy_of(id: u8, read: bool) -> Notification {
    // Timestamps collide for some ids so the id tiebreak is exercised.
    let at = Timestamp::from_unix_secs(BASE_SECS + i64::from(id / 2) * 60);
    let notification = Notification::new(
        NotificationId::new(format!("n{:03}", id)).unwrap(),
        UserId::new("u1").unwrap(),
        NotificationType::PostPublished,
        "Published",
        format!("Post {} is live", id),
    )
    .occurred_at(at);

    if read {
        notification.mark_read()
    } else {
        notification
    }
}

fn copies() -> impl Strategy<Value = Vec<(u8, bool)>> {
    prop::collection::vec((0u8..24, any::<bool>()), 0..60)
}

fn merge_all(copies: &[(u8, bool)], capacity: usize) -> Vec<Notification> {
    copies.iter().fold(Vec::new(), |entries, &(id, read)| {
        reconcile(entries, copy_of(id, read), capacity).0
    })
}

fn view(entries: &[Notification]) -> Vec<(String, bool)> {
    entries
        .iter()
        .map(|n| (n.id.as_str().to_string(), n.read))
        .collect()
}

proptest! {
    #[test]
    fn merging_twice_changes_nothing(seq in copies(), capacity in 1usize..30) {
        let once = merge_all(&seq, capacity);
        let doubled: Vec<_> = seq.iter().flat_map(|c| [*c, *c]).collect();

        prop_assert_eq!(view(&once), view(&merge_all(&doubled, capacity)));
    }

    #[test]
    fn arrival_order_does_not_matter(
        seq in copies(),
        capacity in 1usize..30,
        seed in any::<u64>(),
    ) {
        let mut shuffled = seq.clone();
        // Deterministic Fisher-Yates driven by the generated seed.
        let mut state = seed | 1;
        for i in (1..shuffled.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let j = (state % (i as u64 + 1)) as usize;
            shuffled.swap(i, j);
        }

        prop_assert_eq!(view(&merge_all(&seq, capacity)), view(&merge_all(&shuffled, capacity)));
    }

    #[test]
    fn read_flag_is_or_of_copies(seq in copies()) {
        let entries = merge_all(&seq, 64);

        let mut expected: BTreeMap<String, bool> = BTreeMap::new();
        for &(id, read) in &seq {
            *expected.entry(format!("n{:03}", id)).or_default() |= read;
        }

        let actual: BTreeMap<String, bool> = view(&entries).into_iter().collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn collection_is_bounded_sorted_and_unique(seq in copies(), capacity in 1usize..30) {
        let entries = merge_all(&seq, capacity);

        prop_assert!(entries.len() <= capacity);
        let ids: BTreeSet<_> = entries.iter().map(|n| n.id.clone()).collect();
        prop_assert_eq!(ids.len(), entries.len());
        for pair in entries.windows(2) {
            prop_assert!(
                pair[0].occurred_at > pair[1].occurred_at
                    || (pair[0].occurred_at == pair[1].occurred_at && pair[0].id < pair[1].id)
            );
        }
    }

    #[test]
    fn eviction_keeps_newest(seq in copies(), capacity in 1usize..30) {
        let entries = merge_all(&seq, capacity);

        let mut all: Vec<Notification> = merge_all(&seq, usize::MAX);
        all.truncate(capacity);

        let kept: Vec<_> = entries.iter().map(|n| n.id.clone()).collect();
        let newest: Vec<_> = all.iter().map(|n| n.id.clone()).collect();
        prop_assert_eq!(kept, newest);
    }

    #[test]
    fn read_state_never_regresses(seq in copies(), capacity in 1usize..30) {
        let mut feed = NotificationFeed::new(capacity);
        let mut seen_read: BTreeSet<NotificationId> = BTreeSet::new();

        for &(id, read) in &seq {
            feed.merge(copy_of(id, read));
            for entry in feed.entries() {
                if seen_read.contains(&entry.id) {
                    prop_assert!(entry.read, "{} went back to unread", entry.id.as_str());
                }
                if entry.read {
                    seen_read.insert(entry.id.clone());
                }
            }
        }
    }

    #[test]
    fn unread_count_matches_entries(
        seq in copies(),
        reads in prop::collection::vec(0u8..24, 0..10),
        capacity in 1usize..30,
    ) {
        let mut feed = NotificationFeed::new(capacity);
        for &(id, read) in &seq {
            feed.merge(copy_of(id, read));
        }
        for id in reads {
            feed.mark_read(&NotificationId::new(format!("n{:03}", id)).unwrap());
        }

        let counted = feed.entries().iter().filter(|n| !n.read).count();
        prop_assert_eq!(feed.unread_count(), counted);

        let newly_read = feed.mark_all_read();
        prop_assert_eq!(newly_read.len(), counted);
        prop_assert_eq!(feed.unread_count(), 0);
    }
}
