//! Expiry reminders for active collaborations.
//!
//! A scan looks at every active collaboration with an end date and emits an
//! `expiring` notification when the days remaining hit one of
//! [`EXPIRY_THRESHOLDS`]. The [`DeadlineLedger`] remembers the last threshold
//! notified per collaboration so repeated scans on the same day stay quiet.
//!
//! # Example
//!
//! ```
//! use sponsorlink_core::deadline::{DeadlineLedger, scan};
//! use chrono::NaiveDate;
//!
//! let mut ledger = DeadlineLedger::default();
//! let today = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap_or_default();
//! assert!(scan(&[], today, &mut ledger).is_empty());
//! assert!(ledger.is_empty());
//! ```

use crate::ids::{CollaborationId, UserId};
use crate::notification::Notification;
use crate::types::{CollaborationPhase, CollaborationRequest};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Days-before-end at which a reminder fires, largest first.
pub const EXPIRY_THRESHOLDS: [i64; 4] = [30, 7, 3, 1];

/// Last reminder sent for one collaboration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// End date the threshold was computed against
    pub end_date: NaiveDate,
    /// Threshold that was notified
    pub threshold: i64,
}

/// Last-notified threshold per collaboration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeadlineLedger {
    entries: BTreeMap<CollaborationId, LedgerEntry>,
}

impl DeadlineLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `id`, if a reminder was sent.
    #[must_use]
    pub fn get(&self, id: &CollaborationId) -> Option<&LedgerEntry> {
        self.entries.get(id)
    }

    /// Record that `threshold` was notified for `id`.
    pub fn record(&mut self, id: CollaborationId, entry: LedgerEntry) {
        self.entries.insert(id, entry);
    }

    /// Number of tracked collaborations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&CollaborationId, &LedgerEntry)> {
        self.entries.iter()
    }

    /// Whether a reminder for `threshold` against `end_date` is still owed.
    fn is_due(&self, id: &CollaborationId, end_date: NaiveDate, threshold: i64) -> bool {
        match self.entries.get(id) {
            None => true,
            Some(entry) if entry.end_date != end_date => true,
            Some(entry) => entry.threshold > threshold,
        }
    }
}

impl FromIterator<(CollaborationId, LedgerEntry)> for DeadlineLedger {
    fn from_iter<I: IntoIterator<Item = (CollaborationId, LedgerEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Whole calendar days from `today` until `end_date` (negative once past).
#[must_use]
pub fn days_remaining(end_date: NaiveDate, today: NaiveDate) -> i64 {
    (end_date - today).num_days()
}

/// Who should act on an expiring collaboration.
///
/// The post owner for an accepted collaboration; the party whose review is
/// awaited for one pending review. Other statuses have no responsible party.
#[must_use]
pub const fn responsible_party(record: &CollaborationRequest) -> Option<&UserId> {
    match &record.phase {
        CollaborationPhase::Accepted { .. } => Some(&record.receiver_id),
        CollaborationPhase::PendingReview { awaiting, .. } => Some(awaiting),
        _ => None,
    }
}

/// Evaluate every record against `today`, updating `ledger` in place.
///
/// Returns one `expiring` notification per threshold newly reached. Ledger
/// entries for collaborations absent from `records` (no longer active or
/// without an end date) are dropped.
pub fn scan(
    records: &[CollaborationRequest],
    today: NaiveDate,
    ledger: &mut DeadlineLedger,
) -> Vec<Notification> {
    let mut notifications = Vec::new();
    let mut tracked: HashSet<&CollaborationId> = HashSet::new();

    for record in records {
        let (Some(end_date), Some(recipient)) = (record.end_date, responsible_party(record))
        else {
            continue;
        };
        tracked.insert(&record.id);

        let days = days_remaining(end_date, today);
        if !EXPIRY_THRESHOLDS.contains(&days) || !ledger.is_due(&record.id, end_date, days) {
            continue;
        }

        ledger.record(
            record.id.clone(),
            LedgerEntry {
                end_date,
                threshold: days,
            },
        );
        notifications.push(Notification::expiring(
            recipient.clone(),
            record.id.clone(),
            &record.post_title,
            days,
        ));
    }

    ledger.entries.retain(|id, _| tracked.contains(id));
    notifications
}
