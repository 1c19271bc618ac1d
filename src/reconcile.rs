// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Thread-safe settlement register for offline journal entries.
//!
//! Each submitted entry is keyed by `(account, entry id)`. The first
//! submission decides the outcome; any later submission of the same key gets
//! that stored outcome back and registers nothing new.

use crate::base::{AccountId, EntryId};
use chrono::{DateTime, Utc};
use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionKind {
    Sent,
    Received,
}

/// One offline journal entry presented for settlement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: EntryId,
    #[serde(rename = "type")]
    pub kind: SubmissionKind,
    pub amount: Decimal,
    pub counterparty: String,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    fn same_contents(&self, other: &Submission) -> bool {
        self.kind == other.kind
            && self.amount == other.amount
            && self.counterparty == other.counterparty
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileStatus {
    Settled,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub id: EntryId,
    pub status: ReconcileStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<DateTime<Utc>>,
}

impl ReconcileOutcome {
    fn settled(id: EntryId) -> Self {
        Self {
            id,
            status: ReconcileStatus::Settled,
            reason: None,
            settled_at: Some(Utc::now()),
        }
    }

    fn failed(id: EntryId, reason: &str) -> Self {
        Self {
            id,
            status: ReconcileStatus::Failed,
            reason: Some(reason.to_string()),
            settled_at: None,
        }
    }
}

#[derive(Debug)]
struct Registered {
    submission: Submission,
    outcome: ReconcileOutcome,
}

/// Register of reconciled offline entries.
///
/// Combines a [`DashMap`] for atomic check-and-insert per key with a
/// [`SegQueue`] preserving registration order.
#[derive(Debug, Default)]
pub struct SettlementRegister {
    entries: DashMap<(AccountId, EntryId), Registered>,
    order: SegQueue<(AccountId, EntryId)>,
}

impl SettlementRegister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settles or fails one submission, or replays the stored outcome.
    pub fn submit(&self, account: AccountId, submission: Submission) -> ReconcileOutcome {
        let key = (account, submission.id);
        match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                let registered = entry.get();
                if registered.submission.same_contents(&submission) {
                    registered.outcome.clone()
                } else {
                    ReconcileOutcome::failed(submission.id, "entry id reused with different contents")
                }
            }
            Entry::Vacant(entry) => {
                let outcome = match Self::validate(&submission) {
                    Ok(()) => ReconcileOutcome::settled(submission.id),
                    Err(reason) => ReconcileOutcome::failed(submission.id, reason),
                };
                entry.insert(Registered {
                    submission,
                    outcome: outcome.clone(),
                });
                self.order.push(key);
                outcome
            }
        }
    }

    fn validate(submission: &Submission) -> Result<(), &'static str> {
        if submission.amount <= Decimal::ZERO {
            return Err("invalid amount (must be positive)");
        }
        if submission.counterparty.trim().is_empty() {
            return Err("missing counterparty");
        }
        Ok(())
    }

    /// Number of distinct entries ever registered, across all accounts.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of settled entries registered for one account.
    pub fn settled_count(&self, account: AccountId) -> usize {
        self.entries
            .iter()
            .filter(|entry| {
                entry.key().0 == account && entry.value().outcome.status == ReconcileStatus::Settled
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sent(amount: Decimal) -> Submission {
        Submission {
            id: EntryId::generate(),
            kind: SubmissionKind::Sent,
            amount,
            counterparty: "Chai stall".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn first_submission_settles() {
        let register = SettlementRegister::new();
        let outcome = register.submit(AccountId(1), sent(dec!(30)));
        assert_eq!(outcome.status, ReconcileStatus::Settled);
        assert!(outcome.settled_at.is_some());
        assert_eq!(register.settled_count(AccountId(1)), 1);
    }

    #[test]
    fn resubmission_replays_outcome() {
        let register = SettlementRegister::new();
        let submission = sent(dec!(30));
        let first = register.submit(AccountId(1), submission.clone());
        let second = register.submit(AccountId(1), submission);
        assert_eq!(first, second);
        assert_eq!(register.len(), 1);
    }

    #[test]
    fn reused_id_with_other_contents_fails_without_registering() {
        let register = SettlementRegister::new();
        let submission = sent(dec!(30));
        register.submit(AccountId(1), submission.clone());

        let tampered = Submission {
            amount: dec!(3000),
            ..submission
        };
        let outcome = register.submit(AccountId(1), tampered);
        assert_eq!(outcome.status, ReconcileStatus::Failed);
        assert_eq!(register.len(), 1);
    }

    #[test]
    fn invalid_submissions_fail_and_stay_failed() {
        let register = SettlementRegister::new();
        let zero = sent(dec!(0));
        assert_eq!(register.submit(AccountId(1), zero.clone()).status, ReconcileStatus::Failed);
        assert_eq!(register.submit(AccountId(1), zero).status, ReconcileStatus::Failed);

        let nameless = Submission {
            counterparty: "  ".into(),
            ..sent(dec!(5))
        };
        let outcome = register.submit(AccountId(1), nameless);
        assert_eq!(outcome.reason.as_deref(), Some("missing counterparty"));
        assert_eq!(register.settled_count(AccountId(1)), 0);
    }

    #[test]
    fn keys_are_scoped_per_account() {
        let register = SettlementRegister::new();
        let submission = sent(dec!(30));
        register.submit(AccountId(1), submission.clone());
        register.submit(AccountId(2), submission);
        assert_eq!(register.len(), 2);
    }
}
