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

//! Reconciliation of pending journal entries.
//!
//! A sync cycle is two steps. [`SyncBatch`] snapshots the pending entries at
//! the start of the cycle; [`apply_outcomes`] folds the ledger's per-entry
//! answers back into the wallet and journal. Entries journaled after the
//! snapshot are left for the next cycle.

use crate::base::EntryId;
use crate::error::WalletError;
use crate::reconcile::{ReconcileOutcome, ReconcileStatus, Submission};
use crate::wallet::model::{EntryKind, JournalEntry, OfflineWallet};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::warn;

/// Pending entries captured at the start of a sync cycle.
#[derive(Debug, Clone)]
pub struct SyncBatch {
    pub entries: Vec<Submission>,
    pub started_at: DateTime<Utc>,
}

impl SyncBatch {
    pub(crate) fn snapshot(journal: &[JournalEntry]) -> Self {
        Self {
            entries: journal
                .iter()
                .filter(|entry| entry.is_pending())
                .filter_map(JournalEntry::submission)
                .collect(),
            started_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEntry {
    pub id: EntryId,
    pub reason: String,
}

/// Balance correction applied for one failed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compensation {
    pub entry: EntryId,
    pub kind: EntryKind,
    pub amount: Decimal,
    /// Part of `amount` actually moved.
    pub applied: Decimal,
    /// Part of a failed receipt that could not be taken back because the
    /// funds were already spent.
    pub shortfall: Decimal,
}

/// Per-entry result of one sync cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub submitted: usize,
    pub settled: Vec<EntryId>,
    pub failed: Vec<FailedEntry>,
    /// Submitted entries the ledger gave no answer for.
    pub still_pending: Vec<EntryId>,
    pub compensations: Vec<Compensation>,
    /// The cycle did not run (offline, or nothing to submit).
    pub skipped: bool,
}

impl SyncReport {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Applies ledger outcomes for `batch` to the wallet and journal.
///
/// Settled sends release their reservation. Failed sends return it to the
/// available balance. Failed receipts take the credited amount back from
/// the available balance, as far as it reaches.
pub(crate) fn apply_outcomes(
    wallet: &mut OfflineWallet,
    journal: &mut [JournalEntry],
    batch: &SyncBatch,
    outcomes: Vec<ReconcileOutcome>,
) -> Result<SyncReport, WalletError> {
    let mut answers: HashMap<EntryId, ReconcileOutcome> =
        outcomes.into_iter().map(|outcome| (outcome.id, outcome)).collect();
    let mut report = SyncReport {
        submitted: batch.len(),
        ..SyncReport::default()
    };

    for submission in &batch.entries {
        let Some(outcome) = answers.remove(&submission.id) else {
            report.still_pending.push(submission.id);
            continue;
        };
        let Some(entry) = journal.iter_mut().find(|entry| entry.id == submission.id) else {
            warn!(entry = %submission.id, "outcome for an entry missing from the journal");
            continue;
        };
        if !entry.is_pending() {
            continue;
        }

        match outcome.status {
            ReconcileStatus::Settled => {
                entry.settle(outcome.settled_at.unwrap_or_else(Utc::now))?;
                if entry.kind == EntryKind::Sent {
                    wallet.release(entry.amount);
                }
                report.settled.push(entry.id);
            }
            ReconcileStatus::Failed => {
                let reason = outcome
                    .reason
                    .unwrap_or_else(|| "rejected by ledger".to_string());
                entry.fail(reason.clone())?;
                if let Some(compensation) = compensate(wallet, entry) {
                    report.compensations.push(compensation);
                }
                report.failed.push(FailedEntry {
                    id: entry.id,
                    reason,
                });
            }
        }
    }

    for id in answers.keys() {
        warn!(entry = %id, "outcome for an entry outside the sync batch ignored");
    }

    wallet.last_synced_at = Some(batch.started_at);
    Ok(report)
}

fn compensate(wallet: &mut OfflineWallet, entry: &JournalEntry) -> Option<Compensation> {
    let applied = match entry.kind {
        EntryKind::Sent => {
            let before = wallet.balance;
            wallet.refund(entry.amount);
            wallet.balance - before
        }
        EntryKind::Received => {
            let taken = entry.amount.min(wallet.balance);
            wallet.balance -= taken;
            taken
        }
        EntryKind::Load | EntryKind::Unload => return None,
    };
    Some(Compensation {
        entry: entry.id,
        kind: entry.kind,
        amount: entry.amount,
        applied,
        shortfall: entry.amount - applied,
    })
}
