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

//! Offline wallet records and journal entries.
//!
//! Journal entries follow a state machine:
//!
//! ```text
//!  created ──offline──► Pending ──sync──► Settled
//!     │                    │
//!     └──online──► Settled └──sync──► Failed
//! ```
//!
//! `Settled` and `Failed` are terminal.

use crate::base::EntryId;
use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::reconcile::{Submission, SubmissionKind};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Sent,
    Received,
    /// Bank → offline wallet
    Load,
    /// Offline wallet → bank
    Unload,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Settled,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: EntryId,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub amount: Decimal,
    pub counterparty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub status: EntryStatus,
    pub is_offline: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl JournalEntry {
    /// Entries made offline start `Pending`; online ones are settled on the spot.
    pub(crate) fn new(
        kind: EntryKind,
        amount: Decimal,
        counterparty: impl Into<String>,
        note: Option<String>,
        online: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: EntryId::generate(),
            kind,
            amount,
            counterparty: counterparty.into(),
            note,
            status: if online {
                EntryStatus::Settled
            } else {
                EntryStatus::Pending
            },
            is_offline: !online,
            created_at: now,
            settled_at: online.then_some(now),
            failure_reason: None,
        }
    }

    /// Online entry recorded before the ledger has answered.
    pub(crate) fn in_flight(kind: EntryKind, amount: Decimal, counterparty: impl Into<String>) -> Self {
        Self {
            is_offline: false,
            ..Self::new(kind, amount, counterparty, None, false)
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == EntryStatus::Pending
    }

    pub(crate) fn settle(&mut self, at: DateTime<Utc>) -> Result<(), WalletError> {
        if !self.is_pending() {
            return Err(WalletError::EntryFinalized(self.id));
        }
        self.status = EntryStatus::Settled;
        self.settled_at = Some(at);
        Ok(())
    }

    pub(crate) fn fail(&mut self, reason: impl Into<String>) -> Result<(), WalletError> {
        if !self.is_pending() {
            return Err(WalletError::EntryFinalized(self.id));
        }
        self.status = EntryStatus::Failed;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    /// Reconciliation form of a peer-to-peer entry; loads and unloads never queue.
    pub fn submission(&self) -> Option<Submission> {
        let kind = match self.kind {
            EntryKind::Sent => SubmissionKind::Sent,
            EntryKind::Received => SubmissionKind::Received,
            EntryKind::Load | EntryKind::Unload => return None,
        };
        Some(Submission {
            id: self.id,
            kind,
            amount: self.amount,
            counterparty: self.counterparty.clone(),
            created_at: self.created_at,
        })
    }

    pub(crate) fn counts_toward_daily_limit(&self, day: NaiveDate) -> bool {
        self.kind == EntryKind::Sent
            && self.status != EntryStatus::Failed
            && self.created_at.date_naive() == day
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    pub max_per_transaction: Decimal,
    pub daily_limit: Decimal,
}

/// The device's spendable balance.
///
/// `balance` is what can be spent now. `reserved` holds offline payments
/// already handed to a payee but not yet settled; a failed settlement
/// returns the reservation to `balance`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OfflineWallet {
    pub id: Uuid,
    pub balance: Decimal,
    #[serde(default)]
    pub reserved: Decimal,
    pub max_balance: Decimal,
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
    pub limits: Limits,
}

impl OfflineWallet {
    pub fn new(config: &WalletConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            balance: Decimal::ZERO,
            reserved: Decimal::ZERO,
            max_balance: config.max_balance,
            last_synced_at: None,
            limits: Limits {
                max_per_transaction: config.max_per_transaction,
                daily_limit: config.daily_limit,
            },
        }
    }

    pub(crate) fn reserve(&mut self, amount: Decimal) {
        self.balance -= amount;
        self.reserved += amount;
    }

    /// Drops a reservation whose payment settled.
    pub(crate) fn release(&mut self, amount: Decimal) {
        self.reserved = (self.reserved - amount).max(Decimal::ZERO);
    }

    /// Returns a reservation whose payment failed to the spendable balance.
    pub(crate) fn refund(&mut self, amount: Decimal) {
        let returned = amount.min(self.reserved);
        self.reserved -= returned;
        self.balance += returned;
    }
}

/// Snapshot of the signed-in user, as handed over by the login flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSnapshot {
    pub display_name: String,
    pub upi_id: String,
    pub account_number: String,
}

/// Last known bank balance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteBalance {
    pub balance: Decimal,
    #[serde(default)]
    pub fetched_at: Option<DateTime<Utc>>,
}
