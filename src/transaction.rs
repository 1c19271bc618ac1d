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

//! Ledger transaction records.
//!
//! A record is immutable once written except for one transition:
//! - [`Pending`] → [`Success`] or [`Failed`] (via approval)
//!
//! [`Pending`]: TransactionStatus::Pending
//! [`Success`]: TransactionStatus::Success
//! [`Failed`]: TransactionStatus::Failed

use crate::base::{AccountId, TransactionId};
use crate::reward::Reward;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which way the money moves for the owning account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Credit,
    Debit,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

/// One ledger record. `amount` is always positive; the sign comes from
/// `direction`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub account: AccountId,
    #[serde(rename = "type")]
    pub direction: Direction,
    /// Display label of the other side ("Bank transfer", a payee name, ...)
    pub counterparty: String,
    pub amount: Decimal,
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Contribution of this record to the account balance.
    pub fn signed_amount(&self) -> Decimal {
        match (self.status, self.direction) {
            (TransactionStatus::Success, Direction::Credit) => self.amount,
            (TransactionStatus::Success, Direction::Debit) => -self.amount,
            _ => Decimal::ZERO,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }
}

/// Outcome of a committed ledger operation, as seen by the initiating account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub transaction: Transaction,
    pub new_balance: Decimal,
    pub rewards: Reward,
}
