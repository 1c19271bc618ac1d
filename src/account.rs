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

//! Account management.
//!
//! An [`Account`] owns its balance, reward points and full transaction
//! history behind one mutex, so a balance can never be observed apart from
//! the records that justify it. All mutation goes through the engine's unit
//! of work; the public surface here is read-only.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use settle_rs::{Account, AccountId, AccountProfile};
//!
//! let account = Account::new(AccountId(1), AccountProfile::new("Asha", "9000000001", "ACC0001"));
//! assert_eq!(account.balance(), dec!(0));
//! ```

use crate::base::{AccountId, TransactionId};
use crate::transaction::{Transaction, TransactionStatus};
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde::Deserialize;
use std::collections::HashMap;

/// Registration details supplied by the external sign-up flow.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub display_name: String,
    pub mobile: String,
    pub account_number: String,
    #[serde(default)]
    pub referred_by: Option<AccountId>,
}

impl AccountProfile {
    pub fn new(
        display_name: impl Into<String>,
        mobile: impl Into<String>,
        account_number: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            mobile: mobile.into(),
            account_number: account_number.into(),
            referred_by: None,
        }
    }

    pub fn referred_by(mut self, referrer: AccountId) -> Self {
        self.referred_by = Some(referrer);
        self
    }
}

#[derive(Debug)]
pub(crate) struct AccountData {
    pub(crate) profile: AccountProfile,
    pub(crate) balance: Decimal,
    pub(crate) points: u64,
    /// Count of records currently in `Success`.
    pub(crate) success_count: usize,
    history: Vec<Transaction>,
    /// Position of each record in `history`, for approvals.
    positions: HashMap<TransactionId, usize>,
}

impl AccountData {
    fn new(profile: AccountProfile) -> Self {
        Self {
            profile,
            balance: Decimal::ZERO,
            points: 0,
            success_count: 0,
            history: Vec::new(),
            positions: HashMap::new(),
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.balance >= Decimal::ZERO,
            "Invariant violated: balance went negative: {}",
            self.balance
        );
    }

    pub(crate) fn transaction(&self, id: TransactionId) -> Option<&Transaction> {
        self.positions.get(&id).map(|&i| &self.history[i])
    }

    pub(crate) fn adjust_balance(&mut self, delta: Decimal) {
        self.balance += delta;
        self.assert_invariants();
    }

    pub(crate) fn append(&mut self, transaction: Transaction) {
        if transaction.status == TransactionStatus::Success {
            self.success_count += 1;
        }
        self.positions.insert(transaction.id, self.history.len());
        self.history.push(transaction);
    }

    /// Moves a pending record to its final status.
    ///
    /// Callers check the current status first; a non-pending record is left alone.
    pub(crate) fn finalize(
        &mut self,
        id: TransactionId,
        status: TransactionStatus,
        reason: Option<String>,
    ) {
        let Some(&index) = self.positions.get(&id) else {
            return;
        };
        let record = &mut self.history[index];
        if !record.is_pending() {
            return;
        }
        record.status = status;
        record.rejection_reason = reason;
        if status == TransactionStatus::Success {
            self.success_count += 1;
        }
    }
}

/// Ledger account.
#[derive(Debug)]
pub struct Account {
    id: AccountId,
    inner: Mutex<AccountData>,
}

impl Account {
    const DECIMAL_PRECISION: u32 = 2;

    pub fn new(id: AccountId, profile: AccountProfile) -> Self {
        Self {
            id,
            inner: Mutex::new(AccountData::new(profile)),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn balance(&self) -> Decimal {
        self.inner.lock().balance
    }

    pub fn points(&self) -> u64 {
        self.inner.lock().points
    }

    pub fn profile(&self) -> AccountProfile {
        self.inner.lock().profile.clone()
    }

    pub fn success_count(&self) -> usize {
        self.inner.lock().success_count
    }

    /// Most recent records first.
    pub fn history(&self, limit: usize) -> Vec<Transaction> {
        self.inner.lock().history.iter().rev().take(limit).cloned().collect()
    }

    pub fn transaction_count(&self) -> usize {
        self.inner.lock().history.len()
    }

    pub fn transaction(&self, id: TransactionId) -> Option<Transaction> {
        self.inner.lock().transaction(id).cloned()
    }

    /// Balance recomputed from history: Σ success credits − Σ success debits.
    ///
    /// Always equal to [`Account::balance`]; exposed so callers can audit it.
    pub fn ledger_balance(&self) -> Decimal {
        self.inner
            .lock()
            .history
            .iter()
            .map(Transaction::signed_amount)
            .sum()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, AccountData> {
        self.inner.lock()
    }
}

impl Serialize for Account {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = self.inner.lock();
        let mut state = serializer.serialize_struct("Account", 5)?;
        state.serialize_field("account", &self.id)?;
        state.serialize_field("name", &data.profile.display_name)?;
        state.serialize_field("number", &data.profile.account_number)?;
        state.serialize_field(
            "balance",
            &data.balance.round_dp(Account::DECIMAL_PRECISION),
        )?;
        state.serialize_field("points", &data.points)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Direction;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn profile() -> AccountProfile {
        AccountProfile::new("Asha", "9000000001", "ACC0001")
    }

    fn record(id: u64, direction: Direction, amount: Decimal, status: TransactionStatus) -> Transaction {
        Transaction {
            id: TransactionId(id),
            account: AccountId(1),
            direction,
            counterparty: "Bank transfer".into(),
            amount,
            status,
            rejection_reason: None,
            remark: None,
            created_at: Utc::now(),
        }
    }

    // === AccountData Internal Tests ===

    #[test]
    fn append_counts_only_success_records() {
        let mut data = AccountData::new(profile());
        data.append(record(1, Direction::Credit, dec!(10), TransactionStatus::Success));
        data.append(record(2, Direction::Credit, dec!(10), TransactionStatus::Pending));
        data.append(record(3, Direction::Credit, dec!(10), TransactionStatus::Failed));
        assert_eq!(data.success_count, 1);
        assert_eq!(data.history.len(), 3);
    }

    #[test]
    fn finalize_moves_pending_once() {
        let mut data = AccountData::new(profile());
        data.append(record(1, Direction::Credit, dec!(10), TransactionStatus::Pending));

        data.finalize(TransactionId(1), TransactionStatus::Failed, Some("blurry proof".into()));
        let tx = data.transaction(TransactionId(1)).unwrap();
        assert_eq!(tx.status, TransactionStatus::Failed);
        assert_eq!(tx.rejection_reason.as_deref(), Some("blurry proof"));

        // Terminal: a second finalize is ignored
        data.finalize(TransactionId(1), TransactionStatus::Success, None);
        assert_eq!(data.transaction(TransactionId(1)).unwrap().status, TransactionStatus::Failed);
        assert_eq!(data.success_count, 0);
    }

    #[test]
    fn finalize_unknown_id_is_ignored() {
        let mut data = AccountData::new(profile());
        data.finalize(TransactionId(99), TransactionStatus::Success, None);
        assert_eq!(data.success_count, 0);
    }

    #[test]
    fn ledger_balance_follows_history() {
        let account = Account::new(AccountId(1), profile());
        {
            let mut data = account.lock();
            data.append(record(1, Direction::Credit, dec!(100), TransactionStatus::Success));
            data.adjust_balance(dec!(100));
            data.append(record(2, Direction::Debit, dec!(40), TransactionStatus::Success));
            data.adjust_balance(dec!(-40));
            data.append(record(3, Direction::Credit, dec!(500), TransactionStatus::Pending));
        }
        assert_eq!(account.balance(), dec!(60));
        assert_eq!(account.ledger_balance(), dec!(60));
    }

    #[test]
    fn history_is_newest_first() {
        let account = Account::new(AccountId(1), profile());
        {
            let mut data = account.lock();
            for id in 1..=3 {
                data.append(record(id, Direction::Credit, dec!(1), TransactionStatus::Pending));
            }
        }
        let ids: Vec<_> = account.history(2).iter().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    // === Serialization Tests ===

    #[test]
    fn serializer_rounds_to_two_decimal_places() {
        let account = Account::new(AccountId(42), profile());
        {
            let mut data = account.lock();
            data.balance = dec!(123.456);
            data.points = 17;
        }

        let parsed: serde_json::Value = serde_json::to_value(&account).unwrap();
        assert_eq!(parsed["account"], 42);
        assert_eq!(parsed["name"], "Asha");
        assert_eq!(parsed["number"], "ACC0001");
        assert_eq!(parsed["balance"].as_str().unwrap(), "123.46");
        assert_eq!(parsed["points"], 17);
    }

    #[test]
    fn serializer_precision_constant_is_two() {
        assert_eq!(Account::DECIMAL_PRECISION, 2);
    }
}
