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

//! All-or-nothing unit of work over a set of locked accounts.
//!
//! ```text
//!  begin ──► lock accounts (ascending id) ──► stage mutations ──► commit
//!                                                   │                │
//!                                                   └── drop ◄── error (nothing applied)
//! ```
//!
//! Reads through the unit of work see staged mutations, so a balance check
//! and the decrement it guards happen under the same locks. Commit hands the
//! notifications to the sink first; only when the sink accepts them are the
//! staged mutations applied, and applying cannot fail.

use crate::account::{Account, AccountData};
use crate::base::{AccountId, TransactionId};
use crate::error::LedgerError;
use crate::notification::{Notification, NotificationSink};
use crate::reward::{Reward, RewardPolicy};
use crate::transaction::{Direction, Transaction, TransactionStatus};
use chrono::Utc;
use parking_lot::MutexGuard;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counterparty label of reward credits.
pub const CASHBACK_LABEL: &str = "Cashback reward";

#[derive(Debug)]
enum Staged {
    Balance {
        account: AccountId,
        delta: Decimal,
    },
    Points {
        account: AccountId,
        points: u64,
    },
    Record(Transaction),
    Finalize {
        account: AccountId,
        id: TransactionId,
        status: TransactionStatus,
        reason: Option<String>,
    },
}

pub(crate) struct UnitOfWork<'a> {
    locked: Vec<(AccountId, MutexGuard<'a, AccountData>)>,
    staged: Vec<Staged>,
    notifications: Vec<Notification>,
    sequence: &'a AtomicU64,
}

impl<'a> UnitOfWork<'a> {
    /// Locks every given account, lowest id first, so that two units of work
    /// over overlapping accounts always acquire them in the same order.
    pub(crate) fn begin(accounts: &'a [Arc<Account>], sequence: &'a AtomicU64) -> Self {
        let mut ordered: Vec<&'a Arc<Account>> = accounts.iter().collect();
        ordered.sort_by_key(|account| account.id());
        ordered.dedup_by_key(|account| account.id());

        let locked = ordered
            .into_iter()
            .map(|account| (account.id(), account.lock()))
            .collect();

        Self {
            locked,
            staged: Vec::new(),
            notifications: Vec::new(),
            sequence,
        }
    }

    fn data(&self, account: AccountId) -> Result<&AccountData, LedgerError> {
        self.locked
            .iter()
            .find(|(id, _)| *id == account)
            .map(|(_, guard)| &**guard)
            .ok_or(LedgerError::AccountNotFound)
    }

    /// Balance including staged deltas.
    pub(crate) fn balance(&self, account: AccountId) -> Result<Decimal, LedgerError> {
        let committed = self.data(account)?.balance;
        let staged: Decimal = self
            .staged
            .iter()
            .filter_map(|op| match op {
                Staged::Balance { account: a, delta } if *a == account => Some(*delta),
                _ => None,
            })
            .sum();
        Ok(committed + staged)
    }

    /// `Success` record count including staged records and approvals.
    pub(crate) fn success_count(&self, account: AccountId) -> Result<usize, LedgerError> {
        let committed = self.data(account)?.success_count;
        let staged = self
            .staged
            .iter()
            .filter(|op| match op {
                Staged::Record(tx) => tx.account == account && tx.status == TransactionStatus::Success,
                Staged::Finalize {
                    account: a, status, ..
                } => *a == account && *status == TransactionStatus::Success,
                _ => false,
            })
            .count();
        Ok(committed + staged)
    }

    pub(crate) fn display_name(&self, account: AccountId) -> Result<String, LedgerError> {
        Ok(self.data(account)?.profile.display_name.clone())
    }

    pub(crate) fn transaction(
        &self,
        account: AccountId,
        id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        self.data(account)?
            .transaction(id)
            .cloned()
            .ok_or(LedgerError::TransactionNotFound)
    }

    pub(crate) fn adjust_balance(
        &mut self,
        account: AccountId,
        delta: Decimal,
    ) -> Result<(), LedgerError> {
        self.data(account)?;
        self.staged.push(Staged::Balance { account, delta });
        Ok(())
    }

    /// Stages a new record and returns it as it will be committed.
    pub(crate) fn record(
        &mut self,
        account: AccountId,
        direction: Direction,
        amount: Decimal,
        counterparty: impl Into<String>,
        status: TransactionStatus,
        remark: Option<String>,
    ) -> Result<Transaction, LedgerError> {
        self.data(account)?;
        let transaction = Transaction {
            id: TransactionId(self.sequence.fetch_add(1, Ordering::Relaxed)),
            account,
            direction,
            counterparty: counterparty.into(),
            amount,
            status,
            rejection_reason: None,
            remark,
            created_at: Utc::now(),
        };
        self.staged.push(Staged::Record(transaction.clone()));
        Ok(transaction)
    }

    pub(crate) fn finalize(
        &mut self,
        account: AccountId,
        id: TransactionId,
        status: TransactionStatus,
        reason: Option<String>,
    ) -> Result<(), LedgerError> {
        self.data(account)?;
        self.staged.push(Staged::Finalize {
            account,
            id,
            status,
            reason,
        });
        Ok(())
    }

    pub(crate) fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    /// Evaluates rewards for an account that just gained a `Success` record.
    ///
    /// Must run after that record is staged: the policy sees the count with
    /// it included. Cashback is staged as its own `Success` credit.
    pub(crate) fn reward(
        &mut self,
        account: AccountId,
        policy: &dyn RewardPolicy,
    ) -> Result<Reward, LedgerError> {
        let count = self.success_count(account)?;
        let reward = policy.evaluate(count);

        if reward.points > 0 {
            self.staged.push(Staged::Points {
                account,
                points: reward.points,
            });
        }

        match reward.cashback {
            Some(cashback) if cashback > Decimal::ZERO => {
                self.adjust_balance(account, cashback)?;
                self.record(
                    account,
                    Direction::Credit,
                    cashback,
                    CASHBACK_LABEL,
                    TransactionStatus::Success,
                    Some(format!("Reward for transaction #{count}")),
                )?;
                self.notify(Notification::new(
                    account,
                    format!("You earned {cashback} cashback on your transaction #{count}"),
                ));
                Ok(reward)
            }
            _ => Ok(Reward {
                points: reward.points,
                cashback: None,
            }),
        }
    }

    /// Publishes notifications, then applies every staged mutation.
    ///
    /// Returns the ids of the new records with their owning accounts, for
    /// the engine's lookup index.
    pub(crate) fn commit(
        mut self,
        sink: &dyn NotificationSink,
    ) -> Result<Vec<(TransactionId, AccountId)>, LedgerError> {
        sink.deliver(&self.notifications)?;

        let mut created = Vec::new();
        for op in std::mem::take(&mut self.staged) {
            match op {
                Staged::Balance { account, delta } => {
                    if let Some(data) = self.data_mut(account) {
                        data.adjust_balance(delta);
                    }
                }
                Staged::Points { account, points } => {
                    if let Some(data) = self.data_mut(account) {
                        data.points += points;
                    }
                }
                Staged::Record(transaction) => {
                    let (id, account) = (transaction.id, transaction.account);
                    if let Some(data) = self.data_mut(account) {
                        data.append(transaction);
                        created.push((id, account));
                    }
                }
                Staged::Finalize {
                    account,
                    id,
                    status,
                    reason,
                } => {
                    if let Some(data) = self.data_mut(account) {
                        data.finalize(id, status, reason);
                    }
                }
            }
        }
        Ok(created)
    }

    // Staging already checked membership, so this always finds the account.
    fn data_mut(&mut self, account: AccountId) -> Option<&mut AccountData> {
        self.locked
            .iter_mut()
            .find(|(id, _)| *id == account)
            .map(|(_, guard)| &mut **guard)
    }
}
