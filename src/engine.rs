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

//! Ledger engine.
//!
//! The [`Engine`] is the authoritative balance store. Every operation runs as
//! one unit of work: the accounts it touches are locked, the balance checks
//! read through the same locks, and all mutations (balances, records,
//! rewards, notifications) commit together or not at all.
//!
//! # Operations
//!
//! - **Credit**: Records a credit; only a `Success` credit moves the balance.
//! - **Debit**: Removes funds (fails if insufficient); never left pending.
//! - **Transfer**: Debits the sender and credits the receiver, one record per side.
//! - **Approve**: Moves a `Pending` credit to `Success` or `Failed`.
//! - **Reconcile**: Settles queued offline journal entries idempotently.
//!
//! # Thread Safety
//!
//! Accounts live in a [`DashMap`] as `Arc<Account>`; the map shard is never
//! held while an account mutex is taken. Accounts are locked in ascending id
//! order, so transfers in opposite directions cannot deadlock.

use crate::account::{Account, AccountProfile};
use crate::base::{AccountId, TransactionId};
use crate::config::LedgerConfig;
use crate::error::{ConfigError, LedgerError};
use crate::notification::{Notification, NotificationSink, Outbox};
use crate::reconcile::{ReconcileOutcome, ReconcileStatus, SettlementRegister, Submission};
use crate::reward::{IntervalRewardPolicy, Reward, RewardPolicy};
use crate::transaction::{Direction, Settlement, Transaction, TransactionStatus};
use crate::unit_of_work::UnitOfWork;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::{info, warn};

/// How a transfer names its receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientLookup {
    Mobile(String),
    AccountNumber(String),
}

/// Builder for an [`Engine`] with a custom reward policy or notification sink.
pub struct EngineBuilder {
    config: LedgerConfig,
    /// Policy derived from `config`, used unless one is set explicitly.
    configured_rewards: IntervalRewardPolicy,
    rewards: Option<Box<dyn RewardPolicy>>,
    notifications: Option<Arc<dyn NotificationSink>>,
}

impl EngineBuilder {
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] when the reward ranges cannot be sampled.
    pub fn config(mut self, config: LedgerConfig) -> Result<Self, ConfigError> {
        self.configured_rewards = IntervalRewardPolicy::from_config(&config)?;
        self.config = config;
        Ok(self)
    }

    pub fn reward_policy(mut self, policy: impl RewardPolicy + 'static) -> Self {
        self.rewards = Some(Box::new(policy));
        self
    }

    pub fn notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notifications = Some(sink);
        self
    }

    pub fn build(self) -> Engine {
        let rewards = self
            .rewards
            .unwrap_or_else(|| Box::new(self.configured_rewards));
        let notifications = self
            .notifications
            .unwrap_or_else(|| Arc::new(Outbox::new()));

        Engine {
            accounts: DashMap::new(),
            by_mobile: DashMap::new(),
            by_number: DashMap::new(),
            index: DashMap::new(),
            next_account: AtomicU32::new(1),
            next_transaction: AtomicU64::new(1),
            register: SettlementRegister::new(),
            rewards,
            notifications,
            history_limit: self.config.history_limit,
        }
    }
}

/// Ledger engine that owns every account and its history.
///
/// # Invariants
///
/// - An account's balance equals Σ `Success` credits − Σ `Success` debits of its history.
/// - Balances never go negative.
/// - A record changes at most once, from `Pending` to `Success` or `Failed`.
/// - A reconciled journal entry id is registered at most once per account.
pub struct Engine {
    accounts: DashMap<AccountId, Arc<Account>>,
    by_mobile: DashMap<String, AccountId>,
    by_number: DashMap<String, AccountId>,
    /// Owning account of every committed record, for approvals.
    index: DashMap<TransactionId, AccountId>,
    next_account: AtomicU32,
    next_transaction: AtomicU64,
    register: SettlementRegister,
    rewards: Box<dyn RewardPolicy>,
    notifications: Arc<dyn NotificationSink>,
    history_limit: usize,
}

/// Public API
impl Engine {
    /// Creates an engine with the default reward policy and an in-memory outbox.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder {
            config: LedgerConfig::default(),
            configured_rewards: IntervalRewardPolicy::default(),
            rewards: None,
            notifications: None,
        }
    }

    /// Registers a new account with a zero balance.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::DuplicateAccount`] - Mobile or account number already registered.
    /// - [`LedgerError::AccountNotFound`] - The referrer does not exist.
    pub fn open_account(&self, profile: AccountProfile) -> Result<AccountId, LedgerError> {
        if let Some(referrer) = profile.referred_by {
            if !self.accounts.contains_key(&referrer) {
                return Err(LedgerError::AccountNotFound);
            }
        }

        let id = AccountId(self.next_account.fetch_add(1, Ordering::Relaxed));

        match self.by_mobile.entry(profile.mobile.clone()) {
            Entry::Occupied(_) => return Err(LedgerError::DuplicateAccount),
            Entry::Vacant(entry) => {
                entry.insert(id);
            }
        }
        match self.by_number.entry(profile.account_number.clone()) {
            Entry::Occupied(_) => {
                self.by_mobile.remove(&profile.mobile);
                return Err(LedgerError::DuplicateAccount);
            }
            Entry::Vacant(entry) => {
                entry.insert(id);
            }
        }

        info!(account = %id, name = %profile.display_name, "account opened");
        self.accounts.insert(id, Arc::new(Account::new(id, profile)));
        Ok(id)
    }

    /// Appends a credit record; moves the balance only when `status` is `Success`.
    ///
    /// A `Pending` credit is visible in history until an admin approves it.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - Amount is zero or negative.
    /// - [`LedgerError::AccountNotFound`] - Unknown account.
    pub fn credit(
        &self,
        account: AccountId,
        amount: Decimal,
        label: &str,
        status: TransactionStatus,
        remark: Option<String>,
    ) -> Result<Settlement, LedgerError> {
        let result = self.apply_credit(account, amount, label, status, remark);
        Self::log_result("credit", account, amount, &result);
        result
    }

    /// Removes funds and appends a `Success` debit record.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - Amount is zero or negative.
    /// - [`LedgerError::InsufficientFunds`] - Balance is lower than the amount.
    /// - [`LedgerError::AccountNotFound`] - Unknown account.
    pub fn debit(
        &self,
        account: AccountId,
        amount: Decimal,
        label: &str,
        remark: Option<String>,
    ) -> Result<Settlement, LedgerError> {
        let result = self.apply_debit(account, amount, label, remark);
        Self::log_result("debit", account, amount, &result);
        result
    }

    /// Moves funds between two accounts, notifying the receiver.
    ///
    /// The sender sees a debit to the receiver's display name, the receiver a
    /// credit from the sender's. Both sides commit together.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - Amount is zero or negative.
    /// - [`LedgerError::RecipientNotFound`] - No account matches the lookup.
    /// - [`LedgerError::SelfTransfer`] - Receiver is the sender.
    /// - [`LedgerError::InsufficientFunds`] - Sender balance is lower than the amount.
    pub fn transfer(
        &self,
        sender: AccountId,
        receiver: &RecipientLookup,
        amount: Decimal,
        remark: Option<String>,
    ) -> Result<Settlement, LedgerError> {
        let result = self.apply_transfer(sender, receiver, amount, remark);
        Self::log_result("transfer", sender, amount, &result);
        result
    }

    /// Finalizes a pending credit.
    ///
    /// `Success` credits the balance and evaluates rewards once; `Failed`
    /// records the rejection reason and leaves the balance alone.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidDecision`] - Decision is `Pending`.
    /// - [`LedgerError::TransactionNotFound`] - Unknown transaction id.
    /// - [`LedgerError::InvalidState`] - Transaction is no longer pending.
    pub fn approve(
        &self,
        transaction: TransactionId,
        decision: TransactionStatus,
        rejection_reason: Option<String>,
    ) -> Result<Settlement, LedgerError> {
        let result = self.apply_approval(transaction, decision, rejection_reason);
        match &result {
            Ok(settlement) => info!(
                tx = %transaction,
                account = %settlement.transaction.account,
                decision = ?decision,
                "approval applied"
            ),
            Err(e) => warn!(tx = %transaction, decision = ?decision, reason = %e, "approval rejected"),
        }
        result
    }

    /// Settles a batch of offline journal entries, one outcome per entry.
    ///
    /// Resubmitting an entry id returns its stored outcome; nothing is
    /// registered twice. Offline entries do not move the account balance:
    /// those funds left the ledger when the wallet was loaded.
    pub fn reconcile(
        &self,
        account: AccountId,
        submissions: Vec<Submission>,
    ) -> Result<Vec<ReconcileOutcome>, LedgerError> {
        if !self.accounts.contains_key(&account) {
            return Err(LedgerError::AccountNotFound);
        }

        let outcomes: Vec<ReconcileOutcome> = submissions
            .into_iter()
            .map(|submission| self.register.submit(account, submission))
            .collect();

        let failed = outcomes
            .iter()
            .filter(|o| o.status == ReconcileStatus::Failed)
            .count();
        info!(
            account = %account,
            submitted = outcomes.len(),
            failed,
            "offline entries reconciled"
        );
        Ok(outcomes)
    }

    /// Most recent records of an account, newest first.
    pub fn history(&self, account: AccountId, limit: usize) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.account(account)?.history(limit))
    }

    /// Default page size for [`Engine::history`].
    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Retrieves an account by id.
    pub fn get_account(&self, account: &AccountId) -> Option<Arc<Account>> {
        self.accounts.get(account).map(|entry| Arc::clone(entry.value()))
    }

    /// All accounts, ordered by id.
    pub fn accounts(&self) -> Vec<Arc<Account>> {
        let mut accounts: Vec<_> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        accounts.sort_by_key(|account| account.id());
        accounts
    }

    pub fn find_transaction(&self, id: TransactionId) -> Option<Transaction> {
        let account = *self.index.get(&id)?;
        self.get_account(&account)?.transaction(id)
    }

    pub fn resolve(&self, lookup: &RecipientLookup) -> Option<AccountId> {
        let id = match lookup {
            RecipientLookup::Mobile(mobile) => self.by_mobile.get(mobile),
            RecipientLookup::AccountNumber(number) => self.by_number.get(number),
        };
        id.map(|entry| *entry.value())
    }

    pub fn settlement_register(&self) -> &SettlementRegister {
        &self.register
    }
}

/// Private API
impl Engine {
    fn log_result(op: &str, account: AccountId, amount: Decimal, result: &Result<Settlement, LedgerError>) {
        match result {
            Ok(settlement) => info!(
                account = %account,
                tx = %settlement.transaction.id,
                amount = %amount,
                status = ?settlement.transaction.status,
                balance = %settlement.new_balance,
                "{op} applied"
            ),
            Err(e) => warn!(account = %account, amount = %amount, reason = %e, "{op} rejected"),
        }
    }

    fn account(&self, id: AccountId) -> Result<Arc<Account>, LedgerError> {
        self.get_account(&id).ok_or(LedgerError::AccountNotFound)
    }

    fn ensure_positive(amount: Decimal) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        Ok(())
    }

    fn commit(&self, uow: UnitOfWork<'_>) -> Result<(), LedgerError> {
        let created = uow.commit(self.notifications.as_ref())?;
        for (id, account) in created {
            self.index.insert(id, account);
        }
        Ok(())
    }

    fn apply_credit(
        &self,
        account: AccountId,
        amount: Decimal,
        label: &str,
        status: TransactionStatus,
        remark: Option<String>,
    ) -> Result<Settlement, LedgerError> {
        Self::ensure_positive(amount)?;
        let accounts = [self.account(account)?];
        let mut uow = UnitOfWork::begin(&accounts, &self.next_transaction);

        let transaction = uow.record(account, Direction::Credit, amount, label, status, remark)?;
        let mut rewards = Reward::default();
        if status == TransactionStatus::Success {
            uow.adjust_balance(account, amount)?;
            rewards = uow.reward(account, self.rewards.as_ref())?;
        }
        let new_balance = uow.balance(account)?;

        self.commit(uow)?;
        Ok(Settlement {
            transaction,
            new_balance,
            rewards,
        })
    }

    fn apply_debit(
        &self,
        account: AccountId,
        amount: Decimal,
        label: &str,
        remark: Option<String>,
    ) -> Result<Settlement, LedgerError> {
        Self::ensure_positive(amount)?;
        let accounts = [self.account(account)?];
        let mut uow = UnitOfWork::begin(&accounts, &self.next_transaction);

        if uow.balance(account)? < amount {
            return Err(LedgerError::InsufficientFunds);
        }
        uow.adjust_balance(account, -amount)?;
        let transaction = uow.record(
            account,
            Direction::Debit,
            amount,
            label,
            TransactionStatus::Success,
            remark,
        )?;
        let rewards = uow.reward(account, self.rewards.as_ref())?;
        let new_balance = uow.balance(account)?;

        self.commit(uow)?;
        Ok(Settlement {
            transaction,
            new_balance,
            rewards,
        })
    }

    fn apply_transfer(
        &self,
        sender: AccountId,
        receiver: &RecipientLookup,
        amount: Decimal,
        remark: Option<String>,
    ) -> Result<Settlement, LedgerError> {
        Self::ensure_positive(amount)?;
        let receiver = self.resolve(receiver).ok_or(LedgerError::RecipientNotFound)?;
        if receiver == sender {
            return Err(LedgerError::SelfTransfer);
        }

        let accounts = [
            self.account(sender)?,
            self.get_account(&receiver).ok_or(LedgerError::RecipientNotFound)?,
        ];
        let mut uow = UnitOfWork::begin(&accounts, &self.next_transaction);

        if uow.balance(sender)? < amount {
            return Err(LedgerError::InsufficientFunds);
        }
        let sender_name = uow.display_name(sender)?;
        let receiver_name = uow.display_name(receiver)?;

        uow.adjust_balance(sender, -amount)?;
        uow.adjust_balance(receiver, amount)?;
        let transaction = uow.record(
            sender,
            Direction::Debit,
            amount,
            receiver_name,
            TransactionStatus::Success,
            remark.clone(),
        )?;
        uow.record(
            receiver,
            Direction::Credit,
            amount,
            sender_name.clone(),
            TransactionStatus::Success,
            remark,
        )?;

        let rewards = uow.reward(sender, self.rewards.as_ref())?;
        uow.reward(receiver, self.rewards.as_ref())?;
        uow.notify(Notification::new(
            receiver,
            format!("You received {amount} from {sender_name}"),
        ));
        let new_balance = uow.balance(sender)?;

        self.commit(uow)?;
        Ok(Settlement {
            transaction,
            new_balance,
            rewards,
        })
    }

    fn apply_approval(
        &self,
        id: TransactionId,
        decision: TransactionStatus,
        rejection_reason: Option<String>,
    ) -> Result<Settlement, LedgerError> {
        if decision == TransactionStatus::Pending {
            return Err(LedgerError::InvalidDecision(decision));
        }
        let account = *self.index.get(&id).ok_or(LedgerError::TransactionNotFound)?;
        let accounts = [self.account(account)?];
        let mut uow = UnitOfWork::begin(&accounts, &self.next_transaction);

        let mut transaction = uow.transaction(account, id)?;
        if !transaction.is_pending() {
            return Err(LedgerError::InvalidState(transaction.status));
        }

        let reason = match decision {
            TransactionStatus::Failed => rejection_reason,
            _ => None,
        };
        uow.finalize(account, id, decision, reason.clone())?;
        transaction.status = decision;
        transaction.rejection_reason = reason.clone();

        let mut rewards = Reward::default();
        let message = if decision == TransactionStatus::Success {
            uow.adjust_balance(account, transaction.amount)?;
            rewards = uow.reward(account, self.rewards.as_ref())?;
            format!("Your credit of {} was approved", transaction.amount)
        } else {
            format!(
                "Your credit of {} was rejected: {}",
                transaction.amount,
                reason.as_deref().unwrap_or("no reason given")
            )
        };
        uow.notify(Notification::new(account, message));
        let new_balance = uow.balance(account)?;

        self.commit(uow)?;
        Ok(Settlement {
            transaction,
            new_balance,
            rewards,
        })
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reward::NoRewards;
    use rust_decimal_macros::dec;

    fn engine() -> Engine {
        Engine::builder().reward_policy(NoRewards).build()
    }

    #[test]
    fn open_account_rejects_duplicate_mobile_and_number() {
        let engine = engine();
        engine
            .open_account(AccountProfile::new("Asha", "900", "ACC1"))
            .unwrap();

        assert_eq!(
            engine.open_account(AccountProfile::new("Ravi", "900", "ACC2")),
            Err(LedgerError::DuplicateAccount)
        );
        assert_eq!(
            engine.open_account(AccountProfile::new("Ravi", "901", "ACC1")),
            Err(LedgerError::DuplicateAccount)
        );
        // The failed attempt released its mobile reservation
        assert!(engine.open_account(AccountProfile::new("Ravi", "901", "ACC2")).is_ok());
    }

    #[test]
    fn open_account_requires_existing_referrer() {
        let engine = engine();
        let profile = AccountProfile::new("Asha", "900", "ACC1").referred_by(AccountId(77));
        assert_eq!(engine.open_account(profile), Err(LedgerError::AccountNotFound));
    }

    #[test]
    fn committed_records_are_indexed() {
        let engine = engine();
        let id = engine
            .open_account(AccountProfile::new("Asha", "900", "ACC1"))
            .unwrap();
        let settlement = engine
            .credit(id, dec!(10), "Bank transfer", TransactionStatus::Pending, None)
            .unwrap();
        let found = engine.find_transaction(settlement.transaction.id).unwrap();
        assert_eq!(found, settlement.transaction);
    }

    #[test]
    fn rejected_operation_consumes_no_index_entry() {
        let engine = engine();
        let id = engine
            .open_account(AccountProfile::new("Asha", "900", "ACC1"))
            .unwrap();
        assert!(engine.debit(id, dec!(1), "Shop", None).is_err());
        assert_eq!(engine.index.len(), 0);
    }

    #[test]
    fn approve_rejects_pending_decision() {
        let engine = engine();
        assert_eq!(
            engine.approve(TransactionId(1), TransactionStatus::Pending, None),
            Err(LedgerError::InvalidDecision(TransactionStatus::Pending))
        );
    }
}
