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

//! Device-side wallet context.
//!
//! A [`WalletContext`] owns one wallet, its journal and its cached bank
//! balance, together with the store they persist to and the ledger client
//! they settle against. Every mutation is applied to a copy of the state,
//! persisted in full, and only then becomes visible. The journal is written
//! first; if a later record fails to write, the records already written are
//! put back, so a storage failure leaves the previous state in place both in
//! memory and on disk.
//!
//! Loads are journaled as in-flight entries before the bank is debited, and
//! the debit is reversed if the wallet cannot record it afterwards.
//!
//! # Operations
//!
//! - **Load / Unload**: Move funds between bank and wallet. Online only.
//! - **Send**: Spends from the wallet. Offline sends reserve the amount until sync.
//! - **Receive**: Credits the wallet at once; offline receipts wait for sync.
//! - **Sync**: Submits pending entries and applies the per-entry outcomes.

use crate::base::EntryId;
use crate::config::{Config, SyncConfig, WalletConfig};
use crate::error::{LedgerError, SyncError, WalletError};
use crate::reconcile::ReconcileOutcome;
use crate::wallet::client::LedgerClient;
use crate::wallet::model::{
    EntryKind, JournalEntry, OfflineWallet, ProfileSnapshot, RemoteBalance,
};
use crate::wallet::store::{
    JOURNAL_KEY, PROFILE_KEY, REMOTE_BALANCE_KEY, WALLET_KEY, WalletStore, load, save,
};
use crate::wallet::sync::{SyncBatch, SyncReport, apply_outcomes};
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

/// Counterparty label of wallet loads and unloads on both sides.
pub const BANK_LABEL: &str = "Offline wallet";

/// Persisted records in write order; the rest is derived from the journal.
const RECORDS: [&str; 4] = [JOURNAL_KEY, WALLET_KEY, REMOTE_BALANCE_KEY, PROFILE_KEY];

/// Everything a wallet persists.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletState {
    pub profile: Option<ProfileSnapshot>,
    pub remote: RemoteBalance,
    pub wallet: OfflineWallet,
    pub journal: Vec<JournalEntry>,
}

pub struct WalletContext<S, C> {
    store: S,
    client: C,
    state: Mutex<WalletState>,
    online: AtomicBool,
    sync: SyncConfig,
}

impl<S: WalletStore, C: LedgerClient> WalletContext<S, C> {
    /// Restores the wallet from `store`, creating an empty one on first use.
    ///
    /// The context starts offline.
    pub fn open(store: S, client: C, config: &Config) -> Result<Self, WalletError> {
        let state = Self::restore(&store, &config.wallet)?;
        Ok(Self {
            store,
            client,
            state: Mutex::new(state),
            online: AtomicBool::new(false),
            sync: config.sync.clone(),
        })
    }

    fn restore(store: &S, config: &WalletConfig) -> Result<WalletState, WalletError> {
        Ok(WalletState {
            profile: load(store, PROFILE_KEY)?,
            remote: load(store, REMOTE_BALANCE_KEY)?.unwrap_or_default(),
            wallet: load(store, WALLET_KEY)?.unwrap_or_else(|| OfflineWallet::new(config)),
            journal: load(store, JOURNAL_KEY)?.unwrap_or_default(),
        })
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Stores the profile handed over by the login flow.
    pub fn sign_in(&self, profile: ProfileSnapshot) -> Result<(), WalletError> {
        self.mutate(|state| {
            state.profile = Some(profile);
            Ok(())
        })
    }

    pub fn state(&self) -> WalletState {
        self.state.lock().clone()
    }

    pub fn wallet(&self) -> OfflineWallet {
        self.state.lock().wallet.clone()
    }

    pub fn journal(&self) -> Vec<JournalEntry> {
        self.state.lock().journal.clone()
    }

    pub fn profile(&self) -> Option<ProfileSnapshot> {
        self.state.lock().profile.clone()
    }

    pub fn remote_balance(&self) -> RemoteBalance {
        self.state.lock().remote.clone()
    }

    /// Entries whose outcome is not yet known to the ledger.
    pub fn pending_reconciliation(&self) -> Vec<JournalEntry> {
        self.state
            .lock()
            .journal
            .iter()
            .filter(|entry| entry.is_pending())
            .cloned()
            .collect()
    }

    /// Fetches and caches the bank balance.
    pub async fn refresh_remote_balance(&self) -> Result<Decimal, WalletError> {
        self.require_online()?;
        let balance = self.client.balance().await?;
        self.mutate(|state| {
            state.remote = RemoteBalance {
                balance,
                fetched_at: Some(Utc::now()),
            };
            Ok(balance)
        })
    }

    /// Moves `amount` from the bank into the wallet.
    ///
    /// The load is journaled as an in-flight entry before the bank is
    /// debited. If the wallet cannot record the credit afterwards, the debit
    /// is reversed and the entry fails; if the reversal is refused too, the
    /// entry stays pending as the record of the unmatched debit.
    ///
    /// # Errors
    ///
    /// - [`WalletError::Offline`] - No connectivity.
    /// - [`WalletError::InvalidAmount`] - Amount is zero or negative.
    /// - [`WalletError::BalanceCap`] - Wallet would exceed its maximum balance.
    /// - [`WalletError::InsufficientBankBalance`] - Bank balance is lower than the amount.
    /// - [`WalletError::Storage`] - The wallet could not be saved; the bank balance is unchanged.
    pub async fn load_cash(&self, amount: Decimal) -> Result<JournalEntry, WalletError> {
        let result = self.apply_load(amount).await;
        Self::log_result("load", amount, &result);
        result
    }

    async fn apply_load(&self, amount: Decimal) -> Result<JournalEntry, WalletError> {
        self.require_online()?;
        require_positive(amount)?;
        let pending = self.mutate(|state| {
            check_cap(state, amount)?;
            let entry = JournalEntry::in_flight(EntryKind::Load, amount, BANK_LABEL);
            state.journal.push(entry.clone());
            Ok(entry)
        })?;

        let settlement = match self.client.debit(amount, BANK_LABEL, None).await {
            Ok(settlement) => settlement,
            Err(e) => {
                let e = match e {
                    LedgerError::InsufficientFunds => WalletError::InsufficientBankBalance,
                    other => WalletError::Ledger(other),
                };
                self.abandon(pending.id, &e.to_string());
                return Err(e);
            }
        };

        let credited = self.mutate(|state| {
            // The in-flight load already counts against the cap.
            check_cap(state, Decimal::ZERO)?;
            state.remote = RemoteBalance {
                balance: settlement.new_balance,
                fetched_at: Some(Utc::now()),
            };
            state.wallet.balance += amount;
            let entry = find_entry(&mut state.journal, pending.id, EntryKind::Load)?;
            entry.settle(Utc::now())?;
            Ok(entry.clone())
        });
        if let Err(e) = &credited {
            self.reverse_load(&pending, e).await;
        }
        credited
    }

    /// Credits a debited load back to the bank after the wallet failed to record it.
    async fn reverse_load(&self, pending: &JournalEntry, cause: &WalletError) {
        let note = format!("Reversal of wallet load {}", pending.id);
        match self
            .client
            .credit(pending.amount, BANK_LABEL, Some(note))
            .await
        {
            Ok(_) => self.abandon(pending.id, &format!("reversed: {cause}")),
            Err(e) => error!(
                entry = %pending.id,
                amount = %pending.amount,
                reason = %e,
                "load debited but not credited to the wallet"
            ),
        }
    }

    /// Fails a pending entry; a storage error is logged and the entry stays pending.
    fn abandon(&self, id: EntryId, reason: &str) {
        let result = self.mutate(|state| {
            let entry = state
                .journal
                .iter_mut()
                .find(|entry| entry.id == id)
                .ok_or(WalletError::EntryNotFound(id))?;
            entry.fail(reason)
        });
        if let Err(e) = result {
            warn!(entry = %id, reason = %e, "could not fail journal entry");
        }
    }

    /// Moves `amount` from the wallet back to the bank.
    ///
    /// The amount leaves the wallet before the ledger is called and is put
    /// back if the ledger refuses the credit or does not answer.
    pub async fn unload_cash(&self, amount: Decimal) -> Result<JournalEntry, WalletError> {
        let result = self.apply_unload(amount).await;
        Self::log_result("unload", amount, &result);
        result
    }

    /// The credit carries no idempotency key. A transport error after the
    /// ledger committed the credit still refunds the wallet, so the same
    /// amount ends up in both places; the cached bank balance shows it on the
    /// next refresh.
    async fn apply_unload(&self, amount: Decimal) -> Result<JournalEntry, WalletError> {
        self.require_online()?;
        require_positive(amount)?;
        self.mutate(|state| {
            check_available(&state.wallet, amount)?;
            state.wallet.balance -= amount;
            Ok(())
        })?;

        let settlement = match self.client.credit(amount, BANK_LABEL, None).await {
            Ok(settlement) => settlement,
            Err(e) => {
                self.mutate(|state| {
                    state.wallet.balance += amount;
                    Ok(())
                })?;
                return Err(e.into());
            }
        };

        self.mutate(|state| {
            state.remote = RemoteBalance {
                balance: settlement.new_balance,
                fetched_at: Some(Utc::now()),
            };
            let entry = JournalEntry::new(EntryKind::Unload, amount, BANK_LABEL, None, true);
            state.journal.push(entry.clone());
            Ok(entry)
        })
    }

    /// Checks whether `amount` can be sent right now, without sending it.
    pub fn check_send(&self, amount: Decimal) -> Result<(), WalletError> {
        let state = self.state.lock();
        check_send(&state, amount)
    }

    /// Pays `payee` from the wallet.
    ///
    /// Offline, the amount moves into the reservation and the entry stays
    /// pending until sync; online, it is spent and settled at once.
    ///
    /// # Errors
    ///
    /// - [`WalletError::InvalidAmount`] - Amount is zero or negative.
    /// - [`WalletError::PerTransactionLimit`] - Amount is above the per-payment limit.
    /// - [`WalletError::DailyLimit`] - Amount is above what is left of today's limit.
    /// - [`WalletError::InsufficientBalance`] - Wallet balance is lower than the amount.
    pub fn send(
        &self,
        amount: Decimal,
        payee: &str,
        note: Option<String>,
    ) -> Result<JournalEntry, WalletError> {
        self.spend("send", amount, payee, note, self.is_online())
    }

    /// Reserves `amount` for `payee` and journals a pending send, whatever the
    /// connectivity. Used when the payment is handed over before it is
    /// confirmed; [`Self::void_send`] undoes it if the hand-over fails.
    pub(crate) fn reserve_send(
        &self,
        amount: Decimal,
        payee: &str,
        note: Option<String>,
    ) -> Result<JournalEntry, WalletError> {
        self.spend("reserve", amount, payee, note, false)
    }

    /// Fails a pending send and returns its reservation to the balance.
    pub(crate) fn void_send(&self, id: EntryId, reason: &str) -> Result<JournalEntry, WalletError> {
        let result = self.mutate(|state| {
            let entry = find_entry(&mut state.journal, id, EntryKind::Sent)?;
            entry.fail(reason)?;
            state.wallet.refund(entry.amount);
            Ok(entry.clone())
        });
        if let Ok(entry) = &result {
            info!(entry = %id, amount = %entry.amount, reason, "send voided");
        }
        result
    }

    fn spend(
        &self,
        op: &str,
        amount: Decimal,
        payee: &str,
        note: Option<String>,
        online: bool,
    ) -> Result<JournalEntry, WalletError> {
        let result = self.mutate(|state| {
            check_send(state, amount)?;
            if online {
                state.wallet.balance -= amount;
            } else {
                state.wallet.reserve(amount);
            }
            let entry = JournalEntry::new(EntryKind::Sent, amount, payee, note, online);
            state.journal.push(entry.clone());
            Ok(entry)
        });
        Self::log_result(op, amount, &result);
        result
    }

    /// Credits the wallet with a payment from `payer`.
    pub fn receive(
        &self,
        amount: Decimal,
        payer: &str,
        note: Option<String>,
    ) -> Result<JournalEntry, WalletError> {
        let online = self.is_online();
        let result = self.mutate(|state| {
            require_positive(amount)?;
            check_cap(state, amount)?;
            state.wallet.balance += amount;
            let entry = JournalEntry::new(EntryKind::Received, amount, payer, note, online);
            state.journal.push(entry.clone());
            Ok(entry)
        });
        Self::log_result("receive", amount, &result);
        result
    }

    /// Snapshots the pending entries for one sync cycle; `None` while offline.
    pub fn begin_sync(&self) -> Option<SyncBatch> {
        if !self.is_online() {
            return None;
        }
        Some(SyncBatch::snapshot(&self.state.lock().journal))
    }

    /// Applies the ledger's outcomes for a batch from [`Self::begin_sync`].
    pub fn apply_sync(
        &self,
        batch: &SyncBatch,
        outcomes: Vec<ReconcileOutcome>,
    ) -> Result<SyncReport, WalletError> {
        self.mutate(|state| apply_outcomes(&mut state.wallet, &mut state.journal, batch, outcomes))
    }

    /// Reconciles every pending entry with the ledger.
    ///
    /// Does nothing while offline. The reconcile call is bounded by the
    /// configured timeout and never retried here; on timeout or rejection
    /// every entry stays pending and the next cycle resubmits it under the
    /// same id.
    ///
    /// # Errors
    ///
    /// - [`SyncError::TimedOut`] - The ledger did not answer in time.
    /// - [`SyncError::Ledger`] - The ledger rejected the batch.
    /// - [`SyncError::PartialFailure`] - Some entries failed; outcomes are already applied.
    pub async fn sync(&self) -> Result<SyncReport, SyncError> {
        let Some(batch) = self.begin_sync() else {
            return Ok(SyncReport::skipped());
        };
        if batch.is_empty() {
            return Ok(SyncReport::skipped());
        }

        let outcomes = match tokio::time::timeout(
            self.sync.timeout(),
            self.client.reconcile(batch.entries.clone()),
        )
        .await
        {
            Ok(Ok(outcomes)) => outcomes,
            Ok(Err(e)) => {
                warn!(entries = batch.len(), reason = %e, "sync rejected");
                return Err(SyncError::Ledger(e));
            }
            Err(_) => {
                warn!(entries = batch.len(), timeout_ms = self.sync.timeout_ms, "sync timed out");
                return Err(SyncError::TimedOut(self.sync.timeout_ms));
            }
        };

        let report = self.apply_sync(&batch, outcomes)?;
        info!(
            submitted = report.submitted,
            settled = report.settled.len(),
            failed = report.failed.len(),
            still_pending = report.still_pending.len(),
            "sync applied"
        );
        if report.has_failures() {
            return Err(SyncError::PartialFailure(report));
        }
        Ok(report)
    }

    fn require_online(&self) -> Result<(), WalletError> {
        if self.is_online() {
            Ok(())
        } else {
            Err(WalletError::Offline)
        }
    }

    /// Runs `f` on a copy of the state, persists the copy, then publishes it.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut WalletState) -> Result<T, WalletError>,
    ) -> Result<T, WalletError> {
        let mut state = self.state.lock();
        let mut next = state.clone();
        let value = f(&mut next)?;
        self.persist(&next, &state)?;
        *state = next;
        Ok(value)
    }

    /// Writes every record of `next`, journal first. On failure the records
    /// already written are rewritten from `previous` as far as the store allows.
    fn persist(&self, next: &WalletState, previous: &WalletState) -> Result<(), WalletError> {
        for (written, key) in RECORDS.iter().enumerate() {
            let Err(e) = self.write_record(key, next) else {
                continue;
            };
            for key in RECORDS[..written].iter().rev() {
                if let Err(undo) = self.write_record(key, previous) {
                    error!(record = *key, reason = %undo, "wallet record rollback failed");
                }
            }
            return Err(e);
        }
        Ok(())
    }

    fn write_record(&self, key: &str, state: &WalletState) -> Result<(), WalletError> {
        match key {
            JOURNAL_KEY => save(&self.store, key, &state.journal),
            WALLET_KEY => save(&self.store, key, &state.wallet),
            REMOTE_BALANCE_KEY => save(&self.store, key, &state.remote),
            _ => match &state.profile {
                Some(profile) => save(&self.store, key, profile),
                None => Ok(()),
            },
        }
    }

    fn log_result<T>(op: &str, amount: Decimal, result: &Result<T, WalletError>) {
        match result {
            Ok(_) => info!(op, %amount, "wallet operation applied"),
            Err(e) => warn!(op, %amount, reason = %e, "wallet operation rejected"),
        }
    }
}

fn require_positive(amount: Decimal) -> Result<(), WalletError> {
    if amount <= Decimal::ZERO {
        return Err(WalletError::InvalidAmount);
    }
    Ok(())
}

/// Loads still waiting for the bank count against the cap.
fn check_cap(state: &WalletState, amount: Decimal) -> Result<(), WalletError> {
    let in_flight: Decimal = state
        .journal
        .iter()
        .filter(|entry| entry.kind == EntryKind::Load && entry.is_pending())
        .map(|entry| entry.amount)
        .sum();
    let wallet = &state.wallet;
    if wallet.balance + in_flight + amount > wallet.max_balance {
        return Err(WalletError::BalanceCap(wallet.max_balance));
    }
    Ok(())
}

fn find_entry(
    journal: &mut [JournalEntry],
    id: EntryId,
    kind: EntryKind,
) -> Result<&mut JournalEntry, WalletError> {
    journal
        .iter_mut()
        .find(|entry| entry.id == id && entry.kind == kind)
        .ok_or(WalletError::EntryNotFound(id))
}

fn check_available(wallet: &OfflineWallet, amount: Decimal) -> Result<(), WalletError> {
    if wallet.balance < amount {
        return Err(WalletError::InsufficientBalance {
            available: wallet.balance,
            requested: amount,
        });
    }
    Ok(())
}

fn check_send(state: &WalletState, amount: Decimal) -> Result<(), WalletError> {
    require_positive(amount)?;
    let limits = state.wallet.limits;
    if amount > limits.max_per_transaction {
        return Err(WalletError::PerTransactionLimit(limits.max_per_transaction));
    }

    let today = Utc::now().date_naive();
    let spent: Decimal = state
        .journal
        .iter()
        .filter(|entry| entry.counts_toward_daily_limit(today))
        .map(|entry| entry.amount)
        .sum();
    let remaining = (limits.daily_limit - spent).max(Decimal::ZERO);
    if amount > remaining {
        return Err(WalletError::DailyLimit(remaining));
    }

    check_available(&state.wallet, amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountProfile;
    use crate::engine::Engine;
    use crate::reward::NoRewards;
    use crate::transaction::TransactionStatus;
    use crate::wallet::client::LocalLedgerClient;
    use crate::wallet::model::EntryStatus;
    use crate::wallet::store::MemoryStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn context(bank: Decimal) -> WalletContext<MemoryStore, LocalLedgerClient> {
        let engine = Arc::new(Engine::builder().reward_policy(NoRewards).build());
        let account = engine
            .open_account(AccountProfile::new("Asha", "900", "ACC1"))
            .unwrap();
        engine
            .credit(account, bank, "Bank transfer", TransactionStatus::Success, None)
            .unwrap();
        let client = LocalLedgerClient::new(engine, account);
        WalletContext::open(MemoryStore::new(), client, &Config::default()).unwrap()
    }

    #[tokio::test]
    async fn load_requires_connectivity() {
        let ctx = context(dec!(1000));
        assert_eq!(ctx.load_cash(dec!(100)).await, Err(WalletError::Offline));
    }

    #[tokio::test]
    async fn load_moves_bank_funds_into_wallet() {
        let ctx = context(dec!(1000));
        ctx.set_online(true);
        let entry = ctx.load_cash(dec!(400)).await.unwrap();
        assert_eq!(entry.status, EntryStatus::Settled);
        assert_eq!(ctx.wallet().balance, dec!(400));
        assert_eq!(ctx.remote_balance().balance, dec!(600));
    }

    #[tokio::test]
    async fn load_beyond_bank_balance_fails() {
        let ctx = context(dec!(50));
        ctx.set_online(true);
        assert_eq!(
            ctx.load_cash(dec!(100)).await,
            Err(WalletError::InsufficientBankBalance)
        );
        assert_eq!(ctx.wallet().balance, dec!(0));
        let journal = ctx.journal();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].status, EntryStatus::Failed);
        assert!(ctx.pending_reconciliation().is_empty());
    }

    #[tokio::test]
    async fn load_beyond_cap_fails() {
        let ctx = context(dec!(5000));
        ctx.set_online(true);
        assert_eq!(
            ctx.load_cash(dec!(2500)).await,
            Err(WalletError::BalanceCap(dec!(2000)))
        );
    }

    #[tokio::test]
    async fn unload_returns_funds_to_bank() {
        let ctx = context(dec!(1000));
        ctx.set_online(true);
        ctx.load_cash(dec!(300)).await.unwrap();
        ctx.unload_cash(dec!(100)).await.unwrap();
        assert_eq!(ctx.wallet().balance, dec!(200));
        assert_eq!(ctx.remote_balance().balance, dec!(800));
        assert_eq!(ctx.journal().last().unwrap().kind, EntryKind::Unload);
    }

    #[tokio::test]
    async fn send_enforces_limits() {
        let ctx = context(dec!(2000));
        ctx.set_online(true);
        ctx.load_cash(dec!(2000)).await.unwrap();
        ctx.set_online(false);

        assert_eq!(
            ctx.send(dec!(600), "Shop", None),
            Err(WalletError::PerTransactionLimit(dec!(500)))
        );
        for _ in 0..4 {
            ctx.send(dec!(500), "Shop", None).unwrap();
        }
        assert_eq!(
            ctx.send(dec!(1), "Shop", None),
            Err(WalletError::DailyLimit(dec!(0)))
        );
    }

    #[test]
    fn send_beyond_balance_fails_without_journaling() {
        let ctx = context(dec!(0));
        let err = ctx.send(dec!(10), "Shop", None).unwrap_err();
        assert_eq!(
            err,
            WalletError::InsufficientBalance {
                available: dec!(0),
                requested: dec!(10)
            }
        );
        assert!(ctx.journal().is_empty());
    }

    #[test]
    fn receive_respects_cap() {
        let ctx = context(dec!(0));
        ctx.receive(dec!(1500), "Ravi", None).unwrap();
        assert_eq!(
            ctx.receive(dec!(600), "Ravi", None),
            Err(WalletError::BalanceCap(dec!(2000)))
        );
        assert_eq!(ctx.pending_reconciliation().len(), 1);
    }

    #[tokio::test]
    async fn reserved_send_can_be_voided_while_online() {
        let ctx = context(dec!(1000));
        ctx.set_online(true);
        ctx.load_cash(dec!(300)).await.unwrap();

        let entry = ctx.reserve_send(dec!(100), "Ravi", None).unwrap();
        assert!(entry.is_pending());
        assert_eq!(ctx.wallet().balance, dec!(200));
        assert_eq!(ctx.wallet().reserved, dec!(100));

        let voided = ctx.void_send(entry.id, "write timed out").unwrap();
        assert_eq!(voided.status, EntryStatus::Failed);
        assert_eq!(ctx.wallet().balance, dec!(300));
        assert_eq!(ctx.wallet().reserved, dec!(0));
        assert_eq!(
            ctx.void_send(entry.id, "again"),
            Err(WalletError::EntryFinalized(entry.id))
        );
    }

    #[test]
    fn void_send_ignores_other_entries() {
        let ctx = context(dec!(0));
        let receipt = ctx.receive(dec!(50), "Ravi", None).unwrap();
        assert_eq!(
            ctx.void_send(receipt.id, "nope"),
            Err(WalletError::EntryNotFound(receipt.id))
        );
        assert_eq!(ctx.wallet().balance, dec!(50));
    }

    #[tokio::test]
    async fn sync_is_skipped_offline() {
        let ctx = context(dec!(0));
        ctx.receive(dec!(10), "Ravi", None).unwrap();
        let report = ctx.sync().await.unwrap();
        assert!(report.skipped);
        assert!(ctx.journal()[0].is_pending());
    }
}
