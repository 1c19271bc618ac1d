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

//! # Settle
//!
//! Settlement and offline sync for peer-to-peer payments.
//!
//! ## Core Components
//!
//! - [`Engine`]: Authoritative ledger; credit, debit, transfer, approval, reconciliation
//! - [`Account`]: One user's balance, points and transaction history
//! - [`RewardPolicy`]: Points and cashback granted on successful transactions
//! - [`wallet::WalletContext`]: Device-side offline wallet, journal and sync
//! - [`proximity::ProximityPayments`]: Nearby payments over a short-range transport
//! - [`api`]: HTTP surface of the engine
//!
//! ## Example
//!
//! ```
//! use settle_rs::{AccountProfile, Engine, NoRewards, RecipientLookup, TransactionStatus};
//! use rust_decimal_macros::dec;
//!
//! let engine = Engine::builder().reward_policy(NoRewards).build();
//! let asha = engine.open_account(AccountProfile::new("Asha", "9000000001", "ACC1")).unwrap();
//! let ravi = engine.open_account(AccountProfile::new("Ravi", "9000000002", "ACC2")).unwrap();
//!
//! engine.credit(asha, dec!(100.00), "Bank transfer", TransactionStatus::Success, None).unwrap();
//! engine
//!     .transfer(asha, &RecipientLookup::Mobile("9000000002".into()), dec!(40.00), None)
//!     .unwrap();
//!
//! assert_eq!(engine.get_account(&asha).unwrap().balance(), dec!(60.00));
//! assert_eq!(engine.get_account(&ravi).unwrap().balance(), dec!(40.00));
//! ```
//!
//! ## Thread Safety
//!
//! The engine locks only the accounts an operation touches, in ascending id
//! order, so operations on disjoint accounts run in parallel.

pub mod account;
pub mod api;
mod base;
pub mod config;
mod engine;
pub mod error;
pub mod logging;
mod notification;
pub mod proximity;
mod reconcile;
mod reward;
mod transaction;
mod unit_of_work;
pub mod wallet;

pub use account::{Account, AccountProfile};
pub use base::{AccountId, EntryId, TransactionId};
pub use config::Config;
pub use engine::{Engine, EngineBuilder, RecipientLookup};
pub use error::{LedgerError, PaymentError, SyncError, TransportError, WalletError};
pub use notification::{Notification, NotificationSink, Outbox};
pub use reconcile::{
    ReconcileOutcome, ReconcileStatus, SettlementRegister, Submission, SubmissionKind,
};
pub use reward::{IntervalRewardPolicy, NoRewards, Reward, RewardPolicy};
pub use transaction::{Direction, Settlement, Transaction, TransactionStatus};
pub use unit_of_work::CASHBACK_LABEL;
