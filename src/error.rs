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

//! Error types for the ledger, the offline wallet, sync and the proximity transport.
//!
//! Every error exposes `user_message()`: a short, actionable text meant for the
//! person holding the phone. `Display` keeps the more precise internal wording.

use crate::base::EntryId;
use crate::transaction::TransactionStatus;
use crate::wallet::SyncReport;
use rust_decimal::Decimal;
use thiserror::Error;

/// Ledger engine errors.
///
/// Any of these aborts the enclosing unit of work: no balance mutation
/// survives an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Amount is zero or negative
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// Approval decision other than `Success` or `Failed`
    #[error("invalid approval decision: {0:?}")]
    InvalidDecision(TransactionStatus),

    /// Debit or transfer would exceed the balance
    #[error("insufficient funds")]
    InsufficientFunds,

    /// Transfer receiver could not be resolved
    #[error("recipient not found")]
    RecipientNotFound,

    /// Transfer receiver is the sender
    #[error("cannot transfer to own account")]
    SelfTransfer,

    /// Approval attempted on a transaction that is no longer pending
    #[error("transaction is not pending (current status: {0:?})")]
    InvalidState(TransactionStatus),

    #[error("transaction not found")]
    TransactionNotFound,

    #[error("account not found")]
    AccountNotFound,

    /// Mobile number or account number already registered
    #[error("account already exists")]
    DuplicateAccount,

    /// The notification sink refused the unit of work's notifications
    #[error("notification delivery failed: {0}")]
    NotificationFailed(String),

    /// Remote ledger answered with an error this client does not recognise
    #[error("remote ledger error [{code}]: {message}")]
    Remote { code: String, message: String },

    /// Remote ledger could not be reached
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// Stable machine-readable code used on the HTTP surface.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::InvalidDecision(_) => "INVALID_DECISION",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::RecipientNotFound => "RECIPIENT_NOT_FOUND",
            Self::SelfTransfer => "SELF_TRANSFER",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::TransactionNotFound => "TRANSACTION_NOT_FOUND",
            Self::AccountNotFound => "ACCOUNT_NOT_FOUND",
            Self::DuplicateAccount => "DUPLICATE_ACCOUNT",
            Self::NotificationFailed(_) => "NOTIFICATION_FAILED",
            Self::Remote { .. } => "REMOTE_ERROR",
            Self::Unavailable(_) => "UNAVAILABLE",
        }
    }

    /// Rebuilds an error from its HTTP code.
    ///
    /// Variants carrying data that does not survive the wire come back as
    /// [`LedgerError::Remote`].
    pub fn from_code(code: &str, message: &str) -> Self {
        match code {
            "INVALID_AMOUNT" => Self::InvalidAmount,
            "INSUFFICIENT_FUNDS" => Self::InsufficientFunds,
            "RECIPIENT_NOT_FOUND" => Self::RecipientNotFound,
            "SELF_TRANSFER" => Self::SelfTransfer,
            "TRANSACTION_NOT_FOUND" => Self::TransactionNotFound,
            "ACCOUNT_NOT_FOUND" => Self::AccountNotFound,
            "DUPLICATE_ACCOUNT" => Self::DuplicateAccount,
            _ => Self::Remote {
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidAmount => "Enter a valid amount",
            Self::InvalidDecision(_) => "Choose approve or reject",
            Self::InsufficientFunds => "Insufficient balance",
            Self::RecipientNotFound => "Recipient not found",
            Self::SelfTransfer => "You cannot send money to yourself",
            Self::InvalidState(_) => "This transaction has already been processed",
            Self::TransactionNotFound => "Transaction not found",
            Self::AccountNotFound => "Account not found",
            Self::DuplicateAccount => "An account with these details already exists",
            Self::NotificationFailed(_) | Self::Remote { .. } => {
                "Something went wrong, please try again"
            }
            Self::Unavailable(_) => "Could not reach the bank, please try again later",
        }
    }
}

/// Offline wallet errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Operation needs connectivity (load, unload)
    #[error("operation requires connectivity")]
    Offline,

    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// Offline wallet balance does not cover the amount
    #[error("insufficient wallet balance: available {available}, requested {requested}")]
    InsufficientBalance { available: Decimal, requested: Decimal },

    /// Remote bank balance does not cover the load
    #[error("insufficient bank balance")]
    InsufficientBankBalance,

    #[error("amount exceeds per-transaction limit of {0}")]
    PerTransactionLimit(Decimal),

    #[error("amount exceeds remaining daily limit of {0}")]
    DailyLimit(Decimal),

    /// Wallet balance would exceed the configured maximum
    #[error("wallet balance would exceed maximum of {0}")]
    BalanceCap(Decimal),

    /// Journal entry already reached `settled` or `failed`
    #[error("journal entry {0} is already final")]
    EntryFinalized(EntryId),

    #[error("journal entry {0} not found")]
    EntryNotFound(EntryId),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("wallet storage error: {0}")]
    Storage(String),
}

impl WalletError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Offline => "You are offline, connect to continue",
            Self::InvalidAmount => "Enter a valid amount",
            Self::InsufficientBalance { .. } => "Insufficient wallet balance",
            Self::InsufficientBankBalance => "Insufficient bank balance",
            Self::PerTransactionLimit(_) => "Amount is above the per-payment limit",
            Self::DailyLimit(_) => "Daily offline limit reached",
            Self::BalanceCap(_) => "Wallet limit reached",
            Self::EntryFinalized(_) => "This payment has already been reconciled",
            Self::EntryNotFound(_) => "Payment not found",
            Self::Ledger(e) => e.user_message(),
            Self::Storage(_) => "Could not save wallet data",
        }
    }
}

/// Reconciliation errors.
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    /// Reconcile call exceeded its deadline; every entry stays pending
    #[error("sync timed out after {0} ms")]
    TimedOut(u64),

    /// Reconcile call was rejected as a whole; every entry stays pending
    #[error("sync rejected by ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// Some entries settled, others failed; outcomes are already applied
    #[error("{} of {} entries failed to settle", .0.failed.len(), .0.submitted)]
    PartialFailure(SyncReport),
}

impl SyncError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::TimedOut(_) => "Sync timed out, payments remain pending",
            Self::Ledger(e) => e.user_message(),
            Self::Wallet(e) => e.user_message(),
            Self::PartialFailure(_) => "Some offline payments could not be settled",
        }
    }
}

/// Proximity transport errors. Always surfaced as a failed payment attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("radio permissions not granted")]
    PermissionDenied,

    #[error("peer {0} not found")]
    PeerNotFound(String),

    #[error("connection to {0} failed")]
    ConnectFailed(String),

    /// Peer does not expose a writable characteristic for the payment service
    #[error("peer exposes no writable characteristic")]
    NoWritableCharacteristic,

    #[error("write failed: {0}")]
    WriteFailed(String),

    /// No peer discovered before the caller's deadline
    #[error("no peer found")]
    NoPeerFound,

    #[error("operation timed out")]
    TimedOut,

    /// A write is already in flight on this session
    #[error("another transfer is in progress")]
    Busy,

    #[error("payload codec error: {0}")]
    Codec(String),
}

impl TransportError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "Allow Bluetooth and location access to pay nearby",
            Self::PeerNotFound(_) | Self::NoPeerFound => "No nearby device found",
            Self::ConnectFailed(_) | Self::NoWritableCharacteristic => {
                "Could not connect to the nearby device"
            }
            Self::WriteFailed(_) | Self::Codec(_) => "Payment could not be sent",
            Self::TimedOut => "The nearby device did not respond",
            Self::Busy => "Another payment is in progress",
        }
    }
}

/// Errors from a proximity payment attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl PaymentError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Wallet(e) => e.user_message(),
            Self::Transport(e) => e.user_message(),
        }
    }
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Values that parse but cannot be used, e.g. an inverted range
    #[error("invalid config: {0}")]
    Invalid(String),
}
