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

//! Offline wallet and sync queue.

mod client;
mod context;
mod model;
mod store;
mod sync;

pub use client::{HttpLedgerClient, LedgerClient, LocalLedgerClient};
pub use context::{BANK_LABEL, WalletContext, WalletState};
pub use model::{
    EntryKind, EntryStatus, JournalEntry, Limits, OfflineWallet, ProfileSnapshot, RemoteBalance,
};
pub use store::{
    FileStore, JOURNAL_KEY, MemoryStore, PROFILE_KEY, REMOTE_BALANCE_KEY, WALLET_KEY, WalletStore,
};
pub use sync::{Compensation, FailedEntry, SyncBatch, SyncReport};
