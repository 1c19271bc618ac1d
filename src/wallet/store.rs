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

//! Local durable key-value storage for the wallet.
//!
//! Four named records, each a self-contained JSON document rewritten in
//! full on every mutation:
//!
//! | Key              | Document              |
//! |------------------|-----------------------|
//! | `profile`        | `ProfileSnapshot`     |
//! | `remote_balance` | `RemoteBalance`       |
//! | `offline_wallet` | `OfflineWallet`       |
//! | `journal`        | `Vec<JournalEntry>`   |

use crate::error::WalletError;
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

pub const PROFILE_KEY: &str = "profile";
pub const REMOTE_BALANCE_KEY: &str = "remote_balance";
pub const WALLET_KEY: &str = "offline_wallet";
pub const JOURNAL_KEY: &str = "journal";

pub trait WalletStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, WalletError>;

    /// Replaces the whole document stored under `key`.
    fn write(&self, key: &str, document: &str) -> Result<(), WalletError>;
}

impl<T: WalletStore + ?Sized> WalletStore for Arc<T> {
    fn read(&self, key: &str) -> Result<Option<String>, WalletError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, document: &str) -> Result<(), WalletError> {
        (**self).write(key, document)
    }
}

pub(crate) fn load<T: DeserializeOwned>(
    store: &impl WalletStore,
    key: &str,
) -> Result<Option<T>, WalletError> {
    store
        .read(key)?
        .map(|raw| {
            serde_json::from_str(&raw)
                .map_err(|e| WalletError::Storage(format!("corrupt {key} record: {e}")))
        })
        .transpose()
}

pub(crate) fn save<T: Serialize>(
    store: &impl WalletStore,
    key: &str,
    value: &T,
) -> Result<(), WalletError> {
    let document = serde_json::to_string(value)
        .map_err(|e| WalletError::Storage(format!("cannot encode {key}: {e}")))?;
    store.write(key, &document)
}

/// Volatile store, for tests and for devices without durable storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WalletStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, WalletError> {
        Ok(self.records.get(key).map(|doc| doc.value().clone()))
    }

    fn write(&self, key: &str, document: &str) -> Result<(), WalletError> {
        self.records.insert(key.to_string(), document.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per record under a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash leaves either the old or the new document, never half of one.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, WalletError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(storage_error)?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl WalletStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, WalletError> {
        match fs::read_to_string(self.path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error(e)),
        }
    }

    fn write(&self, key: &str, document: &str) -> Result<(), WalletError> {
        let target = self.path(key);
        let staging = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&staging, document).map_err(storage_error)?;
        fs::rename(&staging, &target).map_err(storage_error)
    }
}

fn storage_error(e: io::Error) -> WalletError {
    WalletError::Storage(e.to_string())
}
