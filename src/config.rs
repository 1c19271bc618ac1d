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

//! Runtime configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! overrides:
//!
//! ```json
//! { "wallet": { "max_balance": "5000" }, "sync": { "timeout_ms": 3000 } }
//! ```

use crate::error::ConfigError;
use crate::reward::IntervalRewardPolicy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Service identifier the payee device exposes its writable characteristic under.
pub const PAYMENT_SERVICE_UUID: &str = "0000feed-0000-1000-8000-00805f9b34fb";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub ledger: LedgerConfig,
    pub wallet: WalletConfig,
    pub sync: SyncConfig,
    pub proximity: ProximityConfig,
}

impl Config {
    /// Reads and validates a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values serde cannot: reward ranges must be samplable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        IntervalRewardPolicy::from_config(&self.ledger).map(|_| ())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedgerConfig {
    /// Every n-th `Success` transaction of an account earns cashback.
    pub reward_interval: usize,
    pub points_min: u64,
    pub points_max: u64,
    /// Cashback bounds, in whole currency units.
    pub cashback_min: i64,
    pub cashback_max: i64,
    /// Default page size of the history listing.
    pub history_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            reward_interval: 5,
            points_min: 1,
            points_max: 10,
            cashback_min: 1,
            cashback_max: 10,
            history_limit: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WalletConfig {
    pub max_balance: Decimal,
    pub max_per_transaction: Decimal,
    pub daily_limit: Decimal,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            max_balance: dec!(2000),
            max_per_transaction: dec!(500),
            daily_limit: dec!(2000),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    pub timeout_ms: u64,
}

impl SyncConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProximityConfig {
    pub service_uuid: String,
    pub scan_timeout_ms: u64,
    pub write_timeout_ms: u64,
}

impl ProximityConfig {
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            service_uuid: PAYMENT_SERVICE_UUID.to_string(),
            scan_timeout_ms: 10_000,
            write_timeout_ms: 5_000,
        }
    }
}
