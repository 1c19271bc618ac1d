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

//! Reward policies.
//!
//! The engine asks the policy what a successful transaction earns, given the
//! account's running count of `Success` records (the new one included). The
//! engine applies the answer inside the same unit of work, so a retried or
//! replayed operation can never earn twice.

use crate::config::LedgerConfig;
use crate::error::ConfigError;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// What one successful transaction earned.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reward {
    pub points: u64,
    /// Bonus credited to the balance as a separate `Success` credit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cashback: Option<Decimal>,
}

pub trait RewardPolicy: Send + Sync {
    fn evaluate(&self, success_count: usize) -> Reward;
}

/// Random points on every success, random cashback on every `interval`-th.
#[derive(Debug, Clone)]
pub struct IntervalRewardPolicy {
    interval: usize,
    points: RangeInclusive<u64>,
    cashback: RangeInclusive<i64>,
}

impl IntervalRewardPolicy {
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] when a range is empty or cashback can be
    /// less than one unit.
    pub fn new(
        interval: usize,
        points: RangeInclusive<u64>,
        cashback: RangeInclusive<i64>,
    ) -> Result<Self, ConfigError> {
        if points.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "points range {}..={} is empty",
                points.start(),
                points.end()
            )));
        }
        if cashback.is_empty() || *cashback.start() < 1 {
            return Err(ConfigError::Invalid(format!(
                "cashback range {}..={} must be non-empty and start at 1 or more",
                cashback.start(),
                cashback.end()
            )));
        }
        Ok(Self {
            interval: interval.max(1),
            points,
            cashback,
        })
    }

    pub fn from_config(config: &LedgerConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.reward_interval,
            config.points_min..=config.points_max,
            config.cashback_min..=config.cashback_max,
        )
    }

    pub fn interval(&self) -> usize {
        self.interval
    }
}

impl Default for IntervalRewardPolicy {
    fn default() -> Self {
        Self {
            interval: 5,
            points: 1..=10,
            cashback: 1..=10,
        }
    }
}

impl RewardPolicy for IntervalRewardPolicy {
    fn evaluate(&self, success_count: usize) -> Reward {
        let mut rng = rand::thread_rng();
        let points = rng.gen_range(self.points.clone());
        let cashback = (success_count > 0 && success_count % self.interval == 0)
            .then(|| Decimal::from(rng.gen_range(self.cashback.clone())));
        Reward { points, cashback }
    }
}

/// Earns nothing. Keeps balances exact in replays and benchmarks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRewards;

impl RewardPolicy for NoRewards {
    fn evaluate(&self, _success_count: usize) -> Reward {
        Reward::default()
    }
}
