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

//! Notifications produced by ledger operations.
//!
//! Notifications are written as part of the unit of work that produced them:
//! the sink receives the whole batch before any balance is touched, and a
//! refusal aborts the operation.

use crate::base::AccountId;
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use crossbeam::queue::SegQueue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub account: AccountId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(account: AccountId, message: impl Into<String>) -> Self {
        Self {
            account,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn deliver(&self, batch: &[Notification]) -> Result<(), LedgerError>;
}

/// In-memory outbox, drained by whatever pushes notifications to devices.
#[derive(Debug, Default)]
pub struct Outbox {
    queue: SegQueue<Notification>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Removes and returns everything queued so far, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        std::iter::from_fn(|| self.queue.pop()).collect()
    }
}

impl NotificationSink for Outbox {
    fn deliver(&self, batch: &[Notification]) -> Result<(), LedgerError> {
        for notification in batch {
            self.queue.push(notification.clone());
        }
        Ok(())
    }
}
