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

//! Short-range byte transport.
//!
//! Transports move opaque payloads and nothing else. Timeouts, retries and
//! serializing concurrent writes are the caller's business.

use crate::error::TransportError;
use async_trait::async_trait;

/// A device seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub id: String,
    pub name: String,
    /// Service identifiers the peer advertises.
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// The radio can advertise a writable characteristic, so peers can
    /// write to it. Without it the device can only scan and write.
    pub supports_advertise: bool,
}

/// Called once per distinct peer found during a scan.
pub type OnFound = Box<dyn Fn(Peer) + Send + Sync>;

#[async_trait]
pub trait ProximityTransport: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    /// Whether scanning and writing are permitted on this device.
    async fn request_permissions(&self) -> bool;

    /// Starts discovery of peers advertising the payment service.
    ///
    /// Runs until [`ProximityTransport::stop_scan`]; a scan already running
    /// is replaced.
    async fn scan(&self, on_found: OnFound) -> Result<(), TransportError>;

    /// Stops discovery. Safe to call at any time, any number of times.
    async fn stop_scan(&self);

    /// Connects to `peer_id`, writes `payload` to its payment
    /// characteristic and disconnects. At most once, no retry.
    async fn connect_and_write(&self, peer_id: &str, payload: &[u8]) -> Result<(), TransportError>;

    /// Payloads peers wrote to this device since the last call.
    ///
    /// Always empty without [`Capabilities::supports_advertise`].
    async fn take_received(&self) -> Vec<Vec<u8>>;
}
