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

//! In-process radio.
//!
//! Every [`SimulatedRadio`] registers a station on a shared [`Air`]. A radio
//! with advertise support exposes a writable characteristic under its
//! service id; one without is invisible to scans and cannot be written to.

use crate::config::PAYMENT_SERVICE_UUID;
use crate::error::TransportError;
use crate::proximity::transport::{Capabilities, OnFound, Peer, ProximityTransport};
use async_trait::async_trait;
use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Clone)]
struct Station {
    name: String,
    services: Vec<String>,
    reachable: bool,
    latency: Duration,
    inbox: Arc<SegQueue<Vec<u8>>>,
}

/// Shared medium the simulated radios see each other through.
#[derive(Default)]
pub struct Air {
    stations: DashMap<String, Station>,
}

impl Air {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes `id` refuse connections until set reachable again.
    pub fn set_reachable(&self, id: &str, reachable: bool) {
        if let Some(mut station) = self.stations.get_mut(id) {
            station.reachable = reachable;
        }
    }

    /// Delays every write to `id` by `latency`.
    pub fn set_latency(&self, id: &str, latency: Duration) {
        if let Some(mut station) = self.stations.get_mut(id) {
            station.latency = latency;
        }
    }

    fn advertising(&self, except: &str, service: &str) -> Vec<Peer> {
        self.stations
            .iter()
            .filter(|entry| entry.key() != except)
            .filter(|entry| entry.value().services.iter().any(|s| s == service))
            .map(|entry| Peer {
                id: entry.key().clone(),
                name: entry.value().name.clone(),
                services: entry.value().services.clone(),
            })
            .collect()
    }

    fn station(&self, id: &str) -> Option<Station> {
        self.stations.get(id).map(|entry| entry.value().clone())
    }
}

pub struct SimulatedRadio {
    id: String,
    air: Arc<Air>,
    service: String,
    capabilities: Capabilities,
    permitted: AtomicBool,
    poll_interval: Duration,
    inbox: Arc<SegQueue<Vec<u8>>>,
    scan: Mutex<Option<JoinHandle<()>>>,
}

impl SimulatedRadio {
    pub fn new(
        air: Arc<Air>,
        id: impl Into<String>,
        name: impl Into<String>,
        capabilities: Capabilities,
    ) -> Self {
        Self::with_service(air, id, name, capabilities, PAYMENT_SERVICE_UUID)
    }

    pub fn with_service(
        air: Arc<Air>,
        id: impl Into<String>,
        name: impl Into<String>,
        capabilities: Capabilities,
        service: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let service = service.into();
        let inbox = Arc::new(SegQueue::new());
        let services = if capabilities.supports_advertise {
            vec![service.clone()]
        } else {
            Vec::new()
        };
        air.stations.insert(
            id.clone(),
            Station {
                name: name.into(),
                services,
                reachable: true,
                latency: Duration::ZERO,
                inbox: Arc::clone(&inbox),
            },
        );

        Self {
            id,
            air,
            service,
            capabilities,
            permitted: AtomicBool::new(true),
            poll_interval: Duration::from_millis(20),
            inbox,
            scan: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Grants or revokes the radio permissions.
    pub fn set_permitted(&self, permitted: bool) {
        self.permitted.store(permitted, Ordering::SeqCst);
    }

    pub fn is_scanning(&self) -> bool {
        self.scan
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn require_permission(&self) -> Result<(), TransportError> {
        if self.permitted.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::PermissionDenied)
        }
    }

    fn abort_scan(&self) {
        if let Some(handle) = self.scan.lock().take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl ProximityTransport for SimulatedRadio {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn request_permissions(&self) -> bool {
        self.permitted.load(Ordering::SeqCst)
    }

    async fn scan(&self, on_found: OnFound) -> Result<(), TransportError> {
        self.require_permission()?;
        self.abort_scan();

        let air = Arc::clone(&self.air);
        let me = self.id.clone();
        let service = self.service.clone();
        let interval = self.poll_interval;
        let handle = tokio::spawn(async move {
            let mut seen = HashSet::new();
            loop {
                for peer in air.advertising(&me, &service) {
                    if seen.insert(peer.id.clone()) {
                        debug!(scanner = %me, peer = %peer.id, "peer discovered");
                        on_found(peer);
                    }
                }
                tokio::time::sleep(interval).await;
            }
        });
        *self.scan.lock() = Some(handle);
        Ok(())
    }

    async fn stop_scan(&self) {
        self.abort_scan();
    }

    async fn connect_and_write(&self, peer_id: &str, payload: &[u8]) -> Result<(), TransportError> {
        self.require_permission()?;
        let station = self
            .air
            .station(peer_id)
            .ok_or_else(|| TransportError::PeerNotFound(peer_id.to_string()))?;
        if !station.reachable {
            return Err(TransportError::ConnectFailed(peer_id.to_string()));
        }
        if !station.services.iter().any(|s| *s == self.service) {
            return Err(TransportError::NoWritableCharacteristic);
        }

        if !station.latency.is_zero() {
            tokio::time::sleep(station.latency).await;
        }
        station.inbox.push(payload.to_vec());
        debug!(from = %self.id, to = %peer_id, bytes = payload.len(), "payload written");
        Ok(())
    }

    async fn take_received(&self) -> Vec<Vec<u8>> {
        if !self.capabilities.supports_advertise {
            return Vec::new();
        }
        std::iter::from_fn(|| self.inbox.pop()).collect()
    }
}

impl Drop for SimulatedRadio {
    fn drop(&mut self) {
        self.abort_scan();
        self.air.stations.remove(&self.id);
    }
}
