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

//! Nearby payments over a [`ProximityTransport`], settled in a wallet.
//!
//! # Receiving
//!
//! With [`Capabilities::supports_advertise`] the payee exposes a writable
//! characteristic and [`ProximityPayments::receive`] decodes every intent
//! written to it. Without it, nothing can be written to this device; the
//! payee scans instead and every peer found is reported as
//! [`Incoming::Signal`]. A signal carries no amount and moves no funds.
//!
//! [`Capabilities::supports_advertise`]: crate::proximity::Capabilities::supports_advertise

use crate::config::ProximityConfig;
use crate::error::{PaymentError, TransportError, WalletError};
use crate::proximity::intent::PaymentIntent;
use crate::proximity::transport::{Peer, ProximityTransport};
use crate::wallet::{JournalEntry, LedgerClient, WalletContext, WalletStore};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// One thing [`ProximityPayments::receive`] picked up.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// A written intent, credited to the wallet.
    Credited {
        intent: PaymentIntent,
        entry: JournalEntry,
    },
    /// A written intent the wallet refused, e.g. over the balance cap.
    Rejected {
        intent: PaymentIntent,
        reason: WalletError,
    },
    /// A payload that is not a payment intent.
    Unreadable(TransportError),
    /// A peer found by scanning, on a device that cannot be written to.
    Signal(Peer),
}

/// Clears the in-flight flag when a payment attempt ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct ProximityPayments<T, S, C> {
    transport: T,
    wallet: Arc<WalletContext<S, C>>,
    config: ProximityConfig,
    in_flight: AtomicBool,
}

impl<T, S, C> ProximityPayments<T, S, C>
where
    T: ProximityTransport,
    S: WalletStore,
    C: LedgerClient,
{
    pub fn new(transport: T, wallet: Arc<WalletContext<S, C>>, config: ProximityConfig) -> Self {
        Self {
            transport,
            wallet,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn wallet(&self) -> &Arc<WalletContext<S, C>> {
        &self.wallet
    }

    /// First peer advertising the payment service within the scan timeout.
    ///
    /// The scan is stopped on every path out.
    pub async fn discover(&self) -> Result<Peer, TransportError> {
        if !self.transport.request_permissions().await {
            return Err(TransportError::PermissionDenied);
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        self.transport
            .scan(Box::new(move |peer| {
                let _ = tx.send(peer);
            }))
            .await?;

        let found = tokio::time::timeout(self.config.scan_timeout(), rx.recv()).await;
        self.transport.stop_scan().await;

        match found {
            Ok(Some(peer)) => Ok(peer),
            Ok(None) | Err(_) => Err(TransportError::NoPeerFound),
        }
    }

    /// Pays `amount` to `peer` from the wallet.
    ///
    /// The amount is reserved and journaled as a pending send before the
    /// intent is written, so a concurrent spend cannot use the same funds.
    /// A failed or timed-out write fails that entry and returns the
    /// reservation. One payment at a time per session.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Busy`] - Another payment is in flight.
    /// - [`TransportError::PermissionDenied`] - Radio permissions missing.
    /// - [`TransportError::TimedOut`] - The write did not finish in time.
    /// - Any [`WalletError`] from the spending checks.
    pub async fn pay(
        &self,
        peer: &Peer,
        amount: Decimal,
        note: Option<String>,
    ) -> Result<JournalEntry, PaymentError> {
        let result = self.attempt_payment(peer, amount, note).await;
        match &result {
            Ok(entry) => info!(peer = %peer.id, %amount, entry = %entry.id, "nearby payment sent"),
            Err(e) => warn!(peer = %peer.id, %amount, reason = %e, "nearby payment failed"),
        }
        result
    }

    async fn attempt_payment(
        &self,
        peer: &Peer,
        amount: Decimal,
        note: Option<String>,
    ) -> Result<JournalEntry, PaymentError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(TransportError::Busy.into());
        }
        let _guard = InFlight(&self.in_flight);

        self.wallet.check_send(amount)?;
        if !self.transport.request_permissions().await {
            return Err(TransportError::PermissionDenied.into());
        }

        let intent = PaymentIntent::new(amount, self.wallet.profile().as_ref(), note.clone());
        let payload = intent.encode()?;
        let entry = self.wallet.reserve_send(amount, &peer.name, note)?;

        let written = tokio::time::timeout(
            self.config.write_timeout(),
            self.transport.connect_and_write(&peer.id, &payload),
        )
        .await
        .map_err(|_| TransportError::TimedOut)
        .and_then(|written| written);
        if let Err(e) = written {
            if let Err(undo) = self.wallet.void_send(entry.id, &e.to_string()) {
                warn!(entry = %entry.id, reason = %undo, "undelivered payment could not be voided");
            }
            return Err(e.into());
        }
        Ok(entry)
    }

    /// Collects incoming payments; see the module docs for the two modes.
    pub async fn receive(&self) -> Result<Vec<Incoming>, TransportError> {
        if !self.transport.capabilities().supports_advertise {
            return match self.discover().await {
                Ok(peer) => Ok(vec![Incoming::Signal(peer)]),
                Err(TransportError::NoPeerFound) => Ok(Vec::new()),
                Err(e) => Err(e),
            };
        }

        let incoming = self
            .transport
            .take_received()
            .await
            .into_iter()
            .map(|payload| self.credit(&payload))
            .collect();
        Ok(incoming)
    }

    fn credit(&self, payload: &[u8]) -> Incoming {
        let intent = match PaymentIntent::decode(payload) {
            Ok(intent) => intent,
            Err(e) => {
                warn!(bytes = payload.len(), reason = %e, "unreadable payload dropped");
                return Incoming::Unreadable(e);
            }
        };
        match self
            .wallet
            .receive(intent.amount, intent.payer_label(), intent.note.clone())
        {
            Ok(entry) => Incoming::Credited { intent, entry },
            Err(reason) => Incoming::Rejected { intent, reason },
        }
    }
}
