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

//! Payment intent exchanged device to device.
//!
//! One JSON document per write:
//!
//! ```json
//! {"amount":"150.00","payerName":"Asha","payerUpiId":"asha@bank","note":"lunch","timestamp":1767225600000}
//! ```

use crate::error::TransportError;
use crate::wallet::ProfileSnapshot;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub amount: Decimal,
    pub payer_name: String,
    pub payer_upi_id: String,
    #[serde(default)]
    pub note: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl PaymentIntent {
    /// Intent signed with the payer's profile, or anonymous without one.
    pub fn new(amount: Decimal, payer: Option<&ProfileSnapshot>, note: Option<String>) -> Self {
        Self {
            amount,
            payer_name: payer.map(|p| p.display_name.clone()).unwrap_or_default(),
            payer_upi_id: payer.map(|p| p.upi_id.clone()).unwrap_or_default(),
            note,
            timestamp: Utc::now(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, TransportError> {
        serde_json::to_vec(self).map_err(|e| TransportError::Codec(e.to_string()))
    }

    pub fn decode(payload: &[u8]) -> Result<Self, TransportError> {
        serde_json::from_slice(payload).map_err(|e| TransportError::Codec(e.to_string()))
    }

    /// Label the payee journals the payment under.
    pub fn payer_label(&self) -> &str {
        if self.payer_name.is_empty() {
            &self.payer_upi_id
        } else {
            &self.payer_name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn wire_names_and_millisecond_timestamp() {
        let raw = br#"{"amount":"150.00","payerName":"Asha","payerUpiId":"asha@bank","note":"lunch","timestamp":1767225600000}"#;
        let intent = PaymentIntent::decode(raw).unwrap();
        assert_eq!(intent.amount, dec!(150.00));
        assert_eq!(intent.payer_label(), "Asha");
        assert_eq!(intent.timestamp.timestamp_millis(), 1_767_225_600_000);

        let json: serde_json::Value = serde_json::from_slice(&intent.encode().unwrap()).unwrap();
        assert_eq!(json["payerUpiId"], "asha@bank");
        assert_eq!(json["timestamp"], 1_767_225_600_000_i64);
    }

    #[test]
    fn garbage_is_a_codec_error() {
        assert!(matches!(
            PaymentIntent::decode(b"\x00\x01"),
            Err(TransportError::Codec(_))
        ));
    }

    #[test]
    fn anonymous_intent_falls_back_to_upi_id() {
        let mut intent = PaymentIntent::new(dec!(5), None, None);
        assert_eq!(intent.payer_label(), "");
        intent.payer_upi_id = "x@bank".into();
        assert_eq!(intent.payer_label(), "x@bank");
    }
}
