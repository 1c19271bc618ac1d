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

//! Settlement API server.
//!
//! Run with: `cargo run --example server [config.json]`
//!
//! Opens two demo accounts and prints a bearer token for each, plus an
//! admin token for approvals.
//!
//! # Example requests
//!
//! ```bash
//! # Load money into the account (settled)
//! curl -X POST http://localhost:3000/transactions \
//!   -H "Authorization: Bearer $ASHA" -H "Content-Type: application/json" \
//!   -d '{"type": "credit", "amount": "1000.00", "to": "HDFC NEFT"}'
//!
//! # Pay another account by mobile number
//! curl -X POST http://localhost:3000/transactions \
//!   -H "Authorization: Bearer $ASHA" -H "Content-Type: application/json" \
//!   -d '{"type": "debit", "amount": "250.00", "receiverMobile": "9000000002", "remarks": "rent"}'
//!
//! # Pending credit, then approve it as admin
//! curl -X POST http://localhost:3000/transactions \
//!   -H "Authorization: Bearer $ASHA" -H "Content-Type: application/json" \
//!   -d '{"type": "credit", "amount": "500.00", "status": "Pending"}'
//! curl -X PUT http://localhost:3000/transactions/4/status \
//!   -H "Authorization: Bearer $ADMIN" -H "Content-Type: application/json" \
//!   -d '{"status": "Success"}'
//!
//! # History and balance
//! curl -H "Authorization: Bearer $ASHA" "http://localhost:3000/transactions?limit=5"
//! curl -H "Authorization: Bearer $ASHA" http://localhost:3000/accounts/me
//! ```

use settle_rs::api::{self, AppState, Role};
use settle_rs::config::Config;
use settle_rs::logging::{LogFormat, init_logging};
use settle_rs::{AccountProfile, Engine};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    init_logging("info", LogFormat::Pretty);

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_path(path).unwrap(),
        None => Config::default(),
    };
    let engine = Arc::new(Engine::builder().config(config.ledger).unwrap().build());
    let state = AppState::new(engine.clone());

    let asha = engine
        .open_account(AccountProfile::new("Asha", "9000000001", "ACC1001"))
        .unwrap();
    let ravi = engine
        .open_account(AccountProfile::new("Ravi", "9000000002", "ACC1002").referred_by(asha))
        .unwrap();

    let app = api::router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:3000").await.unwrap();
    println!("Settlement API server running on http://127.0.0.1:3000");
    println!();
    println!("Tokens:");
    println!("  ASHA={}", state.sessions.issue(asha, Role::User));
    println!("  RAVI={}", state.sessions.issue(ravi, Role::User));
    println!("  ADMIN={}", state.sessions.issue(asha, Role::Admin));
    println!();
    println!("Endpoints:");
    println!("  POST /transactions              - Credit, debit or transfer");
    println!("  GET  /transactions?limit=N      - Recent history");
    println!("  PUT  /transactions/:id/status   - Approve or reject (admin)");
    println!("  POST /transactions/reconcile    - Submit offline wallet entries");
    println!("  GET  /accounts/me               - Balance and points");

    axum::serve(listener, app).await.unwrap();
}
