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

//! Integration tests for the HTTP surface, driven by `reqwest` and by the
//! wallet's own HTTP client.

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use settle_rs::api::{self, AccountSummary, AppState, ErrorResponse, Role};
use settle_rs::config::Config;
use settle_rs::wallet::{
    EntryStatus, HttpLedgerClient, LedgerClient, MemoryStore, WalletContext,
};
use settle_rs::{
    AccountId, AccountProfile, Engine, LedgerError, NoRewards, Settlement, Transaction,
    TransactionStatus, WalletError,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

/// Test server that binds to an ephemeral port.
struct TestServer {
    base_url: String,
    engine: Arc<Engine>,
    state: AppState,
}

impl TestServer {
    async fn new() -> Self {
        let engine = Arc::new(Engine::builder().reward_policy(NoRewards).build());
        let state = AppState::new(engine.clone());

        let app = api::router(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Any answer, even 401, means the server is up
        let client = Client::new();
        let ready_url = format!("{}/accounts/me", base_url);
        for _ in 0..50 {
            match client.get(&ready_url).send().await {
                Ok(_) => break,
                Err(_) => tokio::time::sleep(tokio::time::Duration::from_millis(50)).await,
            }
        }

        TestServer {
            base_url,
            engine,
            state,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Opens an account funded with `funds` and signs it in.
    fn user(&self, name: &str, mobile: &str, number: &str, funds: Decimal) -> (AccountId, String) {
        let account = self
            .engine
            .open_account(AccountProfile::new(name, mobile, number))
            .unwrap();
        if funds > Decimal::ZERO {
            self.engine
                .credit(account, funds, "Bank transfer", TransactionStatus::Success, None)
                .unwrap();
        }
        (account, self.state.sessions.issue(account, Role::User))
    }

    fn admin(&self, account: AccountId) -> String {
        self.state.sessions.issue(account, Role::Admin)
    }

    fn balance(&self, account: AccountId) -> Decimal {
        self.engine.get_account(&account).unwrap().balance()
    }
}

// === Functional ===

#[tokio::test]
async fn requests_without_a_session_are_unauthorized() {
    let server = TestServer::new().await;
    let client = Client::new();

    let response = client.get(server.url("/accounts/me")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(server.url("/transactions"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn revoked_token_stops_working() {
    let server = TestServer::new().await;
    let (_, token) = server.user("Asha", "900", "ACC1", dec!(0));
    let client = Client::new();

    let ok = client
        .get(server.url("/accounts/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    server.state.sessions.revoke(&token);
    let gone = client
        .get(server.url("/accounts/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn transfer_by_mobile_and_account_summary() {
    let server = TestServer::new().await;
    let (asha, token) = server.user("Asha", "900", "ACC1", dec!(100));
    let (ravi, _) = server.user("Ravi", "901", "ACC2", dec!(0));
    let client = Client::new();

    let response = client
        .post(server.url("/transactions"))
        .bearer_auth(&token)
        .json(&json!({"type": "debit", "amount": "40", "receiverMobile": "901", "remarks": "rent"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let settlement: Settlement = response.json().await.unwrap();
    assert_eq!(settlement.new_balance, dec!(60));
    assert_eq!(settlement.transaction.remark.as_deref(), Some("rent"));

    let summary: AccountSummary = client
        .get(server.url("/accounts/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary.account, asha);
    assert_eq!(summary.number, "ACC1");
    assert_eq!(summary.balance, dec!(60));
    assert_eq!(server.balance(ravi), dec!(40));
}

#[tokio::test]
async fn errors_carry_status_and_code() {
    let server = TestServer::new().await;
    let (_, token) = server.user("Asha", "900", "ACC1", dec!(100));
    let client = Client::new();

    let response = client
        .post(server.url("/transactions"))
        .bearer_auth(&token)
        .json(&json!({"type": "debit", "amount": "150", "to": "Grocer"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.code, "INSUFFICIENT_FUNDS");

    let response = client
        .post(server.url("/transactions"))
        .bearer_auth(&token)
        .json(&json!({"type": "debit", "amount": "10", "receiverMobile": "999"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.code, "RECIPIENT_NOT_FOUND");

    let response = client
        .post(server.url("/transactions"))
        .bearer_auth(&token)
        .json(&json!({"type": "debit", "amount": "-5"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(server.balance(AccountId(1)), dec!(100));
}

#[tokio::test]
async fn only_admins_approve() {
    let server = TestServer::new().await;
    let (asha, token) = server.user("Asha", "900", "ACC1", dec!(0));
    let admin = server.admin(asha);
    let client = Client::new();

    let pending: Settlement = client
        .post(server.url("/transactions"))
        .bearer_auth(&token)
        .json(&json!({"type": "credit", "amount": "500", "to": "HDFC NEFT", "status": "Pending"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(pending.new_balance, dec!(0));
    let path = format!("/transactions/{}/status", pending.transaction.id.0);

    let forbidden = client
        .put(server.url(&path))
        .bearer_auth(&token)
        .json(&json!({"status": "Success"}))
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let approved = client
        .put(server.url(&path))
        .bearer_auth(&admin)
        .json(&json!({"status": "Success"}))
        .send()
        .await
        .unwrap();
    assert_eq!(approved.status(), StatusCode::OK);
    assert_eq!(server.balance(asha), dec!(500));

    let again = client
        .put(server.url(&path))
        .bearer_auth(&admin)
        .json(&json!({"status": "Failed", "rejectionReason": "late"}))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = again.json().await.unwrap();
    assert_eq!(body.code, "INVALID_STATE");

    let missing = client
        .put(server.url("/transactions/99999/status"))
        .bearer_auth(&admin)
        .json(&json!({"status": "Success"}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn history_is_newest_first_and_limited() {
    let server = TestServer::new().await;
    let (_, token) = server.user("Asha", "900", "ACC1", dec!(0));
    let client = Client::new();

    for i in 1..=30 {
        let response = client
            .post(server.url("/transactions"))
            .bearer_auth(&token)
            .json(&json!({"type": "credit", "amount": i.to_string()}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let default_page: Vec<Transaction> = client
        .get(server.url("/transactions"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(default_page.len(), 20);
    assert_eq!(default_page[0].amount, dec!(30));

    let short: Vec<Transaction> = client
        .get(server.url("/transactions?limit=3"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let amounts: Vec<Decimal> = short.iter().map(|t| t.amount).collect();
    assert_eq!(amounts, vec![dec!(30), dec!(29), dec!(28)]);
}

// === Wallet over HTTP ===

#[tokio::test]
async fn wallet_loads_and_syncs_over_http() {
    let server = TestServer::new().await;
    let (asha, token) = server.user("Asha", "900", "ACC1", dec!(3000));
    let client = HttpLedgerClient::new(server.base_url.clone(), token);
    let wallet = WalletContext::open(MemoryStore::new(), client, &Config::default()).unwrap();
    wallet.set_online(true);

    wallet.load_cash(dec!(1000)).await.unwrap();
    assert_eq!(server.balance(asha), dec!(2000));
    assert_eq!(wallet.remote_balance().balance, dec!(2000));

    wallet.set_online(false);
    let sent = wallet.send(dec!(300), "payeeX", None).unwrap();
    wallet.set_online(true);
    let report = wallet.sync().await.unwrap();

    assert_eq!(report.settled, vec![sent.id]);
    assert_eq!(wallet.journal().last().unwrap().status, EntryStatus::Settled);
    assert_eq!(wallet.wallet().balance, dec!(700));
    assert_eq!(server.engine.settlement_register().settled_count(asha), 1);
    assert_eq!(server.balance(asha), dec!(2000));
}

#[tokio::test]
async fn bank_refusal_maps_to_wallet_error() {
    let server = TestServer::new().await;
    let (_, token) = server.user("Asha", "900", "ACC1", dec!(50));
    let wallet = WalletContext::open(
        MemoryStore::new(),
        HttpLedgerClient::new(server.base_url.clone(), token),
        &Config::default(),
    )
    .unwrap();
    wallet.set_online(true);

    assert_eq!(
        wallet.load_cash(dec!(100)).await,
        Err(WalletError::InsufficientBankBalance)
    );
    assert_eq!(wallet.wallet().balance, dec!(0));
}

#[tokio::test]
async fn unreachable_ledger_is_unavailable() {
    let client = HttpLedgerClient::new("http://127.0.0.1:1", "token");
    assert!(matches!(
        client.balance().await,
        Err(LedgerError::Unavailable(_))
    ));
}

// === Concurrency ===
// These tests are ignored in CI due to connection issues on some platforms.
// Run manually with: cargo test --test server_test -- --ignored

/// Concurrent credits to one account must all land.
#[tokio::test]
#[ignore = "requires running server, may fail in CI"]
async fn concurrent_credits_single_account() {
    let server = TestServer::new().await;
    let (asha, token) = server.user("Asha", "900", "ACC1", dec!(0));
    let client = Client::new();

    const NUM_CREDITS: usize = 1000;
    const BATCH_SIZE: usize = 100;
    let start = Instant::now();
    let mut successful = 0usize;

    for _ in 0..NUM_CREDITS / BATCH_SIZE {
        let handles: Vec<_> = (0..BATCH_SIZE)
            .map(|_| {
                let client = client.clone();
                let url = server.url("/transactions");
                let token = token.clone();
                tokio::spawn(async move {
                    client
                        .post(&url)
                        .bearer_auth(token)
                        .json(&json!({"type": "credit", "amount": "1.50"}))
                        .send()
                        .await
                        .unwrap()
                        .status()
                })
            })
            .collect();
        successful += futures::future::join_all(handles)
            .await
            .iter()
            .filter(|r| r.as_ref().unwrap().is_success())
            .count();
    }

    let elapsed = start.elapsed();
    println!(
        "Processed {} requests in {:?} ({:.0} req/s)",
        NUM_CREDITS,
        elapsed,
        NUM_CREDITS as f64 / elapsed.as_secs_f64()
    );

    assert_eq!(successful, NUM_CREDITS);
    assert_eq!(server.balance(asha), dec!(1.50) * Decimal::from(NUM_CREDITS));
    let account = server.engine.get_account(&asha).unwrap();
    assert_eq!(account.ledger_balance(), account.balance());
}

/// Opposite transfers between two accounts must conserve the total.
#[tokio::test]
#[ignore = "requires running server, may fail in CI"]
async fn concurrent_opposite_transfers_conserve_money() {
    let server = TestServer::new().await;
    let (asha, asha_token) = server.user("Asha", "900", "ACC1", dec!(1000));
    let (ravi, ravi_token) = server.user("Ravi", "901", "ACC2", dec!(1000));
    let client = Client::new();

    let handles: Vec<_> = (0..400)
        .map(|i| {
            let client = client.clone();
            let url = server.url("/transactions");
            let (token, mobile) = if i % 2 == 0 {
                (asha_token.clone(), "901")
            } else {
                (ravi_token.clone(), "900")
            };
            tokio::spawn(async move {
                client
                    .post(&url)
                    .bearer_auth(token)
                    .json(&json!({"type": "debit", "amount": "7", "receiverMobile": mobile}))
                    .send()
                    .await
                    .unwrap()
                    .status()
            })
        })
        .collect();

    let statuses = futures::future::join_all(handles).await;
    for status in statuses {
        let status = status.unwrap();
        assert!(
            status == StatusCode::CREATED || status == StatusCode::BAD_REQUEST,
            "unexpected status {status}"
        );
    }

    assert_eq!(server.balance(asha) + server.balance(ravi), dec!(2000));
}
