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

//! The wallet's view of the remote ledger.

use crate::api::{
    AccountSummary, CreateTransactionRequest, ErrorResponse, ReconcileRequest, ReconcileResponse,
};
use crate::base::AccountId;
use crate::engine::Engine;
use crate::error::LedgerError;
use crate::reconcile::{ReconcileOutcome, Submission};
use crate::transaction::{Direction, Settlement, TransactionStatus};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Ledger operations available to a signed-in wallet.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current bank balance of the signed-in account.
    async fn balance(&self) -> Result<Decimal, LedgerError>;

    async fn debit(
        &self,
        amount: Decimal,
        label: &str,
        remark: Option<String>,
    ) -> Result<Settlement, LedgerError>;

    /// Settled credit to the signed-in account.
    async fn credit(
        &self,
        amount: Decimal,
        label: &str,
        remark: Option<String>,
    ) -> Result<Settlement, LedgerError>;

    async fn reconcile(&self, entries: Vec<Submission>) -> Result<Vec<ReconcileOutcome>, LedgerError>;
}

/// Client bound to an in-process [`Engine`].
#[derive(Clone)]
pub struct LocalLedgerClient {
    engine: Arc<Engine>,
    account: AccountId,
}

impl LocalLedgerClient {
    pub fn new(engine: Arc<Engine>, account: AccountId) -> Self {
        Self { engine, account }
    }
}

#[async_trait]
impl LedgerClient for LocalLedgerClient {
    async fn balance(&self) -> Result<Decimal, LedgerError> {
        self.engine
            .get_account(&self.account)
            .map(|account| account.balance())
            .ok_or(LedgerError::AccountNotFound)
    }

    async fn debit(
        &self,
        amount: Decimal,
        label: &str,
        remark: Option<String>,
    ) -> Result<Settlement, LedgerError> {
        self.engine.debit(self.account, amount, label, remark)
    }

    async fn credit(
        &self,
        amount: Decimal,
        label: &str,
        remark: Option<String>,
    ) -> Result<Settlement, LedgerError> {
        self.engine
            .credit(self.account, amount, label, TransactionStatus::Success, remark)
    }

    async fn reconcile(&self, entries: Vec<Submission>) -> Result<Vec<ReconcileOutcome>, LedgerError> {
        self.engine.reconcile(self.account, entries)
    }
}

/// Client for the ledger's HTTP surface, authenticated by a bearer token.
#[derive(Clone)]
pub struct HttpLedgerClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpLedgerClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, token)
    }

    /// Uses a preconfigured client, e.g. one with a request timeout.
    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    async fn post_transaction(&self, body: CreateTransactionRequest) -> Result<Settlement, LedgerError> {
        let response = self
            .http
            .post(self.url("/transactions"))
            .header(AUTHORIZATION, self.bearer())
            .json(&body)
            .send()
            .await
            .map_err(unavailable)?;
        decode(response).await
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn balance(&self) -> Result<Decimal, LedgerError> {
        let response = self
            .http
            .get(self.url("/accounts/me"))
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await
            .map_err(unavailable)?;
        let summary: AccountSummary = decode(response).await?;
        Ok(summary.balance)
    }

    async fn debit(
        &self,
        amount: Decimal,
        label: &str,
        remark: Option<String>,
    ) -> Result<Settlement, LedgerError> {
        self.post_transaction(CreateTransactionRequest {
            amount,
            direction: Direction::Debit,
            to: Some(label.to_string()),
            status: None,
            remarks: remark,
            receiver_mobile: None,
        })
        .await
    }

    async fn credit(
        &self,
        amount: Decimal,
        label: &str,
        remark: Option<String>,
    ) -> Result<Settlement, LedgerError> {
        self.post_transaction(CreateTransactionRequest {
            amount,
            direction: Direction::Credit,
            to: Some(label.to_string()),
            status: Some(TransactionStatus::Success),
            remarks: remark,
            receiver_mobile: None,
        })
        .await
    }

    async fn reconcile(&self, entries: Vec<Submission>) -> Result<Vec<ReconcileOutcome>, LedgerError> {
        let response = self
            .http
            .post(self.url("/transactions/reconcile"))
            .header(AUTHORIZATION, self.bearer())
            .json(&ReconcileRequest { entries })
            .send()
            .await
            .map_err(unavailable)?;
        let body: ReconcileResponse = decode(response).await?;
        Ok(body.outcomes)
    }
}

fn unavailable(e: reqwest::Error) -> LedgerError {
    LedgerError::Unavailable(e.to_string())
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, LedgerError> {
    if response.status().is_success() {
        return response.json().await.map_err(unavailable);
    }
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(body) => Err(LedgerError::from_code(&body.code, &body.error)),
        Err(_) => Err(LedgerError::Unavailable(format!("unexpected status {status}"))),
    }
}
