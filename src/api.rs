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

//! HTTP surface of the ledger engine.
//!
//! ## Endpoints
//!
//! - `POST /transactions` - Credit, debit or transfer for the caller
//! - `GET /transactions` - Caller's most recent records, newest first
//! - `PUT /transactions/{id}/status` - Approve or reject a pending credit (admin)
//! - `POST /transactions/reconcile` - Settle queued offline journal entries
//! - `GET /accounts/me` - Caller's balance snapshot
//!
//! Every request carries `Authorization: Bearer <token>`; tokens are issued by
//! the login flow through [`Sessions::issue`].
//!
//! ## Example Usage
//!
//! ```bash
//! # Transfer to a mobile number
//! curl -X POST http://localhost:3000/transactions \
//!   -H "Authorization: Bearer $TOKEN" -H "Content-Type: application/json" \
//!   -d '{"type": "debit", "amount": "250.00", "receiverMobile": "9000000002"}'
//!
//! # Approve a pending bank-transfer credit
//! curl -X PUT http://localhost:3000/transactions/7/status \
//!   -H "Authorization: Bearer $ADMIN" -H "Content-Type: application/json" \
//!   -d '{"status": "Success"}'
//! ```

use crate::base::{AccountId, TransactionId};
use crate::engine::{Engine, RecipientLookup};
use crate::error::LedgerError;
use crate::reconcile::{ReconcileOutcome, Submission};
use crate::transaction::{Direction, Settlement, Transaction, TransactionStatus};
use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, Query, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Label of credits that do not name a source.
pub const DEFAULT_CREDIT_LABEL: &str = "Bank transfer";
/// Label of debits that do not name a payee.
pub const DEFAULT_DEBIT_LABEL: &str = "Payment";

// === Sessions ===

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub account: AccountId,
    pub role: Role,
}

/// Bearer token → session map.
#[derive(Debug, Default)]
pub struct Sessions {
    tokens: DashMap<String, Session>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues an opaque token for an authenticated account.
    pub fn issue(&self, account: AccountId, role: Role) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), Session { account, role });
        token
    }

    pub fn revoke(&self, token: &str) {
        self.tokens.remove(token);
    }

    pub fn get(&self, token: &str) -> Option<Session> {
        self.tokens.get(token).map(|session| *session.value())
    }
}

// === Request/Response DTOs ===

/// Request body of `POST /transactions`.
///
/// ```json
/// {"type": "credit", "amount": "500.00", "to": "HDFC NEFT", "status": "Pending"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TransactionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_mobile: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRequest {
    pub entries: Vec<Submission>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileResponse {
    pub outcomes: Vec<ReconcileOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountSummary {
    pub account: AccountId,
    pub name: String,
    pub number: String,
    pub balance: Decimal,
    pub points: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub sessions: Arc<Sessions>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            sessions: Arc::new(Sessions::new()),
        }
    }
}

// === Error Handling ===

#[derive(Debug)]
pub enum AppError {
    Ledger(LedgerError),
    Unauthorized,
    Forbidden,
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError::Ledger(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Please sign in again"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", "Not allowed"),
            AppError::Ledger(err) => {
                let status = match err {
                    LedgerError::InvalidAmount
                    | LedgerError::InvalidDecision(_)
                    | LedgerError::InsufficientFunds
                    | LedgerError::SelfTransfer
                    | LedgerError::InvalidState(_) => StatusCode::BAD_REQUEST,
                    LedgerError::RecipientNotFound
                    | LedgerError::TransactionNotFound
                    | LedgerError::AccountNotFound => StatusCode::NOT_FOUND,
                    LedgerError::DuplicateAccount => StatusCode::CONFLICT,
                    LedgerError::NotificationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    LedgerError::Remote { .. } | LedgerError::Unavailable(_) => {
                        StatusCode::BAD_GATEWAY
                    }
                };
                (status, err.code(), err.user_message())
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Authentication ===

/// The authenticated caller of a request.
pub struct Caller(pub Session);

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;
        state
            .sessions
            .get(token.trim())
            .map(Caller)
            .ok_or(AppError::Unauthorized)
    }
}

// === Handlers ===

/// Maps a `POST /transactions` body onto the engine.
///
/// Credits take the requested status (default `Success`). A debit naming a
/// receiver mobile, or a `to` matching an account number, is a transfer;
/// any other debit is a plain payment labelled `to`.
pub fn dispatch(
    engine: &Engine,
    account: AccountId,
    request: CreateTransactionRequest,
) -> Result<Settlement, LedgerError> {
    let CreateTransactionRequest {
        amount,
        direction,
        to,
        status,
        remarks,
        receiver_mobile,
    } = request;

    match direction {
        Direction::Credit => engine.credit(
            account,
            amount,
            to.as_deref().unwrap_or(DEFAULT_CREDIT_LABEL),
            status.unwrap_or(TransactionStatus::Success),
            remarks,
        ),
        Direction::Debit => {
            if let Some(mobile) = receiver_mobile {
                return engine.transfer(account, &RecipientLookup::Mobile(mobile), amount, remarks);
            }
            if let Some(number) = &to {
                let lookup = RecipientLookup::AccountNumber(number.clone());
                if engine.resolve(&lookup).is_some() {
                    return engine.transfer(account, &lookup, amount, remarks);
                }
            }
            engine.debit(
                account,
                amount,
                to.as_deref().unwrap_or(DEFAULT_DEBIT_LABEL),
                remarks,
            )
        }
    }
}

/// POST /transactions
async fn create_transaction(
    State(state): State<AppState>,
    Caller(session): Caller,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<Settlement>), AppError> {
    let settlement = dispatch(&state.engine, session.account, request)?;
    Ok((StatusCode::CREATED, Json(settlement)))
}

/// GET /transactions
async fn list_transactions(
    State(state): State<AppState>,
    Caller(session): Caller,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let limit = query.limit.unwrap_or_else(|| state.engine.history_limit());
    Ok(Json(state.engine.history(session.account, limit)?))
}

/// PUT /transactions/{id}/status
async fn update_status(
    State(state): State<AppState>,
    Caller(session): Caller,
    Path(id): Path<u64>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Settlement>, AppError> {
    if session.role != Role::Admin {
        return Err(AppError::Forbidden);
    }
    let settlement =
        state
            .engine
            .approve(TransactionId(id), request.status, request.rejection_reason)?;
    Ok(Json(settlement))
}

/// POST /transactions/reconcile
async fn reconcile(
    State(state): State<AppState>,
    Caller(session): Caller,
    Json(request): Json<ReconcileRequest>,
) -> Result<Json<ReconcileResponse>, AppError> {
    let outcomes = state.engine.reconcile(session.account, request.entries)?;
    Ok(Json(ReconcileResponse { outcomes }))
}

/// GET /accounts/me
async fn me(
    State(state): State<AppState>,
    Caller(session): Caller,
) -> Result<Json<AccountSummary>, AppError> {
    let account = state
        .engine
        .get_account(&session.account)
        .ok_or(LedgerError::AccountNotFound)?;
    let profile = account.profile();
    Ok(Json(AccountSummary {
        account: account.id(),
        name: profile.display_name,
        number: profile.account_number,
        balance: account.balance(),
        points: account.points(),
    }))
}

// === Router ===

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/transactions", post(create_transaction).get(list_transactions))
        .route("/transactions/reconcile", post(reconcile))
        .route("/transactions/{id}/status", put(update_status))
        .route("/accounts/me", get(me))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountProfile;
    use crate::reward::NoRewards;
    use rust_decimal_macros::dec;

    fn engine_with_two() -> (Engine, AccountId, AccountId) {
        let engine = Engine::builder().reward_policy(NoRewards).build();
        let a = engine.open_account(AccountProfile::new("Asha", "900", "ACC1")).unwrap();
        let b = engine.open_account(AccountProfile::new("Ravi", "901", "ACC2")).unwrap();
        engine
            .credit(a, dec!(100), "Bank transfer", TransactionStatus::Success, None)
            .unwrap();
        (engine, a, b)
    }

    fn request(direction: Direction, amount: Decimal) -> CreateTransactionRequest {
        CreateTransactionRequest {
            amount,
            direction,
            to: None,
            status: None,
            remarks: None,
            receiver_mobile: None,
        }
    }

    #[test]
    fn debit_with_mobile_is_a_transfer() {
        let (engine, a, b) = engine_with_two();
        let req = CreateTransactionRequest {
            receiver_mobile: Some("901".into()),
            ..request(Direction::Debit, dec!(40))
        };
        let settlement = dispatch(&engine, a, req).unwrap();
        assert_eq!(settlement.transaction.counterparty, "Ravi");
        assert_eq!(engine.get_account(&b).unwrap().balance(), dec!(40));
    }

    #[test]
    fn debit_to_account_number_is_a_transfer() {
        let (engine, a, b) = engine_with_two();
        let req = CreateTransactionRequest {
            to: Some("ACC2".into()),
            ..request(Direction::Debit, dec!(10))
        };
        dispatch(&engine, a, req).unwrap();
        assert_eq!(engine.get_account(&b).unwrap().balance(), dec!(10));
    }

    #[test]
    fn debit_to_unknown_label_is_a_payment() {
        let (engine, a, _) = engine_with_two();
        let req = CreateTransactionRequest {
            to: Some("Electricity board".into()),
            ..request(Direction::Debit, dec!(10))
        };
        let settlement = dispatch(&engine, a, req).unwrap();
        assert_eq!(settlement.transaction.counterparty, "Electricity board");
        assert_eq!(settlement.new_balance, dec!(90));
    }

    #[test]
    fn credit_defaults_to_success_and_bank_label() {
        let (engine, _, b) = engine_with_two();
        let settlement = dispatch(&engine, b, request(Direction::Credit, dec!(5))).unwrap();
        assert_eq!(settlement.transaction.counterparty, DEFAULT_CREDIT_LABEL);
        assert_eq!(settlement.transaction.status, TransactionStatus::Success);
        assert_eq!(settlement.new_balance, dec!(5));
    }

    #[test]
    fn sessions_issue_and_revoke() {
        let sessions = Sessions::new();
        let token = sessions.issue(AccountId(3), Role::Admin);
        assert_eq!(
            sessions.get(&token),
            Some(Session {
                account: AccountId(3),
                role: Role::Admin
            })
        );
        sessions.revoke(&token);
        assert_eq!(sessions.get(&token), None);
    }

    #[test]
    fn request_body_uses_wire_names() {
        let body: CreateTransactionRequest = serde_json::from_str(
            r#"{"amount": "250.00", "type": "debit", "receiverMobile": "901", "remarks": "rent"}"#,
        )
        .unwrap();
        assert_eq!(body.direction, Direction::Debit);
        assert_eq!(body.receiver_mobile.as_deref(), Some("901"));
        assert_eq!(body.amount, dec!(250.00));
    }
}
