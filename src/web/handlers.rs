use axum::{
    extract::{rejection::JsonRejection, ws::WebSocketUpgrade, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Local;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Account, AccountError, CODE_PARAM_ERROR, CODE_SUCCESS};
use crate::infrastructure::websocket::handle_socket;
use crate::web::routes::AppState;

/// Envelope shared by every API response. Business failures are reported in
/// `code`, never in the HTTP status.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            code: CODE_SUCCESS,
            message: message.into(),
            data: Some(data),
        })
    }

    pub fn error(code: u32, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            code,
            message: message.into(),
            data: None,
        })
    }
}

impl<T: Serialize> From<AccountError> for Json<ApiResponse<T>> {
    fn from(e: AccountError) -> Self {
        ApiResponse::error(e.code(), e.to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountQuery {
    pub account_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub account_id: String,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositResponse {
    pub account_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub old_balance: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub new_balance: Decimal,
    pub time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub from_account: String,
    pub to_account: String,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    pub from_account: String,
    pub to_account: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub from_old_balance: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub from_new_balance: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub to_old_balance: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub to_new_balance: Decimal,
    pub time: String,
}

fn now() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

pub async fn get_account(
    State(state): State<AppState>,
    Query(query): Query<AccountQuery>,
) -> Json<ApiResponse<Account>> {
    let account_id = query
        .account_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| state.default_account_id.to_string());

    match state.ledger.get_account(&account_id) {
        Ok(account) => ApiResponse::ok("Account loaded", account),
        Err(e) => e.into(),
    }
}

pub async fn deposit(
    State(state): State<AppState>,
    payload: Result<Json<DepositRequest>, JsonRejection>,
) -> Json<ApiResponse<DepositResponse>> {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => {
            return ApiResponse::error(
                CODE_PARAM_ERROR,
                format!("Malformed request body: {}", rejection.body_text()),
            )
        }
    };

    match state.ledger.deposit(&request.account_id, request.amount) {
        Ok(receipt) => ApiResponse::ok(
            "Deposit succeeded",
            DepositResponse {
                account_id: request.account_id,
                amount: request.amount,
                old_balance: receipt.old_balance,
                new_balance: receipt.new_balance,
                time: now(),
            },
        ),
        Err(e) => e.into(),
    }
}

pub async fn transfer(
    State(state): State<AppState>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Json<ApiResponse<TransferResponse>> {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => {
            return ApiResponse::error(
                CODE_PARAM_ERROR,
                format!("Malformed request body: {}", rejection.body_text()),
            )
        }
    };

    match state
        .ledger
        .transfer(&request.from_account, &request.to_account, request.amount)
    {
        Ok(receipt) => ApiResponse::ok(
            "Transfer succeeded",
            TransferResponse {
                from_account: request.from_account,
                to_account: request.to_account,
                amount: request.amount,
                from_old_balance: receipt.from_old_balance,
                from_new_balance: receipt.from_new_balance,
                to_old_balance: receipt.to_old_balance,
                to_new_balance: receipt.to_new_balance,
                time: now(),
            },
        ),
        Err(e) => e.into(),
    }
}

pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let hub = state.ledger.hub().clone();
    let token = state.shutdown.child_token();
    let buffer = state.observer_buffer;
    ws.on_upgrade(move |socket| handle_socket(socket, hub, token, buffer))
}
