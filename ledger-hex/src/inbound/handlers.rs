//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use ledger_types::{
    AccountId, AppError, CreateAccountRequest, ErrorKind, LedgerStore, ListAccountsQuery, Page,
    TransferId, TransferRequest,
};

use crate::LedgerService;

/// Application state shared across handlers.
pub struct AppState<S: LedgerStore> {
    pub service: LedgerService<S>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = match kind {
            ErrorKind::Validation | ErrorKind::InsufficientFunds => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(kind = %kind, error = %self.0, "Request failed");
        }

        let message = match &self.0 {
            AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::Unavailable(msg)
            | AppError::Internal(msg) => msg.clone(),
            err @ AppError::InsufficientFunds { .. } => err.to_string(),
        };

        let mut body = serde_json::json!({
            "error": message,
            "code": status.as_u16(),
            "kind": kind.to_string(),
        });
        if kind == ErrorKind::Transient {
            body["retryable"] = serde_json::Value::Bool(true);
        }

        (status, Json(body)).into_response()
    }
}

fn parse_account_id(raw: &str) -> Result<AccountId, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest("Invalid account ID".into()))
}

/// Limit/offset query for history listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    fn into_page(self) -> Result<Page, AppError> {
        let default = Page::default();
        let page = Page {
            limit: self.limit.unwrap_or(default.limit),
            offset: self.offset.unwrap_or(default.offset),
        };
        if page.limit < 1 || page.limit > default.limit || page.offset < 0 {
            return Err(AppError::BadRequest(format!(
                "limit must be between 1 and {} and offset must not be negative",
                default.limit
            )));
        }
        Ok(page)
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

/// Open an account with a zero balance.
#[tracing::instrument(skip(state), fields(owner = %req.owner, currency = %req.currency))]
pub async fn create_account<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state.service.create_account(req).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// List one page of accounts.
#[tracing::instrument(skip(state))]
pub async fn list_accounts<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListAccountsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let accounts = state.service.list_accounts(query).await?;
    Ok(Json(accounts))
}

/// Get account by ID.
#[tracing::instrument(skip(state), fields(account_id = %id))]
pub async fn get_account<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id = parse_account_id(&id)?;
    let account = state.service.get_account(account_id).await?;
    Ok(Json(account))
}

/// Delete an account without history.
#[tracing::instrument(skip(state), fields(account_id = %id))]
pub async fn delete_account<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id = parse_account_id(&id)?;
    state.service.delete_account(account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List entries for an account.
#[tracing::instrument(skip(state), fields(account_id = %id))]
pub async fn list_entries<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id = parse_account_id(&id)?;
    let entries = state
        .service
        .list_entries(account_id, query.into_page()?)
        .await?;
    Ok(Json(entries))
}

// ─────────────────────────────────────────────────────────────────────────────
// Transfers
// ─────────────────────────────────────────────────────────────────────────────

/// Transfer money between accounts.
#[tracing::instrument(skip(state), fields(from = %req.from_account_id, to = %req.to_account_id, amount = req.amount))]
pub async fn transfer<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<TransferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.service.transfer(req).await?;
    Ok(Json(result))
}

/// Get transfer by ID.
#[tracing::instrument(skip(state), fields(transfer_id = %id))]
pub async fn get_transfer<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let transfer_id: TransferId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid transfer ID".into()))?;

    let transfer = state.service.get_transfer(transfer_id).await?;
    Ok(Json(transfer))
}
