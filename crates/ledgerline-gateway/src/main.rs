mod credit_notes;
mod documents;
mod ledger;
mod parties;
mod payroll;
mod proforma;

use std::{fmt::Display, net::SocketAddr, str::FromStr};

use anyhow::Result as AnyResult;
use axum::{
    Json, Router,
    http::StatusCode,
    routing::{delete, get, post, put},
};
use ledgerline_platform::{ApiErrorBody, RedisBus, ServiceConfig, connect_database};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{error, info};

#[derive(Clone)]
struct AppState {
    pool: PgPool,
    redis: RedisBus,
}

type ApiError = (StatusCode, Json<ApiErrorBody>);

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "ledgerline_gateway=info,tower_http=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:8080")?;
    let pool = connect_database(&config.database_url).await?;
    let redis = RedisBus::connect(&config.redis_url)?;

    let state = AppState { pool, redis };
    let router = Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/api/general-ledger",
            get(ledger::list_entries).post(ledger::create_entry),
        )
        .route("/api/general-ledger/summary", get(ledger::summary))
        .route("/api/general-ledger/journal", post(ledger::post_journal))
        .route(
            "/api/general-ledger/{id}",
            get(ledger::get_entry).put(ledger::update_entry),
        )
        .route(
            "/api/credit-notes",
            get(credit_notes::list_credit_notes).post(credit_notes::create_credit_note),
        )
        .route(
            "/api/credit-notes/{id}",
            get(credit_notes::get_credit_note)
                .put(credit_notes::update_credit_note)
                .delete(credit_notes::delete_credit_note),
        )
        .route(
            "/api/proforma-invoices",
            get(proforma::list_proformas).post(proforma::create_proforma),
        )
        .route(
            "/api/proforma-invoices/{id}",
            get(proforma::get_proforma).put(proforma::update_proforma),
        )
        .route(
            "/api/proforma-invoices/{id}/convert-to-invoice",
            post(proforma::convert_to_invoice),
        )
        .route(
            "/api/payroll",
            get(payroll::list_payroll).post(payroll::create_payroll_entry),
        )
        .route("/api/payroll/generate", post(payroll::generate_period))
        .route("/api/payroll/clear-period", post(payroll::clear_period))
        .route(
            "/api/payroll/{id}",
            get(payroll::get_payroll_entry)
                .put(payroll::update_payroll_entry)
                .delete(payroll::delete_payroll_entry),
        )
        .route(
            "/api/payroll/{id}/additions",
            get(payroll::list_additions).post(payroll::add_addition),
        )
        .route(
            "/api/payroll/{id}/additions/{adjustment_id}",
            delete(payroll::remove_addition),
        )
        .route(
            "/api/payroll/{id}/deductions",
            get(payroll::list_deductions).post(payroll::add_deduction),
        )
        .route(
            "/api/payroll/{id}/deductions/{adjustment_id}",
            delete(payroll::remove_deduction),
        )
        .route(
            "/api/suppliers",
            get(parties::list_suppliers).post(parties::create_supplier),
        )
        .route("/api/suppliers/{id}", put(parties::update_supplier))
        .route("/api/suppliers/{id}/archive", post(parties::archive_supplier))
        .route(
            "/api/suppliers/{id}/unarchive",
            post(parties::unarchive_supplier),
        )
        .route("/api/customers", get(parties::list_customers))
        .route("/api/projects", get(parties::list_projects))
        .with_state(state);

    let addr: SocketAddr = config.http_addr.parse()?;
    info!("gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

/// Reads a text column holding one of the lowercase enum names.
fn text_column<T>(row: &PgRow, column: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw: String = row.try_get(column).map_err(internal_error)?;
    raw.parse::<T>().map_err(internal_error)
}

/// `ILIKE` pattern for a free-text search box, or `None` when blank.
fn search_pattern(search: Option<&str>) -> Option<String> {
    let term = search.map(str::trim).filter(|term| !term.is_empty())?;
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn invalid_request<E: Display>(err: E) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiErrorBody::new(err.to_string())),
    )
}

fn conflict<E: Display>(err: E) -> ApiError {
    (StatusCode::CONFLICT, Json(ApiErrorBody::new(err.to_string())))
}

fn not_found(what: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ApiErrorBody::new(format!("{what} not found"))),
    )
}

fn internal_error<E: Display>(err: E) -> ApiError {
    error!("request failed: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiErrorBody::new(err.to_string())),
    )
}
