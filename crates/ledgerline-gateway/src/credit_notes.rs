use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Datelike;
use ledgerline_core::{CreditNote, CreditNoteDraft, LineItem};
use sqlx::{Row, postgres::PgRow};
use tracing::info;

use crate::documents::{
    CREDIT_NOTE_SERIES, ItemTable, checked_totals, load_items, next_number, replace_items,
    requested_number,
};
use crate::{
    ApiError, AppState, conflict, internal_error, invalid_request, is_unique_violation,
    not_found, text_column,
};

const NOTE_COLUMNS: &str = r#"
    id, credit_note_number, customer_id, customer_name, invoice_number, issue_date, reason,
    subtotal, tax_amount, discount, total_amount, status, notes
"#;

pub(crate) async fn list_credit_notes(
    State(state): State<AppState>,
) -> Result<Json<Vec<CreditNote>>, ApiError> {
    let sql = format!("SELECT {NOTE_COLUMNS} FROM credit_notes ORDER BY issue_date DESC, id DESC");
    let rows = sqlx::query(&sql)
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?;

    let ids = rows
        .iter()
        .map(|row| row.try_get::<i64, _>("id"))
        .collect::<Result<Vec<_>, _>>()
        .map_err(internal_error)?;
    let mut items = load_items(&state.pool, ItemTable::CreditNote, &ids).await?;

    let mut notes = Vec::with_capacity(rows.len());
    for (row, id) in rows.iter().zip(ids) {
        notes.push(note_from_row(row, items.remove(&id).unwrap_or_default())?);
    }

    Ok(Json(notes))
}

pub(crate) async fn get_credit_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CreditNote>, ApiError> {
    Ok(Json(fetch_credit_note(&state, id).await?))
}

pub(crate) async fn create_credit_note(
    State(state): State<AppState>,
    Json(note): Json<CreditNoteDraft>,
) -> Result<(StatusCode, Json<CreditNote>), ApiError> {
    check_header(&note)?;
    let totals = checked_totals(&note.items, note.discount)?;

    let mut tx = state.pool.begin().await.map_err(internal_error)?;
    let number = match requested_number(note.credit_note_number.as_deref()) {
        Some(number) => number,
        None => next_number(&mut tx, CREDIT_NOTE_SERIES, note.issue_date.year())
            .await
            .map_err(internal_error)?,
    };

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO credit_notes (
            credit_note_number, customer_id, customer_name, invoice_number, issue_date, reason,
            subtotal, tax_amount, discount, total_amount, status, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING id
        "#,
    )
    .bind(&number)
    .bind(note.customer_id)
    .bind(&note.customer_name)
    .bind(&note.invoice_number)
    .bind(note.issue_date)
    .bind(&note.reason)
    .bind(totals.subtotal)
    .bind(totals.tax_amount)
    .bind(note.discount)
    .bind(totals.total_amount)
    .bind(note.status.as_str())
    .bind(&note.notes)
    .fetch_one(&mut *tx)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            conflict(format!("credit note number {number} already exists"))
        } else {
            internal_error(err)
        }
    })?;

    replace_items(&mut tx, ItemTable::CreditNote, id, &note.items)
        .await
        .map_err(internal_error)?;
    tx.commit().await.map_err(internal_error)?;

    info!("credit note {} created for {}", number, totals.total_amount);

    Ok((
        StatusCode::CREATED,
        Json(CreditNote {
            id,
            note: CreditNoteDraft {
                credit_note_number: Some(number),
                ..note
            },
            subtotal: totals.subtotal,
            tax_amount: totals.tax_amount,
            total_amount: totals.total_amount,
        }),
    ))
}

/// Replaces the header and every line. The status may be set to any value.
pub(crate) async fn update_credit_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(note): Json<CreditNoteDraft>,
) -> Result<Json<CreditNote>, ApiError> {
    check_header(&note)?;
    let totals = checked_totals(&note.items, note.discount)?;
    let number = requested_number(note.credit_note_number.as_deref());

    let mut tx = state.pool.begin().await.map_err(internal_error)?;
    let updated = sqlx::query(
        r#"
        UPDATE credit_notes
        SET credit_note_number = COALESCE($2, credit_note_number),
            customer_id = $3,
            customer_name = $4,
            invoice_number = $5,
            issue_date = $6,
            reason = $7,
            subtotal = $8,
            tax_amount = $9,
            discount = $10,
            total_amount = $11,
            status = $12,
            notes = $13,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&number)
    .bind(note.customer_id)
    .bind(&note.customer_name)
    .bind(&note.invoice_number)
    .bind(note.issue_date)
    .bind(&note.reason)
    .bind(totals.subtotal)
    .bind(totals.tax_amount)
    .bind(note.discount)
    .bind(totals.total_amount)
    .bind(note.status.as_str())
    .bind(&note.notes)
    .execute(&mut *tx)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            conflict("credit note number already exists")
        } else {
            internal_error(err)
        }
    })?;

    if updated.rows_affected() == 0 {
        return Err(not_found("credit note"));
    }

    replace_items(&mut tx, ItemTable::CreditNote, id, &note.items)
        .await
        .map_err(internal_error)?;
    tx.commit().await.map_err(internal_error)?;

    Ok(Json(fetch_credit_note(&state, id).await?))
}

pub(crate) async fn delete_credit_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let deleted = sqlx::query("DELETE FROM credit_notes WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(internal_error)?;

    if deleted.rows_affected() == 0 {
        return Err(not_found("credit note"));
    }

    info!("credit note {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_credit_note(state: &AppState, id: i64) -> Result<CreditNote, ApiError> {
    let sql = format!("SELECT {NOTE_COLUMNS} FROM credit_notes WHERE id = $1");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found("credit note"))?;

    let mut items = load_items(&state.pool, ItemTable::CreditNote, &[id]).await?;
    note_from_row(&row, items.remove(&id).unwrap_or_default())
}

fn check_header(note: &CreditNoteDraft) -> Result<(), ApiError> {
    if note.customer_id <= 0 {
        return Err(invalid_request("customerId is required"));
    }
    Ok(())
}

fn note_from_row(row: &PgRow, items: Vec<LineItem>) -> Result<CreditNote, ApiError> {
    Ok(CreditNote {
        id: row.try_get("id").map_err(internal_error)?,
        note: CreditNoteDraft {
            credit_note_number: row.try_get("credit_note_number").map_err(internal_error)?,
            customer_id: row.try_get("customer_id").map_err(internal_error)?,
            customer_name: row.try_get("customer_name").map_err(internal_error)?,
            invoice_number: row.try_get("invoice_number").map_err(internal_error)?,
            issue_date: row.try_get("issue_date").map_err(internal_error)?,
            reason: row.try_get("reason").map_err(internal_error)?,
            items,
            discount: row.try_get("discount").map_err(internal_error)?,
            status: text_column(row, "status")?,
            notes: row.try_get("notes").map_err(internal_error)?,
        },
        subtotal: row.try_get("subtotal").map_err(internal_error)?,
        tax_amount: row.try_get("tax_amount").map_err(internal_error)?,
        total_amount: row.try_get("total_amount").map_err(internal_error)?,
    })
}
