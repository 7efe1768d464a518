use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{Datelike, Utc};
use ledgerline_core::{LineItem, ProformaDraft, ProformaInvoice, ProformaStatus};
use ledgerline_finance::{Lifecycle, ProformaAction};
use ledgerline_platform::{
    ConvertResponse, PROFORMA_CONVERTED_CHANNEL, ProformaConvertedEvent, StatusUpdate,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{Row, postgres::PgRow};
use tracing::{error, info};

use crate::documents::{
    ItemTable, PROFORMA_SERIES, checked_totals, load_items, next_number, replace_items,
    requested_number,
};
use crate::{
    ApiError, AppState, conflict, internal_error, invalid_request, is_unique_violation,
    not_found, text_column,
};

const PROFORMA_COLUMNS: &str = r#"
    id, proforma_number, customer_id, customer_name, project_id, issue_date, valid_until,
    subtotal, tax_amount, discount, total_amount, status, terms, notes, converted_invoice_id
"#;

/// PUT body: either a full edit or a bare status change.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProformaUpdate {
    Full(ProformaDraft),
    Status(StatusUpdate<ProformaStatus>),
}

pub(crate) async fn list_proformas(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProformaInvoice>>, ApiError> {
    let sql = format!(
        "SELECT {PROFORMA_COLUMNS} FROM proforma_invoices ORDER BY issue_date DESC, id DESC"
    );
    let rows = sqlx::query(&sql)
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?;

    let ids = rows
        .iter()
        .map(|row| row.try_get::<i64, _>("id"))
        .collect::<Result<Vec<_>, _>>()
        .map_err(internal_error)?;
    let mut items = load_items(&state.pool, ItemTable::Proforma, &ids).await?;

    let mut proformas = Vec::with_capacity(rows.len());
    for (row, id) in rows.iter().zip(ids) {
        proformas.push(proforma_from_row(row, items.remove(&id).unwrap_or_default())?);
    }

    Ok(Json(proformas))
}

pub(crate) async fn get_proforma(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProformaInvoice>, ApiError> {
    Ok(Json(fetch_proforma(&state, id).await?))
}

pub(crate) async fn create_proforma(
    State(state): State<AppState>,
    Json(proforma): Json<ProformaDraft>,
) -> Result<(StatusCode, Json<ProformaInvoice>), ApiError> {
    check_header(&proforma)?;
    if matches!(
        proforma.status,
        ProformaStatus::Approved | ProformaStatus::Converted
    ) {
        return Err(invalid_request(
            "a new proforma invoice must be approved or converted through its actions",
        ));
    }
    let totals = checked_totals(&proforma.items, proforma.discount)?;

    let mut tx = state.pool.begin().await.map_err(internal_error)?;
    let number = match requested_number(proforma.proforma_number.as_deref()) {
        Some(number) => number,
        None => next_number(&mut tx, PROFORMA_SERIES, proforma.issue_date.year())
            .await
            .map_err(internal_error)?,
    };

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO proforma_invoices (
            proforma_number, customer_id, customer_name, project_id, issue_date, valid_until,
            subtotal, tax_amount, discount, total_amount, status, terms, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING id
        "#,
    )
    .bind(&number)
    .bind(proforma.customer_id)
    .bind(&proforma.customer_name)
    .bind(proforma.project_id)
    .bind(proforma.issue_date)
    .bind(proforma.valid_until)
    .bind(totals.subtotal)
    .bind(totals.tax_amount)
    .bind(proforma.discount)
    .bind(totals.total_amount)
    .bind(proforma.status.as_str())
    .bind(&proforma.terms)
    .bind(&proforma.notes)
    .fetch_one(&mut *tx)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            conflict(format!("proforma number {number} already exists"))
        } else {
            internal_error(err)
        }
    })?;

    replace_items(&mut tx, ItemTable::Proforma, id, &proforma.items)
        .await
        .map_err(internal_error)?;
    tx.commit().await.map_err(internal_error)?;

    info!("proforma invoice {} created", number);

    Ok((
        StatusCode::CREATED,
        Json(ProformaInvoice {
            id,
            proforma: ProformaDraft {
                proforma_number: Some(number),
                ..proforma
            },
            subtotal: totals.subtotal,
            tax_amount: totals.tax_amount,
            total_amount: totals.total_amount,
            converted_invoice_id: None,
        }),
    ))
}

pub(crate) async fn update_proforma(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<ProformaUpdate>,
) -> Result<Json<ProformaInvoice>, ApiError> {
    let mut tx = state.pool.begin().await.map_err(internal_error)?;
    let current: ProformaStatus = {
        let row = sqlx::query("SELECT status FROM proforma_invoices WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(internal_error)?
            .ok_or_else(|| not_found("proforma invoice"))?;
        text_column(&row, "status")?
    };

    match update {
        ProformaUpdate::Status(StatusUpdate { status }) => {
            check_status_change(current, status)?;
            sqlx::query(
                "UPDATE proforma_invoices SET status = $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(id)
            .bind(status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(internal_error)?;
            info!("proforma invoice {} moved from {} to {}", id, current, status);
        }
        ProformaUpdate::Full(proforma) => {
            check_header(&proforma)?;
            check_status_change(current, proforma.status)?;
            let totals = checked_totals(&proforma.items, proforma.discount)?;
            let number = requested_number(proforma.proforma_number.as_deref());

            sqlx::query(
                r#"
                UPDATE proforma_invoices
                SET proforma_number = COALESCE($2, proforma_number),
                    customer_id = $3,
                    customer_name = $4,
                    project_id = $5,
                    issue_date = $6,
                    valid_until = $7,
                    subtotal = $8,
                    tax_amount = $9,
                    discount = $10,
                    total_amount = $11,
                    status = $12,
                    terms = $13,
                    notes = $14,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(&number)
            .bind(proforma.customer_id)
            .bind(&proforma.customer_name)
            .bind(proforma.project_id)
            .bind(proforma.issue_date)
            .bind(proforma.valid_until)
            .bind(totals.subtotal)
            .bind(totals.tax_amount)
            .bind(proforma.discount)
            .bind(totals.total_amount)
            .bind(proforma.status.as_str())
            .bind(&proforma.terms)
            .bind(&proforma.notes)
            .execute(&mut *tx)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    conflict("proforma number already exists")
                } else {
                    internal_error(err)
                }
            })?;

            replace_items(&mut tx, ItemTable::Proforma, id, &proforma.items)
                .await
                .map_err(internal_error)?;
        }
    }

    tx.commit().await.map_err(internal_error)?;
    Ok(Json(fetch_proforma(&state, id).await?))
}

/// Creates the sales invoice for an approved proforma and marks it
/// converted. The receivable posting is left to the ops worker.
pub(crate) async fn convert_to_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ConvertResponse>, ApiError> {
    let mut tx = state.pool.begin().await.map_err(internal_error)?;
    let sql = format!("SELECT {PROFORMA_COLUMNS} FROM proforma_invoices WHERE id = $1 FOR UPDATE");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found("proforma invoice"))?;
    let proforma = proforma_from_row(&row, Vec::new())?;

    let status = conversion_status(&proforma)?;

    let number = proforma
        .proforma
        .proforma_number
        .clone()
        .unwrap_or_else(|| id.to_string());
    let invoice_number = invoice_number_for(&number);

    let invoice_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO sales_invoices (
            invoice_number, customer_id, customer_name, project_id, issue_date, due_date,
            subtotal, tax_amount, discount, total_amount
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        "#,
    )
    .bind(&invoice_number)
    .bind(proforma.proforma.customer_id)
    .bind(&proforma.proforma.customer_name)
    .bind(proforma.proforma.project_id)
    .bind(Utc::now().date_naive())
    .bind(proforma.proforma.valid_until)
    .bind(proforma.subtotal)
    .bind(proforma.tax_amount)
    .bind(proforma.proforma.discount)
    .bind(proforma.total_amount)
    .fetch_one(&mut *tx)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            conflict(format!("invoice {invoice_number} already exists"))
        } else {
            internal_error(err)
        }
    })?;

    sqlx::query(
        r#"
        UPDATE proforma_invoices
        SET status = $2, converted_invoice_id = $3, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .bind(invoice_id)
    .execute(&mut *tx)
    .await
    .map_err(internal_error)?;

    tx.commit().await.map_err(internal_error)?;
    info!(
        "proforma invoice {} converted to {}",
        number, invoice_number
    );

    let event = ProformaConvertedEvent {
        proforma_id: id,
        invoice_id,
    };
    if let Err(err) = state
        .redis
        .publish_json(PROFORMA_CONVERTED_CHANNEL, &event)
        .await
    {
        error!("failed to publish conversion of proforma {id}: {err}");
    }

    Ok(Json(ConvertResponse {
        proforma: fetch_proforma(&state, id).await?,
        invoice_id,
        invoice_number,
    }))
}

async fn fetch_proforma(state: &AppState, id: i64) -> Result<ProformaInvoice, ApiError> {
    let sql = format!("SELECT {PROFORMA_COLUMNS} FROM proforma_invoices WHERE id = $1");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found("proforma invoice"))?;

    let mut items = load_items(&state.pool, ItemTable::Proforma, &[id]).await?;
    proforma_from_row(&row, items.remove(&id).unwrap_or_default())
}

/// Status after conversion. Only an approved proforma with something to
/// invoice converts; the receivable posting needs a positive total.
fn conversion_status(proforma: &ProformaInvoice) -> Result<ProformaStatus, ApiError> {
    let status = proforma
        .proforma
        .status
        .apply(ProformaAction::Convert)
        .map_err(conflict)?;
    if proforma.total_amount <= Decimal::ZERO {
        return Err(conflict(format!(
            "a proforma invoice totalling {} cannot be converted to an invoice",
            proforma.total_amount
        )));
    }
    Ok(status)
}

fn invoice_number_for(proforma_number: &str) -> String {
    format!("INV-{proforma_number}")
}

/// Approval goes through the approve guard, conversion only through the
/// convert endpoint, and a converted proforma is frozen. Other statuses are
/// set freely.
fn check_status_change(current: ProformaStatus, requested: ProformaStatus) -> Result<(), ApiError> {
    if current == ProformaStatus::Converted {
        return Err(conflict("a converted proforma invoice can no longer change"));
    }
    if requested == current {
        return Ok(());
    }

    match requested {
        ProformaStatus::Approved => current
            .apply(ProformaAction::Approve)
            .map(|_| ())
            .map_err(conflict),
        ProformaStatus::Converted => Err(conflict(
            "use convert-to-invoice to convert a proforma invoice",
        )),
        ProformaStatus::Draft
        | ProformaStatus::Sent
        | ProformaStatus::Rejected
        | ProformaStatus::Expired => Ok(()),
    }
}

fn check_header(proforma: &ProformaDraft) -> Result<(), ApiError> {
    if proforma.customer_id <= 0 {
        return Err(invalid_request("customerId is required"));
    }
    if let Some(valid_until) = proforma.valid_until {
        if valid_until < proforma.issue_date {
            return Err(invalid_request("validUntil must not be before issueDate"));
        }
    }
    Ok(())
}

fn proforma_from_row(row: &PgRow, items: Vec<LineItem>) -> Result<ProformaInvoice, ApiError> {
    Ok(ProformaInvoice {
        id: row.try_get("id").map_err(internal_error)?,
        proforma: ProformaDraft {
            proforma_number: row.try_get("proforma_number").map_err(internal_error)?,
            customer_id: row.try_get("customer_id").map_err(internal_error)?,
            customer_name: row.try_get("customer_name").map_err(internal_error)?,
            project_id: row.try_get("project_id").map_err(internal_error)?,
            issue_date: row.try_get("issue_date").map_err(internal_error)?,
            valid_until: row.try_get("valid_until").map_err(internal_error)?,
            items,
            discount: row.try_get("discount").map_err(internal_error)?,
            status: text_column(row, "status")?,
            terms: row.try_get("terms").map_err(internal_error)?,
            notes: row.try_get("notes").map_err(internal_error)?,
        },
        subtotal: row.try_get("subtotal").map_err(internal_error)?,
        tax_amount: row.try_get("tax_amount").map_err(internal_error)?,
        total_amount: row.try_get("total_amount").map_err(internal_error)?,
        converted_invoice_id: row.try_get("converted_invoice_id").map_err(internal_error)?,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn approval_is_guarded() {
        assert!(check_status_change(ProformaStatus::Draft, ProformaStatus::Approved).is_ok());
        assert!(check_status_change(ProformaStatus::Sent, ProformaStatus::Approved).is_ok());
        assert!(check_status_change(ProformaStatus::Approved, ProformaStatus::Approved).is_ok());

        let (status, Json(body)) =
            check_status_change(ProformaStatus::Rejected, ProformaStatus::Approved).unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body.text(),
            Some("cannot approve a proforma invoice that is rejected")
        );
    }

    #[test]
    fn conversion_only_through_endpoint() {
        assert!(check_status_change(ProformaStatus::Approved, ProformaStatus::Converted).is_err());
        assert!(check_status_change(ProformaStatus::Converted, ProformaStatus::Draft).is_err());
        assert!(check_status_change(ProformaStatus::Approved, ProformaStatus::Expired).is_ok());
        assert!(check_status_change(ProformaStatus::Draft, ProformaStatus::Sent).is_ok());
    }

    #[test]
    fn update_body_is_status_or_full_edit() {
        let status: ProformaUpdate = serde_json::from_value(json!({"status": "approved"})).unwrap();
        assert!(matches!(
            status,
            ProformaUpdate::Status(StatusUpdate {
                status: ProformaStatus::Approved
            })
        ));

        let full: ProformaUpdate = serde_json::from_value(json!({
            "customerId": 7,
            "issueDate": "2024-02-01",
            "items": [{"description": "Widget", "quantity": "2", "unitPrice": "50"}],
            "status": "sent",
            "subtotal": "100.00",
            "taxAmount": "0.00",
            "totalAmount": "100.00"
        }))
        .unwrap();
        assert!(matches!(full, ProformaUpdate::Full(_)));
    }

    fn approved_proforma(items: Vec<LineItem>, discount: Decimal) -> ProformaInvoice {
        let totals = checked_totals(&items, discount).unwrap();
        ProformaInvoice {
            id: 5,
            proforma: ProformaDraft {
                proforma_number: Some("PF-2024-0005".to_string()),
                customer_id: 7,
                customer_name: Some("Acme".to_string()),
                project_id: None,
                issue_date: chrono::NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                valid_until: None,
                items,
                discount,
                status: ProformaStatus::Approved,
                terms: None,
                notes: None,
            },
            subtotal: totals.subtotal,
            tax_amount: totals.tax_amount,
            total_amount: totals.total_amount,
            converted_invoice_id: None,
        }
    }

    #[test]
    fn approved_proforma_with_positive_total_converts() {
        let items = vec![LineItem::new("Widget", Decimal::ONE, Decimal::new(20, 0))];
        let proforma = approved_proforma(items, Decimal::ZERO);
        assert_eq!(conversion_status(&proforma).ok(), Some(ProformaStatus::Converted));

        let mut draft = proforma;
        draft.proforma.status = ProformaStatus::Draft;
        assert!(conversion_status(&draft).is_err());
    }

    #[test]
    fn discount_beyond_total_blocks_conversion() {
        let items = vec![LineItem::new("Widget", Decimal::ONE, Decimal::new(20, 0))];
        let proforma = approved_proforma(items, Decimal::new(50, 0));
        assert_eq!(proforma.total_amount, Decimal::new(-30, 0));

        let (status, Json(body)) = conversion_status(&proforma).unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);
        let message = body.text().unwrap_or_default();
        assert!(message.starts_with("a proforma invoice totalling -30"));
        assert!(message.ends_with("cannot be converted to an invoice"));
    }

    #[test]
    fn invoice_number_derives_from_proforma() {
        assert_eq!(invoice_number_for("PF-2024-0005"), "INV-PF-2024-0005");
    }
}
