use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use ledgerline_core::{
    AdjustmentKind, Employee, PayrollAdjustment, PayrollEntry, PayrollStatus,
};
use ledgerline_finance::{
    Lifecycle, PayrollAction, PayrollError, ensure_adjustable, generate_period as plan_period,
    payroll_total, recalculate, working_days,
};
use ledgerline_platform::{
    AdjustmentRequest, ClearPeriodResponse, GenerateResponse, PAYROLL_PAID_CHANNEL,
    PayrollPaidEvent, PayrollQuery, PeriodRequest,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{Postgres, Row, Transaction, postgres::PgRow};
use tracing::{error, info};

use crate::{
    ApiError, AppState, conflict, internal_error, invalid_request, is_unique_violation,
    not_found, text_column,
};

const ENTRY_SELECT: &str = r#"
    SELECT
        p.id, p.employee_id, e.name AS employee_name, p.month, p.year, p.working_days,
        p.basic_salary, p.total_additions, p.total_deductions, p.total_amount, p.status, p.notes
    FROM payroll_entries p
    JOIN employees e ON e.id = p.employee_id
"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatePayrollRequest {
    employee_id: i64,
    month: i32,
    year: i32,
    #[serde(default)]
    basic_salary: Option<Decimal>,
    #[serde(default)]
    working_days: Option<i32>,
    #[serde(default)]
    notes: Option<String>,
}

/// PUT body. Field edits are only accepted while the entry is draft.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PayrollUpdate {
    #[serde(default)]
    status: Option<PayrollStatus>,
    #[serde(default)]
    basic_salary: Option<Decimal>,
    #[serde(default)]
    working_days: Option<i32>,
    #[serde(default)]
    notes: Option<String>,
}

impl PayrollUpdate {
    fn edits_fields(&self) -> bool {
        self.basic_salary.is_some() || self.working_days.is_some() || self.notes.is_some()
    }
}

pub(crate) async fn list_payroll(
    State(state): State<AppState>,
    Query(query): Query<PayrollQuery>,
) -> Result<Json<Vec<PayrollEntry>>, ApiError> {
    let sql = format!(
        r#"{ENTRY_SELECT}
        WHERE ($1::int IS NULL OR p.month = $1)
          AND ($2::int IS NULL OR p.year = $2)
          AND ($3::text IS NULL OR p.status = $3)
          AND ($4::bigint IS NULL OR p.employee_id = $4)
        ORDER BY p.year DESC, p.month DESC, e.name
        "#
    );
    let rows = sqlx::query(&sql)
        .bind(query.month)
        .bind(query.year)
        .bind(query.status.map(|status| status.as_str()))
        .bind(query.employee_id)
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?;

    let entries = rows
        .iter()
        .map(entry_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(entries))
}

pub(crate) async fn get_payroll_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PayrollEntry>, ApiError> {
    let sql = format!("{ENTRY_SELECT} WHERE p.id = $1");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found("payroll entry"))?;

    Ok(Json(entry_from_row(&row)?))
}

pub(crate) async fn create_payroll_entry(
    State(state): State<AppState>,
    Json(payload): Json<CreatePayrollRequest>,
) -> Result<(StatusCode, Json<PayrollEntry>), ApiError> {
    let period_days = working_days(payload.year, payload.month).map_err(invalid_request)?;
    let days = payload.working_days.unwrap_or(period_days);
    check_fields(payload.basic_salary, Some(days))?;

    let employee = sqlx::query("SELECT name, basic_salary FROM employees WHERE id = $1")
        .bind(payload.employee_id)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found("employee"))?;
    let employee_name: String = employee.try_get("name").map_err(internal_error)?;
    let default_salary: Decimal = employee.try_get("basic_salary").map_err(internal_error)?;
    let basic_salary = payload.basic_salary.unwrap_or(default_salary);

    let mut entry = PayrollEntry {
        id: 0,
        employee_id: payload.employee_id,
        employee_name: Some(employee_name),
        month: payload.month,
        year: payload.year,
        working_days: days,
        basic_salary,
        total_additions: Decimal::ZERO,
        total_deductions: Decimal::ZERO,
        total_amount: payroll_total(basic_salary, Decimal::ZERO, Decimal::ZERO),
        status: PayrollStatus::Draft,
        notes: payload.notes,
    };

    let mut tx = state.pool.begin().await.map_err(internal_error)?;
    entry.id = insert_entry(&mut tx, &entry).await?;
    tx.commit().await.map_err(internal_error)?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// Applies field edits and/or a status move. Moving to paid publishes
/// `payroll.paid` for the salary posting.
pub(crate) async fn update_payroll_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<PayrollUpdate>,
) -> Result<Json<PayrollEntry>, ApiError> {
    let mut tx = state.pool.begin().await.map_err(internal_error)?;
    let mut entry = lock_entry(&mut tx, id).await?;
    let previous = entry.status;

    if update.edits_fields() {
        if entry.status != PayrollStatus::Draft {
            return Err(conflict(format!(
                "only draft payroll entries can be edited (it is {})",
                entry.status
            )));
        }
        check_fields(update.basic_salary, update.working_days)?;
        if let Some(basic_salary) = update.basic_salary {
            entry.basic_salary = basic_salary;
        }
        if let Some(days) = update.working_days {
            entry.working_days = days;
        }
        if update.notes.is_some() {
            entry.notes = update.notes.clone();
        }
        let adjustments = load_adjustments(&mut *tx, id, None).await?;
        recalculate(&mut entry, &adjustments);
    }

    if let Some(requested) = update.status {
        entry.status = next_status(&entry, requested)?;
    }

    sqlx::query(
        r#"
        UPDATE payroll_entries
        SET working_days = $2,
            basic_salary = $3,
            total_additions = $4,
            total_deductions = $5,
            total_amount = $6,
            status = $7,
            notes = $8,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(entry.working_days)
    .bind(entry.basic_salary)
    .bind(entry.total_additions)
    .bind(entry.total_deductions)
    .bind(entry.total_amount)
    .bind(entry.status.as_str())
    .bind(&entry.notes)
    .execute(&mut *tx)
    .await
    .map_err(internal_error)?;
    tx.commit().await.map_err(internal_error)?;

    if entry.status != previous {
        info!("payroll entry {} moved from {} to {}", id, previous, entry.status);
    }
    if entry.status == PayrollStatus::Paid && previous != PayrollStatus::Paid {
        let event = PayrollPaidEvent { payroll_id: id };
        if let Err(err) = state.redis.publish_json(PAYROLL_PAID_CHANNEL, &event).await {
            error!("failed to publish payment of payroll entry {id}: {err}");
        }
    }

    Ok(Json(entry))
}

/// Paid entries already carry ledger postings and stay.
pub(crate) async fn delete_payroll_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let row = sqlx::query(
        "DELETE FROM payroll_entries WHERE id = $1 AND status <> 'paid' RETURNING id",
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await
    .map_err(internal_error)?;

    if row.is_some() {
        return Ok(StatusCode::NO_CONTENT);
    }

    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM payroll_entries WHERE id = $1)",
    )
    .bind(id)
    .fetch_one(&state.pool)
    .await
    .map_err(internal_error)?;

    if exists {
        Err(conflict("a paid payroll entry cannot be deleted"))
    } else {
        Err(not_found("payroll entry"))
    }
}

/// Draft entries for every active employee who has none for the period.
pub(crate) async fn generate_period(
    State(state): State<AppState>,
    Json(period): Json<PeriodRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    working_days(period.year, period.month).map_err(invalid_request)?;

    let rows = sqlx::query("SELECT id, name, basic_salary, active FROM employees WHERE active")
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?;
    let mut employees = Vec::with_capacity(rows.len());
    for row in rows {
        employees.push(Employee {
            id: row.try_get("id").map_err(internal_error)?,
            name: row.try_get("name").map_err(internal_error)?,
            basic_salary: row.try_get("basic_salary").map_err(internal_error)?,
            active: row.try_get("active").map_err(internal_error)?,
        });
    }

    let mut tx = state.pool.begin().await.map_err(internal_error)?;
    let existing: Vec<i64> = sqlx::query_scalar(
        "SELECT employee_id FROM payroll_entries WHERE month = $1 AND year = $2",
    )
    .bind(period.month)
    .bind(period.year)
    .fetch_all(&mut *tx)
    .await
    .map_err(internal_error)?;

    let mut entries =
        plan_period(&employees, period.month, period.year, &existing).map_err(invalid_request)?;
    for entry in &mut entries {
        entry.id = insert_entry(&mut tx, entry).await?;
    }
    tx.commit().await.map_err(internal_error)?;

    info!(
        "generated {} payroll entries for {:02}/{}",
        entries.len(),
        period.month,
        period.year
    );

    Ok(Json(GenerateResponse {
        created: entries.len(),
        entries,
    }))
}

/// Removes the period's unpaid entries.
pub(crate) async fn clear_period(
    State(state): State<AppState>,
    Json(period): Json<PeriodRequest>,
) -> Result<Json<ClearPeriodResponse>, ApiError> {
    working_days(period.year, period.month).map_err(invalid_request)?;

    let deleted = sqlx::query(
        "DELETE FROM payroll_entries WHERE month = $1 AND year = $2 AND status <> 'paid'",
    )
    .bind(period.month)
    .bind(period.year)
    .execute(&state.pool)
    .await
    .map_err(internal_error)?
    .rows_affected();

    info!(
        "cleared {} payroll entries for {:02}/{}",
        deleted, period.month, period.year
    );
    Ok(Json(ClearPeriodResponse { deleted }))
}

pub(crate) async fn list_additions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<PayrollAdjustment>>, ApiError> {
    Ok(Json(
        load_adjustments(&state.pool, id, Some(AdjustmentKind::Addition)).await?,
    ))
}

pub(crate) async fn list_deductions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<PayrollAdjustment>>, ApiError> {
    Ok(Json(
        load_adjustments(&state.pool, id, Some(AdjustmentKind::Deduction)).await?,
    ))
}

pub(crate) async fn add_addition(
    state: State<AppState>,
    path: Path<i64>,
    body: Json<AdjustmentRequest>,
) -> Result<(StatusCode, Json<PayrollAdjustment>), ApiError> {
    add_adjustment(state, path, body, AdjustmentKind::Addition).await
}

pub(crate) async fn add_deduction(
    state: State<AppState>,
    path: Path<i64>,
    body: Json<AdjustmentRequest>,
) -> Result<(StatusCode, Json<PayrollAdjustment>), ApiError> {
    add_adjustment(state, path, body, AdjustmentKind::Deduction).await
}

pub(crate) async fn remove_addition(
    state: State<AppState>,
    path: Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    remove_adjustment(state, path, AdjustmentKind::Addition).await
}

pub(crate) async fn remove_deduction(
    state: State<AppState>,
    path: Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    remove_adjustment(state, path, AdjustmentKind::Deduction).await
}

async fn add_adjustment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<AdjustmentRequest>,
    kind: AdjustmentKind,
) -> Result<(StatusCode, Json<PayrollAdjustment>), ApiError> {
    let description = request.description.trim();
    if description.is_empty() {
        return Err(invalid_request("description is required"));
    }
    if request.amount <= Decimal::ZERO {
        return Err(invalid_request(PayrollError::NonPositiveAdjustment));
    }

    let mut tx = state.pool.begin().await.map_err(internal_error)?;
    let mut entry = lock_entry(&mut tx, id).await?;
    ensure_adjustable(entry.status).map_err(conflict)?;

    let adjustment_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO payroll_adjustments (payroll_id, kind, description, amount)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(id)
    .bind(kind.as_str())
    .bind(description)
    .bind(request.amount)
    .fetch_one(&mut *tx)
    .await
    .map_err(internal_error)?;

    refresh_totals(&mut tx, &mut entry).await?;
    tx.commit().await.map_err(internal_error)?;

    Ok((
        StatusCode::CREATED,
        Json(PayrollAdjustment {
            id: adjustment_id,
            payroll_id: id,
            kind,
            description: description.to_string(),
            amount: request.amount,
        }),
    ))
}

async fn remove_adjustment(
    State(state): State<AppState>,
    Path((id, adjustment_id)): Path<(i64, i64)>,
    kind: AdjustmentKind,
) -> Result<StatusCode, ApiError> {
    let mut tx = state.pool.begin().await.map_err(internal_error)?;
    let mut entry = lock_entry(&mut tx, id).await?;
    ensure_adjustable(entry.status).map_err(conflict)?;

    let deleted = sqlx::query(
        "DELETE FROM payroll_adjustments WHERE id = $1 AND payroll_id = $2 AND kind = $3",
    )
    .bind(adjustment_id)
    .bind(id)
    .bind(kind.as_str())
    .execute(&mut *tx)
    .await
    .map_err(internal_error)?;
    if deleted.rows_affected() == 0 {
        return Err(not_found(kind.as_str()));
    }

    refresh_totals(&mut tx, &mut entry).await?;
    tx.commit().await.map_err(internal_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// The status an update moves to. Draft is never re-entered, and paying
/// requires something to post.
fn next_status(entry: &PayrollEntry, requested: PayrollStatus) -> Result<PayrollStatus, ApiError> {
    if requested == entry.status {
        return Ok(requested);
    }

    let action = match requested {
        PayrollStatus::Approved => PayrollAction::Approve,
        PayrollStatus::Paid => PayrollAction::MarkPaid,
        PayrollStatus::Draft => {
            return Err(conflict(format!(
                "a payroll entry that is {} cannot return to draft",
                entry.status
            )));
        }
    };
    let status = entry.status.apply(action).map_err(conflict)?;

    if status == PayrollStatus::Paid && entry.total_amount <= Decimal::ZERO {
        return Err(conflict(PayrollError::NothingToPost));
    }
    Ok(status)
}

fn check_fields(basic_salary: Option<Decimal>, days: Option<i32>) -> Result<(), ApiError> {
    if basic_salary.is_some_and(|salary| salary.is_sign_negative()) {
        return Err(invalid_request("basicSalary cannot be negative"));
    }
    if days.is_some_and(|days| !(0..=31).contains(&days)) {
        return Err(invalid_request("workingDays must be between 0 and 31"));
    }
    Ok(())
}

async fn lock_entry(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<PayrollEntry, ApiError> {
    let sql = format!("{ENTRY_SELECT} WHERE p.id = $1 FOR UPDATE OF p");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found("payroll entry"))?;

    entry_from_row(&row)
}

async fn insert_entry(
    tx: &mut Transaction<'_, Postgres>,
    entry: &PayrollEntry,
) -> Result<i64, ApiError> {
    sqlx::query_scalar(
        r#"
        INSERT INTO payroll_entries (
            employee_id, month, year, working_days, basic_salary, total_additions,
            total_deductions, total_amount, status, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        "#,
    )
    .bind(entry.employee_id)
    .bind(entry.month)
    .bind(entry.year)
    .bind(entry.working_days)
    .bind(entry.basic_salary)
    .bind(entry.total_additions)
    .bind(entry.total_deductions)
    .bind(entry.total_amount)
    .bind(entry.status.as_str())
    .bind(&entry.notes)
    .fetch_one(&mut **tx)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            conflict(format!(
                "employee {} already has payroll for {:02}/{}",
                entry.employee_id, entry.month, entry.year
            ))
        } else {
            internal_error(err)
        }
    })
}

/// Recomputes and stores the entry's totals from its child rows.
async fn refresh_totals(
    tx: &mut Transaction<'_, Postgres>,
    entry: &mut PayrollEntry,
) -> Result<(), ApiError> {
    let adjustments = load_adjustments(&mut **tx, entry.id, None).await?;
    recalculate(entry, &adjustments);

    sqlx::query(
        r#"
        UPDATE payroll_entries
        SET total_additions = $2, total_deductions = $3, total_amount = $4, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(entry.id)
    .bind(entry.total_additions)
    .bind(entry.total_deductions)
    .bind(entry.total_amount)
    .execute(&mut **tx)
    .await
    .map_err(internal_error)?;

    Ok(())
}

async fn load_adjustments<'e, E>(
    executor: E,
    payroll_id: i64,
    kind: Option<AdjustmentKind>,
) -> Result<Vec<PayrollAdjustment>, ApiError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let rows = sqlx::query(
        r#"
        SELECT id, payroll_id, kind, description, amount
        FROM payroll_adjustments
        WHERE payroll_id = $1 AND ($2::text IS NULL OR kind = $2)
        ORDER BY id
        "#,
    )
    .bind(payroll_id)
    .bind(kind.map(|kind| kind.as_str()))
    .fetch_all(executor)
    .await
    .map_err(internal_error)?;

    rows.iter()
        .map(|row| {
            Ok(PayrollAdjustment {
                id: row.try_get("id").map_err(internal_error)?,
                payroll_id: row.try_get("payroll_id").map_err(internal_error)?,
                kind: text_column(row, "kind")?,
                description: row.try_get("description").map_err(internal_error)?,
                amount: row.try_get("amount").map_err(internal_error)?,
            })
        })
        .collect()
}

fn entry_from_row(row: &PgRow) -> Result<PayrollEntry, ApiError> {
    Ok(PayrollEntry {
        id: row.try_get("id").map_err(internal_error)?,
        employee_id: row.try_get("employee_id").map_err(internal_error)?,
        employee_name: row.try_get("employee_name").map_err(internal_error)?,
        month: row.try_get("month").map_err(internal_error)?,
        year: row.try_get("year").map_err(internal_error)?,
        working_days: row.try_get("working_days").map_err(internal_error)?,
        basic_salary: row.try_get("basic_salary").map_err(internal_error)?,
        total_additions: row.try_get("total_additions").map_err(internal_error)?,
        total_deductions: row.try_get("total_deductions").map_err(internal_error)?,
        total_amount: row.try_get("total_amount").map_err(internal_error)?,
        status: text_column(row, "status")?,
        notes: row.try_get("notes").map_err(internal_error)?,
    })
}
