use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use ledgerline_core::{LedgerEntry, LedgerEntryDraft, is_whole_cents};
use ledgerline_finance::{LedgerSummary, check_balanced};
use ledgerline_platform::{
    JournalResponse, JournalSubmission, LedgerQuery, Paginated, Pagination, insert_ledger_entry,
};
use rust_decimal::Decimal;
use sqlx::{Row, postgres::PgRow};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    ApiError, AppState, conflict, internal_error, invalid_request, not_found, search_pattern,
    text_column,
};

const ENTRY_COLUMNS: &str = r#"
    id, entry_type, reference_type, reference_id, journal_id, account_name, description,
    debit_amount, credit_amount, entity_id, entity_name, project_id, project_title,
    invoice_number, transaction_date, due_date, status, notes
"#;

const ENTRY_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR entry_type = $1)
      AND ($2::text IS NULL OR status = $2)
      AND ($3::date IS NULL OR transaction_date >= $3)
      AND ($4::date IS NULL OR transaction_date <= $4)
      AND ($5::bigint IS NULL OR entity_id = $5)
      AND ($6::bigint IS NULL OR project_id = $6)
      AND ($7::text IS NULL OR account_name = $7)
      AND ($8::text IS NULL
           OR description ILIKE $8
           OR invoice_number ILIKE $8
           OR account_name ILIKE $8)
"#;

/// Filter values bound to `$1..$8` of [`ENTRY_FILTER`].
struct EntryFilter {
    entry_type: Option<&'static str>,
    status: Option<&'static str>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    entity_id: Option<i64>,
    project_id: Option<i64>,
    account_name: Option<String>,
    search: Option<String>,
}

impl EntryFilter {
    fn from_query(query: &LedgerQuery) -> Result<Self, ApiError> {
        if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
            if start > end {
                return Err(invalid_request("startDate must not be after endDate"));
            }
        }

        Ok(Self {
            entry_type: query.entry_type.map(|value| value.as_str()),
            status: query.status.map(|value| value.as_str()),
            start_date: query.start_date,
            end_date: query.end_date,
            entity_id: query.entity_id,
            project_id: query.project_id,
            account_name: query
                .account_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            search: search_pattern(query.search.as_deref()),
        })
    }
}

macro_rules! bind_filter {
    ($query:expr, $filter:expr) => {
        $query
            .bind($filter.entry_type)
            .bind($filter.status)
            .bind($filter.start_date)
            .bind($filter.end_date)
            .bind($filter.entity_id)
            .bind($filter.project_id)
            .bind($filter.account_name.as_deref())
            .bind($filter.search.as_deref())
    };
}

pub(crate) async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<Paginated<LedgerEntry>>, ApiError> {
    let filter = EntryFilter::from_query(&query)?;

    let count_sql = format!("SELECT COUNT(*) FROM ledger_entries {ENTRY_FILTER}");
    let total: i64 = bind_filter!(sqlx::query_scalar::<_, i64>(&count_sql), filter)
        .fetch_one(&state.pool)
        .await
        .map_err(internal_error)?;

    let pagination = Pagination::new(query.page(), query.limit(), total.max(0) as u64);
    let list_sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM ledger_entries {ENTRY_FILTER} \
         ORDER BY transaction_date DESC, id DESC LIMIT $9 OFFSET $10"
    );
    let rows = bind_filter!(sqlx::query(&list_sql), filter)
        .bind(i64::from(pagination.limit))
        .bind(pagination.offset() as i64)
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?;

    let data = rows
        .iter()
        .map(entry_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(Paginated { data, pagination }))
}

/// Totals over every row matching the filters, ignoring pagination.
pub(crate) async fn summary(
    State(state): State<AppState>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<LedgerSummary>, ApiError> {
    let filter = EntryFilter::from_query(&query)?;
    let sql = format!(
        r#"
        SELECT
            COALESCE(SUM(debit_amount), 0) AS total_debits,
            COALESCE(SUM(credit_amount), 0) AS total_credits,
            COUNT(*) AS entry_count
        FROM ledger_entries {ENTRY_FILTER}
        "#
    );
    let row = bind_filter!(sqlx::query(&sql), filter)
        .fetch_one(&state.pool)
        .await
        .map_err(internal_error)?;

    let total_debits: Decimal = row.try_get("total_debits").map_err(internal_error)?;
    let total_credits: Decimal = row.try_get("total_credits").map_err(internal_error)?;
    let entry_count: i64 = row.try_get("entry_count").map_err(internal_error)?;

    Ok(Json(LedgerSummary::from_totals(
        total_debits,
        total_credits,
        entry_count.max(0) as usize,
    )))
}

pub(crate) async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LedgerEntry>, ApiError> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE id = $1");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found("ledger entry"))?;

    Ok(Json(entry_from_row(&row)?))
}

/// Posts a single row. Unpaired rows are accepted and logged at warn.
pub(crate) async fn create_entry(
    State(state): State<AppState>,
    Json(draft): Json<LedgerEntryDraft>,
) -> Result<(StatusCode, Json<LedgerEntry>), ApiError> {
    check_row(&draft)?;

    if draft.journal_id.is_none() {
        warn!(
            "single-sided {} row posted to {} for {}",
            draft
                .direction()
                .map(|direction| direction.as_str())
                .unwrap_or("empty"),
            draft.account_name,
            draft.amount()
        );
    }

    let mut tx = state.pool.begin().await.map_err(internal_error)?;
    let entry = insert_ledger_entry(&mut tx, &draft)
        .await
        .map_err(internal_error)?;
    tx.commit().await.map_err(internal_error)?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// Replaces a row. Rows belonging to a journal pair keep their amounts so the
/// pair stays balanced.
pub(crate) async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(draft): Json<LedgerEntryDraft>,
) -> Result<Json<LedgerEntry>, ApiError> {
    check_row(&draft)?;

    let mut tx = state.pool.begin().await.map_err(internal_error)?;
    let current = sqlx::query(
        "SELECT journal_id, debit_amount, credit_amount FROM ledger_entries WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(internal_error)?
    .ok_or_else(|| not_found("ledger entry"))?;

    let journal_id: Option<Uuid> = current.try_get("journal_id").map_err(internal_error)?;
    if journal_id.is_some() {
        let debit: Decimal = current.try_get("debit_amount").map_err(internal_error)?;
        let credit: Decimal = current.try_get("credit_amount").map_err(internal_error)?;
        if debit != draft.debit_amount || credit != draft.credit_amount {
            return Err(conflict(
                "amounts of a journal pair cannot be edited; post a new journal instead",
            ));
        }
    }

    sqlx::query(
        r#"
        UPDATE ledger_entries
        SET entry_type = $2,
            reference_type = $3,
            reference_id = $4,
            account_name = $5,
            description = $6,
            debit_amount = $7,
            credit_amount = $8,
            entity_id = $9,
            entity_name = $10,
            project_id = $11,
            project_title = $12,
            invoice_number = $13,
            transaction_date = $14,
            due_date = $15,
            status = $16,
            notes = $17,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(draft.entry_type.as_str())
    .bind(&draft.reference_type)
    .bind(draft.reference_id)
    .bind(&draft.account_name)
    .bind(&draft.description)
    .bind(draft.debit_amount)
    .bind(draft.credit_amount)
    .bind(draft.entity_id)
    .bind(&draft.entity_name)
    .bind(draft.project_id)
    .bind(&draft.project_title)
    .bind(&draft.invoice_number)
    .bind(draft.transaction_date)
    .bind(draft.due_date)
    .bind(draft.status.as_str())
    .bind(&draft.notes)
    .execute(&mut *tx)
    .await
    .map_err(internal_error)?;

    tx.commit().await.map_err(internal_error)?;

    Ok(Json(LedgerEntry {
        id,
        entry: LedgerEntryDraft {
            journal_id,
            ..draft
        },
    }))
}

/// Creates every row of a journal atomically after checking it balances.
pub(crate) async fn post_journal(
    State(state): State<AppState>,
    Json(submission): Json<JournalSubmission>,
) -> Result<(StatusCode, Json<JournalResponse>), ApiError> {
    let JournalSubmission {
        journal_id,
        entries,
    } = submission;

    for row in &entries {
        check_row(row)?;
    }
    let amount = check_balanced(&entries).map_err(invalid_request)?;

    let mut tx = state.pool.begin().await.map_err(internal_error)?;
    let mut created = Vec::with_capacity(entries.len());
    for row in entries {
        let row = LedgerEntryDraft {
            journal_id: Some(journal_id),
            ..row
        };
        created.push(
            insert_ledger_entry(&mut tx, &row)
                .await
                .map_err(internal_error)?,
        );
    }
    tx.commit().await.map_err(internal_error)?;

    info!(
        "journal {} posted: {} rows, {}",
        journal_id,
        created.len(),
        amount
    );

    Ok((
        StatusCode::CREATED,
        Json(JournalResponse {
            journal_id,
            entries: created,
        }),
    ))
}

fn check_row(draft: &LedgerEntryDraft) -> Result<(), ApiError> {
    if draft.account_name.trim().is_empty() {
        return Err(invalid_request("accountName is required"));
    }
    if draft.description.trim().is_empty() {
        return Err(invalid_request("description is required"));
    }
    if draft.reference_type.trim().is_empty() {
        return Err(invalid_request("referenceType is required"));
    }
    if draft.debit_amount.is_sign_negative() || draft.credit_amount.is_sign_negative() {
        return Err(invalid_request("amounts cannot be negative"));
    }
    if draft.direction().is_none() {
        return Err(invalid_request(
            "exactly one of debitAmount and creditAmount must be non-zero",
        ));
    }
    if !is_whole_cents(draft.debit_amount) || !is_whole_cents(draft.credit_amount) {
        return Err(invalid_request("amounts cannot have more than two decimal places"));
    }
    Ok(())
}

pub(crate) fn entry_from_row(row: &PgRow) -> Result<LedgerEntry, ApiError> {
    Ok(LedgerEntry {
        id: row.try_get("id").map_err(internal_error)?,
        entry: LedgerEntryDraft {
            entry_type: text_column(row, "entry_type")?,
            reference_type: row.try_get("reference_type").map_err(internal_error)?,
            reference_id: row.try_get("reference_id").map_err(internal_error)?,
            journal_id: row.try_get("journal_id").map_err(internal_error)?,
            account_name: row.try_get("account_name").map_err(internal_error)?,
            description: row.try_get("description").map_err(internal_error)?,
            debit_amount: row.try_get("debit_amount").map_err(internal_error)?,
            credit_amount: row.try_get("credit_amount").map_err(internal_error)?,
            entity_id: row.try_get("entity_id").map_err(internal_error)?,
            entity_name: row.try_get("entity_name").map_err(internal_error)?,
            project_id: row.try_get("project_id").map_err(internal_error)?,
            project_title: row.try_get("project_title").map_err(internal_error)?,
            invoice_number: row.try_get("invoice_number").map_err(internal_error)?,
            transaction_date: row.try_get("transaction_date").map_err(internal_error)?,
            due_date: row.try_get("due_date").map_err(internal_error)?,
            status: text_column(row, "status")?,
            notes: row.try_get("notes").map_err(internal_error)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use ledgerline_core::{EntryStatus, EntryType};

    use super::*;

    fn row(debit: i64, credit: i64) -> LedgerEntryDraft {
        LedgerEntryDraft {
            entry_type: EntryType::Manual,
            reference_type: "manual".to_string(),
            reference_id: None,
            journal_id: None,
            account_name: "Bank Charges".to_string(),
            description: "Monthly fee".to_string(),
            debit_amount: Decimal::new(debit, 0),
            credit_amount: Decimal::new(credit, 0),
            entity_id: None,
            entity_name: None,
            project_id: None,
            project_title: None,
            invoice_number: None,
            transaction_date: NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
            due_date: None,
            status: EntryStatus::Pending,
            notes: None,
        }
    }

    #[test]
    fn rows_must_be_single_sided() {
        assert!(check_row(&row(12, 0)).is_ok());
        assert!(check_row(&row(0, 12)).is_ok());

        let (status, _) = check_row(&row(12, 12)).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(check_row(&row(0, 0)).is_err());
        assert!(check_row(&row(-5, 0)).is_err());
    }

    #[test]
    fn sub_cent_amounts_are_rejected_before_storage() {
        let mut draft = row(0, 0);
        draft.debit_amount = Decimal::new(100005, 3);
        let (status, Json(body)) = check_row(&draft).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body.text(),
            Some("amounts cannot have more than two decimal places")
        );

        draft.debit_amount = Decimal::new(100010, 3);
        assert!(check_row(&draft).is_ok());
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let query = LedgerQuery {
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 2, 1),
            ..LedgerQuery::default()
        };
        assert!(EntryFilter::from_query(&query).is_err());
    }

    #[test]
    fn filter_normalizes_text_fields() {
        let query = LedgerQuery {
            entry_type: Some(EntryType::Payable),
            account_name: Some("  ".to_string()),
            search: Some("acme".to_string()),
            ..LedgerQuery::default()
        };
        let filter = EntryFilter::from_query(&query).unwrap();
        assert_eq!(filter.entry_type, Some("payable"));
        assert_eq!(filter.account_name, None);
        assert_eq!(filter.search.as_deref(), Some("%acme%"));
    }
}
