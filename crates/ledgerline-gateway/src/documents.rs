use std::collections::HashMap;

use ledgerline_core::LineItem;
use ledgerline_finance::{DocumentTotals, compute_totals, validate_line_items};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::{ApiError, internal_error, invalid_request};

/// Child table holding a document's line items.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ItemTable {
    CreditNote,
    Proforma,
}

impl ItemTable {
    fn table(self) -> &'static str {
        match self {
            ItemTable::CreditNote => "credit_note_items",
            ItemTable::Proforma => "proforma_items",
        }
    }

    fn owner_column(self) -> &'static str {
        match self {
            ItemTable::CreditNote => "credit_note_id",
            ItemTable::Proforma => "proforma_id",
        }
    }
}

/// Header table and number column used for sequential document numbers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NumberSeries {
    pub prefix: &'static str,
    pub table: &'static str,
    pub column: &'static str,
}

pub(crate) const CREDIT_NOTE_SERIES: NumberSeries = NumberSeries {
    prefix: "CN",
    table: "credit_notes",
    column: "credit_note_number",
};

pub(crate) const PROFORMA_SERIES: NumberSeries = NumberSeries {
    prefix: "PF",
    table: "proforma_invoices",
    column: "proforma_number",
};

pub(crate) fn format_number(prefix: &str, year: i32, sequence: i32) -> String {
    format!("{prefix}-{year}-{sequence:04}")
}

/// Next free number in the series for `year`. The unique index on the
/// column rejects a concurrent duplicate.
pub(crate) async fn next_number(
    tx: &mut Transaction<'_, Postgres>,
    series: NumberSeries,
    year: i32,
) -> Result<String, sqlx::Error> {
    let sql = format!(
        "SELECT COALESCE(MAX(CAST(SUBSTRING({column} FROM '[0-9]+$') AS INTEGER)), 0) \
         FROM {table} WHERE {column} LIKE $1",
        column = series.column,
        table = series.table,
    );
    let last: i32 = sqlx::query_scalar(&sql)
        .bind(format!("{}-{year}-%", series.prefix))
        .fetch_one(&mut **tx)
        .await?;

    Ok(format_number(series.prefix, year, last + 1))
}

/// Uses the submitted number when one was typed in.
pub(crate) fn requested_number(number: Option<&str>) -> Option<String> {
    number
        .map(str::trim)
        .filter(|number| !number.is_empty())
        .map(str::to_string)
}

/// Server-side totals. Submitted totals are never trusted.
pub(crate) fn checked_totals(
    items: &[LineItem],
    discount: Decimal,
) -> Result<DocumentTotals, ApiError> {
    validate_line_items(items).map_err(invalid_request)?;
    if discount.is_sign_negative() {
        return Err(invalid_request("discount cannot be negative"));
    }
    Ok(compute_totals(items, discount).rounded())
}

pub(crate) async fn replace_items(
    tx: &mut Transaction<'_, Postgres>,
    table: ItemTable,
    owner_id: i64,
    items: &[LineItem],
) -> Result<(), sqlx::Error> {
    let delete_sql = format!(
        "DELETE FROM {} WHERE {} = $1",
        table.table(),
        table.owner_column()
    );
    sqlx::query(&delete_sql)
        .bind(owner_id)
        .execute(&mut **tx)
        .await?;

    let insert_sql = format!(
        "INSERT INTO {} ({}, position, description, quantity, unit_price, tax_rate) \
         VALUES ($1, $2, $3, $4, $5, $6)",
        table.table(),
        table.owner_column()
    );
    for (position, item) in items.iter().enumerate() {
        sqlx::query(&insert_sql)
            .bind(owner_id)
            .bind(position as i32)
            .bind(item.description.trim())
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.tax_rate)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

/// Line items for every owner in `owner_ids`, in entry order.
pub(crate) async fn load_items(
    pool: &PgPool,
    table: ItemTable,
    owner_ids: &[i64],
) -> Result<HashMap<i64, Vec<LineItem>>, ApiError> {
    let sql = format!(
        "SELECT {owner} AS owner_id, description, quantity, unit_price, tax_rate \
         FROM {table} WHERE {owner} = ANY($1) ORDER BY {owner}, position",
        owner = table.owner_column(),
        table = table.table(),
    );
    let rows = sqlx::query(&sql)
        .bind(owner_ids)
        .fetch_all(pool)
        .await
        .map_err(internal_error)?;

    let mut items: HashMap<i64, Vec<LineItem>> = HashMap::new();
    for row in rows {
        let owner_id: i64 = row.try_get("owner_id").map_err(internal_error)?;
        let quantity: Decimal = row.try_get("quantity").map_err(internal_error)?;
        let unit_price: Decimal = row.try_get("unit_price").map_err(internal_error)?;
        let tax_rate: Option<Decimal> = row.try_get("tax_rate").map_err(internal_error)?;
        items.entry(owner_id).or_default().push(LineItem {
            description: row.try_get("description").map_err(internal_error)?,
            quantity: quantity.normalize(),
            unit_price: unit_price.normalize(),
            tax_rate: tax_rate.map(|rate| rate.normalize()),
        });
    }

    Ok(items)
}
