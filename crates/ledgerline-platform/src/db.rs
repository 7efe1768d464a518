use anyhow::{Context, Result};
use ledgerline_core::{LedgerEntry, LedgerEntryDraft};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgPoolOptions};

pub async fn connect_database(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Inserts one ledger row inside the caller's transaction. The returned
/// amounts are the stored ones.
pub async fn insert_ledger_entry(
    tx: &mut Transaction<'_, Postgres>,
    draft: &LedgerEntryDraft,
) -> Result<LedgerEntry> {
    let row = sqlx::query(
        r#"
        INSERT INTO ledger_entries (
            entry_type, reference_type, reference_id, journal_id, account_name, description,
            debit_amount, credit_amount, entity_id, entity_name, project_id, project_title,
            invoice_number, transaction_date, due_date, status, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        RETURNING id, debit_amount, credit_amount
        "#,
    )
    .bind(draft.entry_type.as_str())
    .bind(&draft.reference_type)
    .bind(draft.reference_id)
    .bind(draft.journal_id)
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
    .fetch_one(&mut **tx)
    .await
    .with_context(|| format!("failed to insert ledger row for {}", draft.account_name))?;

    Ok(LedgerEntry {
        id: row.try_get("id")?,
        entry: LedgerEntryDraft {
            debit_amount: row.try_get("debit_amount")?,
            credit_amount: row.try_get("credit_amount")?,
            ..draft.clone()
        },
    })
}
