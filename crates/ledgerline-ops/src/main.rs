use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use futures_util::StreamExt;
use ledgerline_core::{
    Counterpart, EntryStatus, GeneralLedgerProfile, LedgerEntryDraft, PayrollEntry,
    PayrollStatus,
};
use ledgerline_finance::{
    JournalKind, JournalRequest, build_journal_pair, payroll::PAYROLL_REFERENCE_TYPE,
    payroll_postings,
};
use ledgerline_platform::{
    PAYROLL_PAID_CHANNEL, PROFORMA_CONVERTED_CHANNEL, PayrollPaidEvent, ProformaConvertedEvent,
    RedisBus, ServiceConfig, connect_database, insert_ledger_entry,
};
use redis::Msg;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{error, info};

const INVOICE_REFERENCE_TYPE: &str = "sales_invoice";

#[derive(Debug, Clone, PartialEq, Eq)]
enum LedgerEvent {
    PayrollPaid(PayrollPaidEvent),
    ProformaConverted(ProformaConvertedEvent),
}

impl LedgerEvent {
    fn parse(channel: &str, payload: &str) -> Result<Self> {
        match channel {
            PAYROLL_PAID_CHANNEL => Ok(Self::PayrollPaid(serde_json::from_str(payload)?)),
            PROFORMA_CONVERTED_CHANNEL => {
                Ok(Self::ProformaConverted(serde_json::from_str(payload)?))
            }
            other => anyhow::bail!("unexpected channel: {other}"),
        }
    }
}

/// Sales invoice fields needed for its receivable posting.
#[derive(Debug, Clone)]
struct InvoiceRecord {
    id: i64,
    invoice_number: String,
    customer_id: i64,
    customer_name: Option<String>,
    project_id: Option<i64>,
    issue_date: NaiveDate,
    due_date: Option<NaiveDate>,
    total_amount: Decimal,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ledgerline_ops=info".to_string()),
        )
        .init();

    let config = ServiceConfig::worker_from_env()?;
    let pool = connect_database(&config.database_url).await?;
    let redis = RedisBus::connect(&config.redis_url)?;

    let mut pubsub = redis.client().get_async_pubsub().await?;
    pubsub.subscribe(PAYROLL_PAID_CHANNEL).await?;
    pubsub.subscribe(PROFORMA_CONVERTED_CHANNEL).await?;
    let mut messages = pubsub.on_message();

    info!(
        "ops worker subscribed to {} and {}",
        PAYROLL_PAID_CHANNEL, PROFORMA_CONVERTED_CHANNEL
    );

    for backlog in Backlog::ALL {
        if let Err(err) = backlog.sweep(&pool).await {
            error!("failed to sweep {} backlog: {err:#}", backlog.reference_type());
        }
    }

    loop {
        let msg = messages
            .next()
            .await
            .context("ledger event stream ended unexpectedly")?;
        if let Err(err) = handle_message(&pool, msg).await {
            error!("failed to process message: {err:#}");
        }
    }
}

/// Documents whose posting event may have been missed while the worker was
/// down or the publish failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backlog {
    PaidPayroll,
    SalesInvoices,
}

impl Backlog {
    const ALL: [Backlog; 2] = [Backlog::PaidPayroll, Backlog::SalesInvoices];

    fn reference_type(self) -> &'static str {
        match self {
            Backlog::PaidPayroll => PAYROLL_REFERENCE_TYPE,
            Backlog::SalesInvoices => INVOICE_REFERENCE_TYPE,
        }
    }

    /// Ids with no ledger rows for this reference type. `$1` is the
    /// reference type.
    fn unposted_sql(self) -> String {
        let (table, condition) = match self {
            Backlog::PaidPayroll => ("payroll_entries", "d.status = 'paid'"),
            Backlog::SalesInvoices => ("sales_invoices", "d.total_amount > 0"),
        };
        format!(
            "SELECT d.id FROM {table} d \
             WHERE {condition} \
               AND NOT EXISTS ( \
                   SELECT 1 FROM ledger_entries l \
                   WHERE l.reference_type = $1 AND l.reference_id = d.id) \
             ORDER BY d.id"
        )
    }

    async fn post(self, pool: &PgPool, id: i64) -> Result<usize> {
        match self {
            Backlog::PaidPayroll => post_payroll(pool, id).await,
            Backlog::SalesInvoices => post_invoice(pool, id).await,
        }
    }

    async fn sweep(self, pool: &PgPool) -> Result<()> {
        let ids: Vec<i64> = sqlx::query_scalar(&self.unposted_sql())
            .bind(self.reference_type())
            .fetch_all(pool)
            .await?;
        if ids.is_empty() {
            return Ok(());
        }

        info!(
            "posting {} unposted {} documents",
            ids.len(),
            self.reference_type()
        );
        for id in ids {
            match self.post(pool, id).await {
                Ok(posted) => info!(
                    "{} {} posted {} ledger rows",
                    self.reference_type(),
                    id,
                    posted
                ),
                Err(err) => error!("failed to post {} {}: {err:#}", self.reference_type(), id),
            }
        }
        Ok(())
    }
}

async fn handle_message(pool: &PgPool, msg: Msg) -> Result<()> {
    let payload: String = msg.get_payload()?;

    match LedgerEvent::parse(msg.get_channel_name(), &payload)? {
        LedgerEvent::PayrollPaid(event) => {
            let posted = post_payroll(pool, event.payroll_id).await?;
            info!("payroll entry {} posted {} ledger rows", event.payroll_id, posted);
        }
        LedgerEvent::ProformaConverted(event) => {
            let posted = post_invoice(pool, event.invoice_id).await?;
            info!(
                "invoice {} from proforma {} posted {} ledger rows",
                event.invoice_id, event.proforma_id, posted
            );
        }
    }

    Ok(())
}

/// Books salary expense against payroll payable. Redelivered events find
/// the rows already present and post nothing.
async fn post_payroll(pool: &PgPool, payroll_id: i64) -> Result<usize> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        r#"
        SELECT
            p.id, p.employee_id, e.name AS employee_name, p.month, p.year, p.working_days,
            p.basic_salary, p.total_additions, p.total_deductions, p.total_amount, p.status,
            p.notes
        FROM payroll_entries p
        JOIN employees e ON e.id = p.employee_id
        WHERE p.id = $1
        FOR UPDATE OF p
        "#,
    )
    .bind(payroll_id)
    .fetch_optional(&mut *tx)
    .await?
    .context("payroll entry not found")?;

    let status: String = row.try_get("status")?;
    let entry = PayrollEntry {
        id: row.try_get("id")?,
        employee_id: row.try_get("employee_id")?,
        employee_name: row.try_get("employee_name")?,
        month: row.try_get("month")?,
        year: row.try_get("year")?,
        working_days: row.try_get("working_days")?,
        basic_salary: row.try_get("basic_salary")?,
        total_additions: row.try_get("total_additions")?,
        total_deductions: row.try_get("total_deductions")?,
        total_amount: row.try_get("total_amount")?,
        status: status.parse()?,
        notes: row.try_get("notes")?,
    };

    if entry.status != PayrollStatus::Paid {
        anyhow::bail!("payroll entry {payroll_id} is {} and cannot be posted", entry.status);
    }
    if already_posted(&mut tx, PAYROLL_REFERENCE_TYPE, payroll_id).await? {
        info!("payroll entry {} already posted, skipping", payroll_id);
        return Ok(0);
    }

    let rows = payroll_postings(&GeneralLedgerProfile, &entry, Utc::now().date_naive())?;
    for draft in &rows {
        insert_ledger_entry(&mut tx, draft).await?;
    }
    tx.commit().await?;

    Ok(rows.len())
}

/// Books the converted invoice as a receivable against revenue.
async fn post_invoice(pool: &PgPool, invoice_id: i64) -> Result<usize> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        r#"
        SELECT id, invoice_number, customer_id, customer_name, project_id, issue_date, due_date,
               total_amount
        FROM sales_invoices
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(invoice_id)
    .fetch_optional(&mut *tx)
    .await?
    .context("sales invoice not found")?;

    let invoice = InvoiceRecord {
        id: row.try_get("id")?,
        invoice_number: row.try_get("invoice_number")?,
        customer_id: row.try_get("customer_id")?,
        customer_name: row.try_get("customer_name")?,
        project_id: row.try_get("project_id")?,
        issue_date: row.try_get("issue_date")?,
        due_date: row.try_get("due_date")?,
        total_amount: row.try_get("total_amount")?,
    };

    if already_posted(&mut tx, INVOICE_REFERENCE_TYPE, invoice_id).await? {
        info!("invoice {} already posted, skipping", invoice_id);
        return Ok(0);
    }

    let rows = invoice_postings(&invoice)?;
    for draft in &rows {
        insert_ledger_entry(&mut tx, draft).await?;
    }
    tx.commit().await?;

    Ok(rows.len())
}

fn invoice_postings(invoice: &InvoiceRecord) -> Result<Vec<LedgerEntryDraft>> {
    let customer = invoice
        .customer_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| format!("Customer #{}", invoice.customer_id));

    let pair = build_journal_pair(&JournalRequest {
        kind: JournalKind::Receivable,
        amount: invoice.total_amount,
        counterpart: Counterpart::Customer {
            id: invoice.customer_id,
            name: customer,
        },
        description: format!("Invoice {}", invoice.invoice_number),
        invoice_number: Some(invoice.invoice_number.clone()),
        notes: None,
        transaction_date: invoice.issue_date,
        due_date: invoice.due_date,
        status: EntryStatus::Pending,
    })
    .with_context(|| format!("invoice {} cannot be posted", invoice.invoice_number))?;

    Ok(pair
        .into_rows()
        .into_iter()
        .map(|row| LedgerEntryDraft {
            reference_type: INVOICE_REFERENCE_TYPE.to_string(),
            reference_id: Some(invoice.id),
            project_id: invoice.project_id,
            ..row
        })
        .collect())
}

async fn already_posted(
    tx: &mut Transaction<'_, Postgres>,
    reference_type: &str,
    reference_id: i64,
) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM ledger_entries WHERE reference_type = $1 AND reference_id = $2)",
    )
    .bind(reference_type)
    .bind(reference_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(exists)
}
