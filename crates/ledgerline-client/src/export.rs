//! CSV downloads for the ledger, credit note and payroll tables.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use ledgerline_core::{CreditNote, LedgerEntry, PayrollEntry, format_amount};

const LEDGER_HEADER: [&str; 10] = [
    "Date",
    "Type",
    "Account",
    "Description",
    "Entity",
    "Project",
    "Invoice #",
    "Debit",
    "Credit",
    "Status",
];

const CREDIT_NOTES_HEADER: [&str; 8] = [
    "Number",
    "Customer",
    "Issue Date",
    "Status",
    "Subtotal",
    "Tax",
    "Discount",
    "Total",
];

const PAYROLL_HEADER: [&str; 9] = [
    "Employee",
    "Month",
    "Year",
    "Working Days",
    "Basic Salary",
    "Additions",
    "Deductions",
    "Total",
    "Status",
];

pub fn ledger_csv(entries: &[LedgerEntry]) -> Result<String> {
    write_rows(
        &LEDGER_HEADER,
        entries.iter().map(|row| {
            let entry = &row.entry;
            vec![
                date(entry.transaction_date),
                entry.entry_type.to_string(),
                entry.account_name.clone(),
                entry.description.clone(),
                entry.entity_name.clone().unwrap_or_default(),
                entry.project_title.clone().unwrap_or_default(),
                entry.invoice_number.clone().unwrap_or_default(),
                format_amount(entry.debit_amount),
                format_amount(entry.credit_amount),
                entry.status.to_string(),
            ]
        }),
    )
}

pub fn credit_notes_csv(notes: &[CreditNote]) -> Result<String> {
    write_rows(
        &CREDIT_NOTES_HEADER,
        notes.iter().map(|row| {
            let note = &row.note;
            vec![
                note.credit_note_number.clone().unwrap_or_default(),
                note.customer_name.clone().unwrap_or_default(),
                date(note.issue_date),
                note.status.to_string(),
                format_amount(row.subtotal),
                format_amount(row.tax_amount),
                format_amount(note.discount),
                format_amount(row.total_amount),
            ]
        }),
    )
}

pub fn payroll_csv(entries: &[PayrollEntry]) -> Result<String> {
    write_rows(
        &PAYROLL_HEADER,
        entries.iter().map(|entry| {
            vec![
                entry.employee_name.clone().unwrap_or_default(),
                entry.month.to_string(),
                entry.year.to_string(),
                entry.working_days.to_string(),
                format_amount(entry.basic_salary),
                format_amount(entry.total_additions),
                format_amount(entry.total_deductions),
                format_amount(entry.total_amount),
                entry.status.to_string(),
            ]
        }),
    )
}

fn date(value: NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

fn write_rows<I>(header: &[&str], rows: I) -> Result<String>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut csv = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    csv.write_record(header).context("failed to write csv header")?;
    for row in rows {
        csv.write_record(&row).context("failed to write csv row")?;
    }

    let bytes = csv
        .into_inner()
        .map_err(|err| anyhow::anyhow!("failed to flush csv: {}", err.error()))?;
    String::from_utf8(bytes).context("csv output is not utf-8")
}

#[cfg(test)]
mod tests {
    use ledgerline_core::{
        CreditNoteDraft, CreditNoteStatus, EntryStatus, EntryType, LedgerEntryDraft,
        PayrollStatus,
    };
    use rust_decimal::Decimal;

    use super::*;

    fn ledger_row(account: &str, debit: i64, credit: i64) -> LedgerEntry {
        LedgerEntry {
            id: 1,
            entry: LedgerEntryDraft {
                entry_type: EntryType::Receivable,
                reference_type: "manual".to_string(),
                reference_id: None,
                journal_id: None,
                account_name: account.to_string(),
                description: "Invoice #1001, January".to_string(),
                debit_amount: Decimal::new(debit, 0),
                credit_amount: Decimal::new(credit, 0),
                entity_id: Some(7),
                entity_name: Some("Acme".to_string()),
                project_id: None,
                project_title: None,
                invoice_number: Some("INV-1001".to_string()),
                transaction_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                due_date: None,
                status: EntryStatus::Pending,
                notes: None,
            },
        }
    }

    #[test]
    fn ledger_rows_are_quoted_with_two_decimal_amounts() {
        let csv = ledger_csv(&[
            ledger_row("Accounts Receivable", 200, 0),
            ledger_row("Revenue", 0, 200),
        ])
        .unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            r#""Date","Type","Account","Description","Entity","Project","Invoice #","Debit","Credit","Status""#
        );
        assert_eq!(
            lines[1],
            r#""2024-01-15","receivable","Accounts Receivable","Invoice #1001, January","Acme","","INV-1001","200.00","0.00","pending""#
        );
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn credit_note_rows_carry_discount() {
        let note = CreditNote {
            id: 3,
            note: CreditNoteDraft {
                credit_note_number: Some("CN-2024-0003".to_string()),
                customer_id: 7,
                customer_name: Some("Acme".to_string()),
                invoice_number: None,
                issue_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                reason: None,
                items: Vec::new(),
                discount: Decimal::new(5, 0),
                status: CreditNoteStatus::Issued,
                notes: None,
            },
            subtotal: Decimal::new(100, 0),
            tax_amount: Decimal::new(10, 0),
            total_amount: Decimal::new(105, 0),
        };

        let csv = credit_notes_csv(&[note]).unwrap();
        assert_eq!(
            csv.lines().nth(1),
            Some(r#""CN-2024-0003","Acme","2024-02-01","issued","100.00","10.00","5.00","105.00""#)
        );
    }

    #[test]
    fn payroll_rows_follow_header() {
        let entry = PayrollEntry {
            id: 11,
            employee_id: 3,
            employee_name: Some("Dana".to_string()),
            month: 3,
            year: 2024,
            working_days: 21,
            basic_salary: Decimal::new(3000, 0),
            total_additions: Decimal::new(150, 0),
            total_deductions: Decimal::new(100, 0),
            total_amount: Decimal::new(3050, 0),
            status: PayrollStatus::Approved,
            notes: None,
        };

        let csv = payroll_csv(&[entry]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#""Employee","Month","Year","Working Days","Basic Salary","Additions","Deductions","Total","Status""#,
                r#""Dana","3","2024","21","3000.00","150.00","100.00","3050.00","approved""#,
            ]
        );
        assert!(csv.ends_with('\n'));
    }

    #[test]
    fn empty_export_is_just_the_header() {
        assert_eq!(payroll_csv(&[]).unwrap().lines().count(), 1);
    }
}
