use chrono::{Datelike, NaiveDate, Weekday};
use ledgerline_core::{
    AdjustmentKind, Employee, EntryStatus, EntryType, LedgerEntryDraft, PayrollAdjustment,
    PayrollEntry, PayrollStatus, StandardsProfile,
};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

pub const PAYROLL_REFERENCE_TYPE: &str = "payroll";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayrollError {
    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(i32),
    #[error("additions and deductions can only change while the entry is draft (it is {0})")]
    AdjustmentsLocked(PayrollStatus),
    #[error("adjustment amount must be greater than zero")]
    NonPositiveAdjustment,
    #[error("payroll entry total must be greater than zero to post")]
    NothingToPost,
}

/// Monday to Friday days in the month.
pub fn working_days(year: i32, month: i32) -> Result<i32, PayrollError> {
    let first = u32::try_from(month)
        .ok()
        .and_then(|m| NaiveDate::from_ymd_opt(year, m, 1))
        .ok_or(PayrollError::InvalidMonth(month))?;

    let count = first
        .iter_days()
        .take_while(|day| day.month() == first.month())
        .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
        .count();

    Ok(count as i32)
}

pub fn payroll_total(basic_salary: Decimal, additions: Decimal, deductions: Decimal) -> Decimal {
    basic_salary + additions - deductions
}

/// Recomputes the entry's aggregates from its child rows.
pub fn recalculate(entry: &mut PayrollEntry, adjustments: &[PayrollAdjustment]) {
    let sum = |kind: AdjustmentKind| -> Decimal {
        adjustments
            .iter()
            .filter(|adjustment| adjustment.kind == kind)
            .map(|adjustment| adjustment.amount)
            .sum()
    };

    entry.total_additions = sum(AdjustmentKind::Addition);
    entry.total_deductions = sum(AdjustmentKind::Deduction);
    entry.total_amount = payroll_total(
        entry.basic_salary,
        entry.total_additions,
        entry.total_deductions,
    );
}

pub fn ensure_adjustable(status: PayrollStatus) -> Result<(), PayrollError> {
    if status == PayrollStatus::Draft {
        Ok(())
    } else {
        Err(PayrollError::AdjustmentsLocked(status))
    }
}

/// Draft entries for every active employee without one for the period.
pub fn generate_period(
    employees: &[Employee],
    month: i32,
    year: i32,
    already_generated: &[i64],
) -> Result<Vec<PayrollEntry>, PayrollError> {
    let days = working_days(year, month)?;

    Ok(employees
        .iter()
        .filter(|employee| employee.active && !already_generated.contains(&employee.id))
        .map(|employee| PayrollEntry {
            id: 0,
            employee_id: employee.id,
            employee_name: Some(employee.name.clone()),
            month,
            year,
            working_days: days,
            basic_salary: employee.basic_salary,
            total_additions: Decimal::ZERO,
            total_deductions: Decimal::ZERO,
            total_amount: employee.basic_salary,
            status: PayrollStatus::Draft,
            notes: None,
        })
        .collect())
}

/// Salary Expense (debit) against Payroll Payable (credit) for a paid entry.
pub fn payroll_postings<P: StandardsProfile>(
    profile: &P,
    entry: &PayrollEntry,
    posted_on: NaiveDate,
) -> Result<Vec<LedgerEntryDraft>, PayrollError> {
    if entry.total_amount <= Decimal::ZERO {
        return Err(PayrollError::NothingToPost);
    }

    let coa = profile.chart_of_accounts();
    let employee = entry
        .employee_name
        .clone()
        .unwrap_or_else(|| format!("Employee #{}", entry.employee_id));
    let template = LedgerEntryDraft {
        entry_type: EntryType::Payable,
        reference_type: PAYROLL_REFERENCE_TYPE.to_string(),
        reference_id: Some(entry.id),
        journal_id: Some(Uuid::new_v4()),
        account_name: String::new(),
        description: format!("Salary {employee} {:02}/{}", entry.month, entry.year),
        debit_amount: Decimal::ZERO,
        credit_amount: Decimal::ZERO,
        entity_id: None,
        entity_name: None,
        project_id: None,
        project_title: None,
        invoice_number: None,
        transaction_date: posted_on,
        due_date: None,
        status: EntryStatus::Paid,
        notes: entry.notes.clone(),
    };

    Ok(vec![
        LedgerEntryDraft {
            account_name: coa.salary_expense,
            debit_amount: entry.total_amount,
            ..template.clone()
        },
        LedgerEntryDraft {
            account_name: coa.payroll_payable,
            credit_amount: entry.total_amount,
            ..template
        },
    ])
}
