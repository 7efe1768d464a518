use ledgerline_core::{LedgerEntryDraft, is_whole_cents};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BalanceError {
    #[error("journal has no rows")]
    Empty,
    #[error("row {index} has a negative amount")]
    Negative { index: usize },
    #[error("row {index} has an amount finer than one cent")]
    SubCent { index: usize },
    #[error("row {index} must carry exactly one non-zero side")]
    NotSingleSided { index: usize },
    #[error("journal is unbalanced: debits {debits} != credits {credits}")]
    Unbalanced { debits: Decimal, credits: Decimal },
}

/// Verifies a set of rows posted together balances. Amounts must already be
/// whole cents, the precision they are stored at. Returns the balanced total
/// on success.
pub fn check_balanced(rows: &[LedgerEntryDraft]) -> Result<Decimal, BalanceError> {
    if rows.is_empty() {
        return Err(BalanceError::Empty);
    }

    let mut debits = Decimal::ZERO;
    let mut credits = Decimal::ZERO;
    for (index, row) in rows.iter().enumerate() {
        if row.debit_amount.is_sign_negative() || row.credit_amount.is_sign_negative() {
            return Err(BalanceError::Negative { index });
        }
        if row.direction().is_none() {
            return Err(BalanceError::NotSingleSided { index });
        }
        if !is_whole_cents(row.debit_amount) || !is_whole_cents(row.credit_amount) {
            return Err(BalanceError::SubCent { index });
        }
        debits += row.debit_amount;
        credits += row.credit_amount;
    }

    if debits != credits {
        return Err(BalanceError::Unbalanced { debits, credits });
    }

    Ok(debits)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    /// Debits minus credits.
    pub balance: Decimal,
    pub entry_count: usize,
}

impl LedgerSummary {
    /// Summary from totals aggregated elsewhere, e.g. by the database.
    pub fn from_totals(total_debits: Decimal, total_credits: Decimal, entry_count: usize) -> Self {
        Self {
            total_debits,
            total_credits,
            balance: total_debits - total_credits,
            entry_count,
        }
    }
}

pub fn summarize<'a>(rows: impl IntoIterator<Item = &'a LedgerEntryDraft>) -> LedgerSummary {
    let (debits, credits, count) = rows
        .into_iter()
        .fold((Decimal::ZERO, Decimal::ZERO, 0), |(debits, credits, count), row| {
            (debits + row.debit_amount, credits + row.credit_amount, count + 1)
        });
    LedgerSummary::from_totals(debits, credits, count)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use ledgerline_core::{EntryStatus, EntryType};

    use super::*;

    fn row(account: &str, debit: i64, credit: i64) -> LedgerEntryDraft {
        LedgerEntryDraft {
            entry_type: EntryType::Manual,
            reference_type: "manual".to_string(),
            reference_id: None,
            journal_id: None,
            account_name: account.to_string(),
            description: "test".to_string(),
            debit_amount: Decimal::new(debit, 0),
            credit_amount: Decimal::new(credit, 0),
            entity_id: None,
            entity_name: None,
            project_id: None,
            project_title: None,
            invoice_number: None,
            transaction_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            due_date: None,
            status: EntryStatus::Pending,
            notes: None,
        }
    }

    #[test]
    fn balanced_rows_pass() {
        let rows = vec![row("Cash", 100, 0), row("Revenue", 0, 60), row("Tax", 0, 40)];
        assert_eq!(check_balanced(&rows), Ok(Decimal::new(100, 0)));
    }

    #[test]
    fn unbalanced_rows_fail() {
        let rows = vec![row("Cash", 100, 0), row("Revenue", 0, 90)];
        assert_eq!(
            check_balanced(&rows),
            Err(BalanceError::Unbalanced {
                debits: Decimal::new(100, 0),
                credits: Decimal::new(90, 0),
            })
        );
    }

    #[test]
    fn row_shape_is_enforced() {
        assert_eq!(check_balanced(&[]), Err(BalanceError::Empty));
        assert_eq!(
            check_balanced(&[row("Cash", 10, 10)]),
            Err(BalanceError::NotSingleSided { index: 0 })
        );
        assert_eq!(
            check_balanced(&[row("Cash", 10, 0), row("Revenue", 0, 0)]),
            Err(BalanceError::NotSingleSided { index: 1 })
        );
        assert_eq!(
            check_balanced(&[row("Cash", -10, 0)]),
            Err(BalanceError::Negative { index: 0 })
        );
    }

    #[test]
    fn sub_cent_rows_are_refused_before_summing() {
        let mut debit = row("Cash", 0, 0);
        debit.debit_amount = Decimal::new(100005, 3);
        let mut first = row("Revenue", 0, 0);
        first.credit_amount = Decimal::new(500025, 4);
        let second = first.clone();

        assert_eq!(
            check_balanced(&[debit, first, second]),
            Err(BalanceError::SubCent { index: 0 })
        );
    }

    #[test]
    fn summary_nets_debits_against_credits() {
        let rows = vec![row("Cash", 100, 0), row("Revenue", 0, 30)];
        let summary = summarize(&rows);
        assert_eq!(summary.total_debits, Decimal::new(100, 0));
        assert_eq!(summary.total_credits, Decimal::new(30, 0));
        assert_eq!(summary.balance, Decimal::new(70, 0));
        assert_eq!(summary.entry_count, 2);
        assert_eq!(
            LedgerSummary::from_totals(Decimal::new(100, 0), Decimal::new(30, 0), 2),
            summary
        );
    }
}
