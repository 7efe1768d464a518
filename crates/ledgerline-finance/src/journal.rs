use chrono::NaiveDate;
use ledgerline_core::{
    Counterpart, EntryStatus, EntryType, GeneralLedgerProfile, LedgerEntryDraft, StandardsProfile,
    is_whole_cents,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::{ValidationErrors, ValidationIssue, non_blank};

pub const JOURNAL_REFERENCE_TYPE: &str = "manual";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalKind {
    Receivable,
    Payable,
}

impl JournalKind {
    pub fn entry_type(&self) -> EntryType {
        match self {
            JournalKind::Receivable => EntryType::Receivable,
            JournalKind::Payable => EntryType::Payable,
        }
    }
}

/// A single receivable or payable event, as entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalRequest {
    pub kind: JournalKind,
    pub amount: Decimal,
    pub counterpart: Counterpart,
    pub description: String,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub transaction_date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: EntryStatus,
}

/// Two rows booked together: one debit, one credit, same amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalPair {
    pub journal_id: Uuid,
    pub debit: LedgerEntryDraft,
    pub credit: LedgerEntryDraft,
}

impl JournalPair {
    pub fn rows(&self) -> [&LedgerEntryDraft; 2] {
        [&self.debit, &self.credit]
    }

    pub fn into_rows(self) -> Vec<LedgerEntryDraft> {
        vec![self.debit, self.credit]
    }

    pub fn amount(&self) -> Decimal {
        self.debit.debit_amount
    }
}

pub fn build_journal_pair(request: &JournalRequest) -> Result<JournalPair, ValidationErrors> {
    build_journal_pair_with(&GeneralLedgerProfile, request)
}

/// Receivable: debit Accounts Receivable, credit the picked account or
/// Revenue. Payable: debit the picked account or Operating Expenses, credit
/// Accounts Payable. The amount is used exactly as entered.
pub fn build_journal_pair_with<P: StandardsProfile>(
    profile: &P,
    request: &JournalRequest,
) -> Result<JournalPair, ValidationErrors> {
    check_request(request)?;

    let coa = profile.chart_of_accounts();
    let picked_account = match &request.counterpart {
        Counterpart::Account { name } => Some(name.trim().to_string()),
        _ => None,
    };

    let (debit_account, credit_account) = match request.kind {
        JournalKind::Receivable => (
            coa.accounts_receivable,
            picked_account.unwrap_or(coa.revenue),
        ),
        JournalKind::Payable => (
            picked_account.unwrap_or(coa.operating_expenses),
            coa.accounts_payable,
        ),
    };

    let journal_id = Uuid::new_v4();
    let template = row_template(request, journal_id);

    Ok(JournalPair {
        journal_id,
        debit: LedgerEntryDraft {
            account_name: debit_account,
            debit_amount: request.amount,
            credit_amount: Decimal::ZERO,
            ..template.clone()
        },
        credit: LedgerEntryDraft {
            account_name: credit_account,
            debit_amount: Decimal::ZERO,
            credit_amount: request.amount,
            ..template
        },
    })
}

fn check_request(request: &JournalRequest) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if request.description.trim().is_empty() {
        errors.push(ValidationIssue::MissingDescription);
    }
    if request.amount <= Decimal::ZERO {
        errors.push(ValidationIssue::NonPositiveAmount);
    } else if !is_whole_cents(request.amount) {
        errors.push(ValidationIssue::SubCentAmount);
    }
    if request.counterpart.name().trim().is_empty() {
        errors.push(match request.counterpart {
            Counterpart::Customer { .. } => ValidationIssue::MissingCustomer,
            Counterpart::Supplier { .. } => ValidationIssue::MissingSupplier,
            Counterpart::Project { .. } => ValidationIssue::MissingProject,
            Counterpart::Account { .. } => ValidationIssue::MissingAccount,
        });
    }

    errors.into_result()
}

fn row_template(request: &JournalRequest, journal_id: Uuid) -> LedgerEntryDraft {
    let entity = request.counterpart.entity();
    let project = request.counterpart.project();

    LedgerEntryDraft {
        entry_type: request.kind.entry_type(),
        reference_type: JOURNAL_REFERENCE_TYPE.to_string(),
        reference_id: None,
        journal_id: Some(journal_id),
        account_name: String::new(),
        description: request.description.trim().to_string(),
        debit_amount: Decimal::ZERO,
        credit_amount: Decimal::ZERO,
        entity_id: entity.map(|(id, _)| id),
        entity_name: entity.map(|(_, name)| name.to_string()),
        project_id: project.map(|(id, _)| id),
        project_title: project.map(|(_, title)| title.to_string()),
        invoice_number: non_blank(request.invoice_number.clone()),
        transaction_date: request.transaction_date,
        due_date: request.due_date,
        status: request.status,
        notes: non_blank(request.notes.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::check_balanced;

    fn request(kind: JournalKind, amount: Decimal, counterpart: Counterpart) -> JournalRequest {
        JournalRequest {
            kind,
            amount,
            counterpart,
            description: "Invoice #1001".to_string(),
            invoice_number: Some("1001".to_string()),
            notes: None,
            transaction_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 2, 14),
            status: EntryStatus::Pending,
        }
    }

    fn acme() -> Counterpart {
        Counterpart::Customer {
            id: 7,
            name: "Acme".to_string(),
        }
    }

    #[test]
    fn receivable_for_customer() {
        let pair = build_journal_pair(&request(
            JournalKind::Receivable,
            Decimal::new(200, 0),
            acme(),
        ))
        .unwrap();

        assert_eq!(pair.debit.account_name, "Accounts Receivable");
        assert_eq!(pair.debit.debit_amount.to_string(), "200");
        assert_eq!(pair.debit.credit_amount.to_string(), "0");
        assert_eq!(pair.credit.account_name, "Revenue");
        assert_eq!(pair.credit.debit_amount.to_string(), "0");
        assert_eq!(pair.credit.credit_amount.to_string(), "200");

        for row in pair.rows() {
            assert_eq!(row.entity_id, Some(7));
            assert_eq!(row.entity_name.as_deref(), Some("Acme"));
            assert_eq!(row.entry_type, EntryType::Receivable);
            assert_eq!(row.journal_id, Some(pair.journal_id));
            assert_eq!(row.invoice_number.as_deref(), Some("1001"));
            assert_eq!(row.project_id, None);
        }
    }

    #[test]
    fn receivable_against_picked_account_credits_it() {
        let pair = build_journal_pair(&request(
            JournalKind::Receivable,
            Decimal::new(7550, 2),
            Counterpart::Account {
                name: "Interest Income".to_string(),
            },
        ))
        .unwrap();

        assert_eq!(pair.debit.account_name, "Accounts Receivable");
        assert_eq!(pair.credit.account_name, "Interest Income");
        assert_eq!(pair.debit.entity_id, None);
    }

    #[test]
    fn payable_for_project_and_account() {
        let project = build_journal_pair(&request(
            JournalKind::Payable,
            Decimal::new(1250, 1),
            Counterpart::Project {
                id: 3,
                name: "Warehouse fit-out".to_string(),
            },
        ))
        .unwrap();
        assert_eq!(project.debit.account_name, "Operating Expenses");
        assert_eq!(project.credit.account_name, "Accounts Payable");
        assert_eq!(project.credit.project_id, Some(3));
        assert_eq!(project.credit.project_title.as_deref(), Some("Warehouse fit-out"));
        assert_eq!(project.credit.entity_id, None);

        let rent = build_journal_pair(&request(
            JournalKind::Payable,
            Decimal::new(900, 0),
            Counterpart::Account {
                name: "Rent".to_string(),
            },
        ))
        .unwrap();
        assert_eq!(rent.debit.account_name, "Rent");
        assert_eq!(rent.credit.account_name, "Accounts Payable");
    }

    #[test]
    fn pairs_always_balance_to_input_amount() {
        let amounts = [
            Decimal::new(1, 2),
            Decimal::new(19999, 2),
            Decimal::new(123456780, 3),
            Decimal::new(5, 0),
        ];
        for kind in [JournalKind::Receivable, JournalKind::Payable] {
            for amount in amounts {
                let pair = build_journal_pair(&request(kind, amount, acme())).unwrap();
                let debits = pair.debit.debit_amount + pair.credit.debit_amount;
                let credits = pair.debit.credit_amount + pair.credit.credit_amount;

                assert_eq!(debits, amount);
                assert_eq!(credits, amount);
                assert_eq!(pair.debit.debit_amount.to_string(), amount.to_string());
                assert_eq!(pair.credit.credit_amount.to_string(), amount.to_string());
                assert_eq!(check_balanced(&pair.clone().into_rows()), Ok(amount));
            }
        }
    }

    #[test]
    fn fractions_of_a_cent_are_refused() {
        let errors = build_journal_pair(&request(
            JournalKind::Receivable,
            Decimal::new(100005, 3),
            acme(),
        ))
        .unwrap_err();
        assert_eq!(errors.issues(), &[ValidationIssue::SubCentAmount]);
    }

    #[test]
    fn rejects_before_building() {
        let mut bad = request(JournalKind::Receivable, Decimal::ZERO, Counterpart::Account {
            name: " ".to_string(),
        });
        bad.description = String::new();

        let errors = build_journal_pair(&bad).unwrap_err();
        assert_eq!(
            errors.issues(),
            &[
                ValidationIssue::MissingDescription,
                ValidationIssue::NonPositiveAmount,
                ValidationIssue::MissingAccount,
            ]
        );
    }

    #[test]
    fn request_wire_shape() {
        let request: JournalRequest = serde_json::from_str(
            r#"{
                "kind": "receivable",
                "amount": "200",
                "counterpart": {"type": "customer", "id": 7, "name": "Acme"},
                "description": "Invoice #1001",
                "transactionDate": "2024-01-15"
            }"#,
        )
        .unwrap();

        assert_eq!(request.kind, JournalKind::Receivable);
        assert_eq!(request.counterpart, acme());
        assert_eq!(request.status, EntryStatus::Pending);
    }
}
