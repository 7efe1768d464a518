use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

text_enum!(EntryType, "entry type" {
    Receivable => "receivable",
    Payable => "payable",
    Manual => "manual",
});

text_enum!(EntryStatus, "entry status" {
    Pending => "pending",
    Paid => "paid",
    Overdue => "overdue",
    Cancelled => "cancelled",
});

text_enum!(
    /// Side of a single-row manual posting.
    EntryDirection, "entry direction" {
        Debit => "debit",
        Credit => "credit",
    }
);

text_enum!(
    /// What a ledger form is posted against.
    AccountType, "account type" {
        Customer => "customer",
        Supplier => "supplier",
        Project => "project",
        Account => "account",
    }
);

impl Default for EntryStatus {
    fn default() -> Self {
        EntryStatus::Pending
    }
}

/// The party or account a receivable/payable is booked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Counterpart {
    Customer { id: i64, name: String },
    Supplier { id: i64, name: String },
    Project { id: i64, name: String },
    Account { name: String },
}

impl Counterpart {
    pub fn account_type(&self) -> AccountType {
        match self {
            Counterpart::Customer { .. } => AccountType::Customer,
            Counterpart::Supplier { .. } => AccountType::Supplier,
            Counterpart::Project { .. } => AccountType::Project,
            Counterpart::Account { .. } => AccountType::Account,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Counterpart::Customer { name, .. }
            | Counterpart::Supplier { name, .. }
            | Counterpart::Project { name, .. }
            | Counterpart::Account { name } => name,
        }
    }

    /// `(entityId, entityName)` for customers and suppliers.
    pub fn entity(&self) -> Option<(i64, &str)> {
        match self {
            Counterpart::Customer { id, name } | Counterpart::Supplier { id, name } => {
                Some((*id, name.as_str()))
            }
            _ => None,
        }
    }

    /// `(projectId, projectTitle)` for projects.
    pub fn project(&self) -> Option<(i64, &str)> {
        match self {
            Counterpart::Project { id, name } => Some((*id, name.as_str())),
            _ => None,
        }
    }
}

/// A ledger row before the backend has assigned it an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryDraft {
    pub entry_type: EntryType,
    pub reference_type: String,
    #[serde(default)]
    pub reference_id: Option<i64>,
    /// Shared by both rows of a journal pair.
    #[serde(default)]
    pub journal_id: Option<Uuid>,
    pub account_name: String,
    pub description: String,
    pub debit_amount: Decimal,
    pub credit_amount: Decimal,
    #[serde(default)]
    pub entity_id: Option<i64>,
    #[serde(default)]
    pub entity_name: Option<String>,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub project_title: Option<String>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    pub transaction_date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: EntryStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LedgerEntryDraft {
    pub fn direction(&self) -> Option<EntryDirection> {
        match (self.debit_amount.is_zero(), self.credit_amount.is_zero()) {
            (false, true) => Some(EntryDirection::Debit),
            (true, false) => Some(EntryDirection::Credit),
            _ => None,
        }
    }

    /// Non-zero side of the row, or zero for an empty row.
    pub fn amount(&self) -> Decimal {
        if self.debit_amount.is_zero() {
            self.credit_amount
        } else {
            self.debit_amount
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: i64,
    #[serde(flatten)]
    pub entry: LedgerEntryDraft,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counterpart_wire_shape() {
        let customer: Counterpart =
            serde_json::from_str(r#"{"type":"customer","id":7,"name":"Acme"}"#).unwrap();
        assert_eq!(customer.entity(), Some((7, "Acme")));
        assert_eq!(customer.account_type(), AccountType::Customer);

        let account: Counterpart =
            serde_json::from_str(r#"{"type":"account","name":"Rent"}"#).unwrap();
        assert_eq!(account.name(), "Rent");
        assert!(account.entity().is_none());
        assert!(account.project().is_none());
    }

    #[test]
    fn enum_text_round_trips_through_storage_names() {
        for status in EntryStatus::ALL {
            assert_eq!(status.as_str().parse::<EntryStatus>().unwrap(), *status);
        }
        assert_eq!(" Payable ".parse::<EntryType>().unwrap(), EntryType::Payable);
        let err = "loan".parse::<EntryType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown entry type: loan");
    }

    #[test]
    fn entry_serializes_camel_case_with_string_amounts() {
        let entry = LedgerEntry {
            id: 3,
            entry: LedgerEntryDraft {
                entry_type: EntryType::Manual,
                reference_type: "manual".to_string(),
                reference_id: None,
                journal_id: None,
                account_name: "Cash".to_string(),
                description: "Float".to_string(),
                debit_amount: Decimal::new(5000, 2),
                credit_amount: Decimal::ZERO,
                entity_id: None,
                entity_name: None,
                project_id: None,
                project_title: None,
                invoice_number: None,
                transaction_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                due_date: None,
                status: EntryStatus::Pending,
                notes: None,
            },
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["accountName"], "Cash");
        assert_eq!(json["debitAmount"], "50.00");
        assert_eq!(json["creditAmount"], "0");
        assert_eq!(json["entryType"], "manual");
        assert_eq!(entry.entry.direction(), Some(EntryDirection::Debit));

        let back: LedgerEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
