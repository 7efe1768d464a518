//! Form validation ahead of submission. Validation never mutates the form
//! and reports every problem at once.

use std::fmt;

use chrono::NaiveDate;
use ledgerline_core::{
    AccountType, AmountError, Counterpart, EntryStatus, LineItem, is_whole_cents, parse_amount,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::journal::{JournalKind, JournalRequest};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("Description is required")]
    MissingDescription,
    #[error("Name is required")]
    MissingName,
    #[error("Amount is required")]
    MissingAmount,
    #[error("Amount '{0}' is not a valid number")]
    InvalidAmount(String),
    #[error("Amount must be greater than zero")]
    NonPositiveAmount,
    #[error("Amount cannot have more than two decimal places")]
    SubCentAmount,
    #[error("Transaction date is required")]
    MissingTransactionDate,
    #[error("Please select a customer")]
    MissingCustomer,
    #[error("Please select a supplier")]
    MissingSupplier,
    #[error("Please select a project")]
    MissingProject,
    #[error("Please select an account")]
    MissingAccount,
    #[error("At least one line item is required")]
    NoLineItems,
    #[error("Line {line}: description is required")]
    MissingLineDescription { line: usize },
    #[error("Line {line}: quantity and unit price cannot be negative")]
    NegativeLineValue { line: usize },
    #[error("Line {line}: tax rate must be between 0 and 100")]
    TaxRateOutOfRange { line: usize },
}

impl From<AmountError> for ValidationIssue {
    fn from(err: AmountError) -> Self {
        match err {
            AmountError::Empty => ValidationIssue::MissingAmount,
            AmountError::Invalid(raw) => ValidationIssue::InvalidAmount(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors {
    issues: Vec<ValidationIssue>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn contains(&self, issue: &ValidationIssue) -> bool {
        self.issues.contains(issue)
    }

    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<ValidationIssue> for ValidationErrors {
    fn from(issue: ValidationIssue) -> Self {
        Self {
            issues: vec![issue],
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRef {
    pub id: i64,
    pub name: String,
}

impl PartyRef {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// State of the receivable/payable entry form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerForm {
    pub description: String,
    pub amount: String,
    pub transaction_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub account_type: Option<AccountType>,
    pub customer: Option<PartyRef>,
    pub supplier: Option<PartyRef>,
    pub project: Option<PartyRef>,
    pub account: Option<String>,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub status: Option<EntryStatus>,
}

impl LedgerForm {
    /// Counterpart for the selected account type, if its sub-field is set.
    pub fn counterpart(&self) -> Option<Counterpart> {
        match self.account_type? {
            AccountType::Customer => self.customer.as_ref().map(|party| Counterpart::Customer {
                id: party.id,
                name: party.name.clone(),
            }),
            AccountType::Supplier => self.supplier.as_ref().map(|party| Counterpart::Supplier {
                id: party.id,
                name: party.name.clone(),
            }),
            AccountType::Project => self.project.as_ref().map(|party| Counterpart::Project {
                id: party.id,
                name: party.name.clone(),
            }),
            AccountType::Account => self
                .account
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| Counterpart::Account {
                    name: name.to_string(),
                }),
        }
    }

    /// Validates, then turns the form into a journal request.
    pub fn into_journal_request(self, kind: JournalKind) -> Result<JournalRequest, ValidationErrors> {
        let amount = validate_form(&self)?;
        let counterpart = self.counterpart().ok_or(ValidationIssue::MissingAccount)?;
        let transaction_date = self
            .transaction_date
            .ok_or(ValidationIssue::MissingTransactionDate)?;

        Ok(JournalRequest {
            kind,
            amount,
            counterpart,
            description: self.description.trim().to_string(),
            invoice_number: non_blank(self.invoice_number),
            notes: non_blank(self.notes),
            transaction_date,
            due_date: self.due_date,
            status: self.status.unwrap_or_default(),
        })
    }
}

/// Checks required fields of a ledger form. Nothing is mutated.
pub fn validate(form: &LedgerForm) -> Result<(), ValidationErrors> {
    validate_form(form).map(|_| ())
}

fn validate_form(form: &LedgerForm) -> Result<Decimal, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if form.description.trim().is_empty() {
        errors.push(ValidationIssue::MissingDescription);
    }

    let amount = match parse_amount(&form.amount) {
        Ok(amount) if !is_whole_cents(amount) => {
            errors.push(ValidationIssue::SubCentAmount);
            None
        }
        Ok(amount) if amount > Decimal::ZERO => Some(amount),
        Ok(_) => {
            errors.push(ValidationIssue::NonPositiveAmount);
            None
        }
        Err(err) => {
            errors.push(err.into());
            None
        }
    };

    if form.transaction_date.is_none() {
        errors.push(ValidationIssue::MissingTransactionDate);
    }

    if form.counterpart().is_none() {
        errors.push(match form.account_type {
            Some(AccountType::Customer) => ValidationIssue::MissingCustomer,
            Some(AccountType::Supplier) => ValidationIssue::MissingSupplier,
            Some(AccountType::Project) => ValidationIssue::MissingProject,
            Some(AccountType::Account) | None => ValidationIssue::MissingAccount,
        });
    }

    errors.into_result()?;
    amount.ok_or_else(|| ValidationIssue::NonPositiveAmount.into())
}

/// Line-level checks for credit notes and proforma invoices.
pub fn validate_line_items(items: &[LineItem]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if items.is_empty() {
        errors.push(ValidationIssue::NoLineItems);
    }

    for (index, item) in items.iter().enumerate() {
        let line = index + 1;
        if item.description.trim().is_empty() {
            errors.push(ValidationIssue::MissingLineDescription { line });
        }
        if item.quantity.is_sign_negative() || item.unit_price.is_sign_negative() {
            errors.push(ValidationIssue::NegativeLineValue { line });
        }
        if let Some(rate) = item.tax_rate {
            if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
                errors.push(ValidationIssue::TaxRateOutOfRange { line });
            }
        }
    }

    errors.into_result()
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
