//! Single-row postings from the general-ledger page.
//!
//! These rows are deliberately one-sided and are never paired or balanced.
//! Receivable/payable postings go through [`crate::journal`] instead.

use chrono::NaiveDate;
use ledgerline_core::{
    Counterpart, EntryDirection, EntryStatus, EntryType, LedgerEntryDraft, is_whole_cents,
    parse_amount,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::validation::{ValidationErrors, ValidationIssue, non_blank};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualEntryForm {
    pub direction: EntryDirection,
    pub account_name: String,
    pub amount: String,
    pub description: String,
    pub transaction_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub entry_type: Option<EntryType>,
    #[serde(default)]
    pub reference_type: Option<String>,
    #[serde(default)]
    pub counterpart: Option<Counterpart>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub status: Option<EntryStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub fn build_manual_entry(form: &ManualEntryForm) -> Result<LedgerEntryDraft, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if form.description.trim().is_empty() {
        errors.push(ValidationIssue::MissingDescription);
    }
    if form.account_name.trim().is_empty() {
        errors.push(ValidationIssue::MissingAccount);
    }
    let amount = match parse_amount(&form.amount) {
        Ok(amount) if !is_whole_cents(amount) => {
            errors.push(ValidationIssue::SubCentAmount);
            Decimal::ZERO
        }
        Ok(amount) if amount > Decimal::ZERO => amount,
        Ok(_) => {
            errors.push(ValidationIssue::NonPositiveAmount);
            Decimal::ZERO
        }
        Err(err) => {
            errors.push(err.into());
            Decimal::ZERO
        }
    };
    if form.transaction_date.is_none() {
        errors.push(ValidationIssue::MissingTransactionDate);
    }
    errors.into_result()?;

    let transaction_date = form
        .transaction_date
        .ok_or(ValidationIssue::MissingTransactionDate)?;
    let (debit_amount, credit_amount) = match form.direction {
        EntryDirection::Debit => (amount, Decimal::ZERO),
        EntryDirection::Credit => (Decimal::ZERO, amount),
    };
    let entity = form.counterpart.as_ref().and_then(Counterpart::entity);
    let project = form.counterpart.as_ref().and_then(Counterpart::project);

    Ok(LedgerEntryDraft {
        entry_type: form.entry_type.unwrap_or(EntryType::Manual),
        reference_type: non_blank(form.reference_type.clone())
            .unwrap_or_else(|| "manual".to_string()),
        reference_id: None,
        journal_id: None,
        account_name: form.account_name.trim().to_string(),
        description: form.description.trim().to_string(),
        debit_amount,
        credit_amount,
        entity_id: entity.map(|(id, _)| id),
        entity_name: entity.map(|(_, name)| name.to_string()),
        project_id: project.map(|(id, _)| id),
        project_title: project.map(|(_, title)| title.to_string()),
        invoice_number: non_blank(form.invoice_number.clone()),
        transaction_date,
        due_date: form.due_date,
        status: form.status.unwrap_or_default(),
        notes: non_blank(form.notes.clone()),
    })
}
