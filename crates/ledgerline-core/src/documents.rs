use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::{AmountError, parse_amount};

/// One line of a credit note or proforma invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Percentage, 0-100. Absent means untaxed.
    #[serde(default)]
    pub tax_rate: Option<Decimal>,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            tax_rate: None,
        }
    }

    pub fn with_tax_rate(mut self, tax_rate: Decimal) -> Self {
        self.tax_rate = Some(tax_rate);
        self
    }

    /// Builds a line from raw form strings. A blank tax rate means untaxed.
    pub fn parse(
        description: &str,
        quantity: &str,
        unit_price: &str,
        tax_rate: Option<&str>,
    ) -> Result<Self, AmountError> {
        let tax_rate = match tax_rate.map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_amount(raw)?),
        };

        Ok(Self {
            description: description.trim().to_string(),
            quantity: parse_amount(quantity)?,
            unit_price: parse_amount(unit_price)?,
            tax_rate,
        })
    }
}

text_enum!(CreditNoteStatus, "credit note status" {
    Draft => "draft",
    Issued => "issued",
    Cancelled => "cancelled",
});

text_enum!(ProformaStatus, "proforma status" {
    Draft => "draft",
    Sent => "sent",
    Approved => "approved",
    Rejected => "rejected",
    Converted => "converted",
    Expired => "expired",
});

impl Default for CreditNoteStatus {
    fn default() -> Self {
        CreditNoteStatus::Draft
    }
}

impl Default for ProformaStatus {
    fn default() -> Self {
        ProformaStatus::Draft
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditNoteDraft {
    #[serde(default)]
    pub credit_note_number: Option<String>,
    pub customer_id: i64,
    #[serde(default)]
    pub customer_name: Option<String>,
    /// Invoice the credit note reduces.
    #[serde(default)]
    pub invoice_number: Option<String>,
    pub issue_date: NaiveDate,
    #[serde(default)]
    pub reason: Option<String>,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub status: CreditNoteStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditNote {
    pub id: i64,
    #[serde(flatten)]
    pub note: CreditNoteDraft,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProformaDraft {
    #[serde(default)]
    pub proforma_number: Option<String>,
    pub customer_id: i64,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub project_id: Option<i64>,
    pub issue_date: NaiveDate,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub status: ProformaStatus,
    #[serde(default)]
    pub terms: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProformaInvoice {
    pub id: i64,
    #[serde(flatten)]
    pub proforma: ProformaDraft,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    /// Sales invoice created on conversion.
    #[serde(default)]
    pub converted_invoice_id: Option<i64>,
}
