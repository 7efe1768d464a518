use chrono::NaiveDate;
use ledgerline_core::{
    CreditNoteDraft, EntryStatus, EntryType, LedgerEntry, LedgerEntryDraft, PayrollEntry,
    PayrollStatus, ProformaDraft, ProformaInvoice,
};
use ledgerline_finance::FormattedTotals;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PAYROLL_PAID_CHANNEL: &str = "payroll.paid";
pub const PROFORMA_CONVERTED_CHANNEL: &str = "proforma.converted";

pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const MAX_PAGE_LIMIT: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let limit = limit.max(1);
        let total_pages = total.div_ceil(u64::from(limit)) as u32;
        Self {
            page: page.max(1),
            limit,
            total,
            total_pages,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// List endpoints answer with either a bare array or a paginated envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Paginated(Paginated<T>),
    Bare(Vec<T>),
}

impl<T> ListResponse<T> {
    pub fn into_page(self) -> Paginated<T> {
        match self {
            ListResponse::Paginated(page) => page,
            ListResponse::Bare(data) => {
                let total = data.len() as u64;
                let limit = u32::try_from(data.len()).unwrap_or(u32::MAX).max(1);
                Paginated {
                    data,
                    pagination: Pagination::new(1, limit, total),
                }
            }
        }
    }

    pub fn into_items(self) -> Vec<T> {
        self.into_page().data
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerQuery {
    pub entry_type: Option<EntryType>,
    pub status: Option<EntryStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub entity_id: Option<i64>,
    pub project_id: Option<i64>,
    pub account_name: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl LedgerQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT)
    }

    /// Non-empty filters as query-string pairs.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let text = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        [
            ("entryType", self.entry_type.map(|value| value.to_string())),
            ("status", self.status.map(|value| value.to_string())),
            ("startDate", self.start_date.map(|value| value.to_string())),
            ("endDate", self.end_date.map(|value| value.to_string())),
            ("entityId", self.entity_id.map(|value| value.to_string())),
            ("projectId", self.project_id.map(|value| value.to_string())),
            ("accountName", text(&self.account_name)),
            ("search", text(&self.search)),
            ("page", self.page.map(|value| value.to_string())),
            ("limit", self.limit.map(|value| value.to_string())),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name, value)))
        .collect()
    }
}

/// Both rows of a journal pair, created atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalSubmission {
    pub journal_id: Uuid,
    pub entries: Vec<LedgerEntryDraft>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalResponse {
    pub journal_id: Uuid,
    pub entries: Vec<LedgerEntry>,
}

/// A credit note as submitted, with client-computed two-decimal totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditNotePayload {
    #[serde(flatten)]
    pub note: CreditNoteDraft,
    #[serde(flatten)]
    pub totals: FormattedTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProformaPayload {
    #[serde(flatten)]
    pub proforma: ProformaDraft,
    #[serde(flatten)]
    pub totals: FormattedTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate<S> {
    pub status: S,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub proforma: ProformaInvoice,
    pub invoice_id: i64,
    pub invoice_number: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRequest {
    pub month: i32,
    pub year: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollQuery {
    pub month: Option<i32>,
    pub year: Option<i32>,
    pub status: Option<PayrollStatus>,
    pub employee_id: Option<i64>,
}

impl PayrollQuery {
    pub fn period(month: i32, year: i32) -> Self {
        Self {
            month: Some(month),
            year: Some(year),
            ..Self::default()
        }
    }

    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        [
            ("month", self.month.map(|value| value.to_string())),
            ("year", self.year.map(|value| value.to_string())),
            ("status", self.status.map(|value| value.to_string())),
            ("employeeId", self.employee_id.map(|value| value.to_string())),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name, value)))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub created: usize,
    pub entries: Vec<PayrollEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearPeriodResponse {
    pub deleted: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentRequest {
    pub description: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierQuery {
    #[serde(default)]
    pub include_archived: bool,
    pub search: Option<String>,
}

/// Error body returned by the API. Either field may carry the message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .map(str::trim)
            .filter(|message| !message.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollPaidEvent {
    pub payroll_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProformaConvertedEvent {
    pub proforma_id: i64,
    pub invoice_id: i64,
}
