use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

text_enum!(PayrollStatus, "payroll status" {
    Draft => "draft",
    Approved => "approved",
    Paid => "paid",
});

text_enum!(AdjustmentKind, "adjustment kind" {
    Addition => "addition",
    Deduction => "deduction",
});

impl Default for PayrollStatus {
    fn default() -> Self {
        PayrollStatus::Draft
    }
}

impl AdjustmentKind {
    /// REST collection segment, `/api/payroll/:id/<segment>`.
    pub fn path_segment(&self) -> &'static str {
        match self {
            AdjustmentKind::Addition => "additions",
            AdjustmentKind::Deduction => "deductions",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub basic_salary: Decimal,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollEntry {
    #[serde(default)]
    pub id: i64,
    pub employee_id: i64,
    #[serde(default)]
    pub employee_name: Option<String>,
    pub month: i32,
    pub year: i32,
    pub working_days: i32,
    pub basic_salary: Decimal,
    #[serde(default)]
    pub total_additions: Decimal,
    #[serde(default)]
    pub total_deductions: Decimal,
    pub total_amount: Decimal,
    #[serde(default)]
    pub status: PayrollStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A child row of a payroll entry: an allowance/bonus or a deduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollAdjustment {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub payroll_id: i64,
    pub kind: AdjustmentKind,
    pub description: String,
    pub amount: Decimal,
}

fn default_active() -> bool {
    true
}
