pub const GENERAL_LEDGER: &str = "/api/general-ledger";
pub const GENERAL_LEDGER_JOURNAL: &str = "/api/general-ledger/journal";
pub const GENERAL_LEDGER_SUMMARY: &str = "/api/general-ledger/summary";
pub const CREDIT_NOTES: &str = "/api/credit-notes";
pub const PROFORMA_INVOICES: &str = "/api/proforma-invoices";
pub const PAYROLL: &str = "/api/payroll";
pub const PAYROLL_GENERATE: &str = "/api/payroll/generate";
pub const PAYROLL_CLEAR_PERIOD: &str = "/api/payroll/clear-period";
pub const SUPPLIERS: &str = "/api/suppliers";
pub const CUSTOMERS: &str = "/api/customers";
pub const PROJECTS: &str = "/api/projects";

pub fn item(collection: &str, id: i64) -> String {
    format!("{collection}/{id}")
}

pub fn action(collection: &str, id: i64, action: &str) -> String {
    format!("{collection}/{id}/{action}")
}
