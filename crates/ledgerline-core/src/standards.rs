use serde::{Deserialize, Serialize};

/// Account labels used when the ledger books against a standard account
/// rather than one the user picked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartOfAccounts {
    pub accounts_receivable: String,
    pub accounts_payable: String,
    pub revenue: String,
    pub operating_expenses: String,
    pub salary_expense: String,
    pub payroll_payable: String,
}

pub trait StandardsProfile {
    fn chart_of_accounts(&self) -> ChartOfAccounts;
}

#[derive(Debug, Clone, Default)]
pub struct GeneralLedgerProfile;

impl StandardsProfile for GeneralLedgerProfile {
    fn chart_of_accounts(&self) -> ChartOfAccounts {
        ChartOfAccounts {
            accounts_receivable: "Accounts Receivable".to_string(),
            accounts_payable: "Accounts Payable".to_string(),
            revenue: "Revenue".to_string(),
            operating_expenses: "Operating Expenses".to_string(),
            salary_expense: "Salary Expense".to_string(),
            payroll_payable: "Payroll Payable".to_string(),
        }
    }
}
