#[macro_use]
mod text_enum;

pub mod documents;
pub mod models;
pub mod money;
pub mod parties;
pub mod payroll;
pub mod standards;

pub use documents::{
    CreditNote, CreditNoteDraft, CreditNoteStatus, LineItem, ProformaDraft, ProformaInvoice,
    ProformaStatus,
};
pub use models::{
    AccountType, Counterpart, EntryDirection, EntryStatus, EntryType, LedgerEntry,
    LedgerEntryDraft, UnknownVariant,
};
pub use money::{
    AmountError, format_amount, format_currency, format_display, is_whole_cents, parse_amount,
    parse_optional_amount, round_money,
};
pub use parties::{Customer, Project, Supplier, SupplierDraft};
pub use payroll::{AdjustmentKind, Employee, PayrollAdjustment, PayrollEntry, PayrollStatus};
pub use standards::{ChartOfAccounts, GeneralLedgerProfile, StandardsProfile};
