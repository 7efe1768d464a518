//! Ledger entry computation: document totals, journal pairs, form
//! validation, status rules and payroll postings. Everything here is pure;
//! callers own I/O.

pub mod balance;
pub mod journal;
pub mod manual;
pub mod payroll;
pub mod status;
pub mod totals;
pub mod validation;

pub use balance::{BalanceError, LedgerSummary, check_balanced, summarize};
pub use journal::{JournalKind, JournalPair, JournalRequest, build_journal_pair, build_journal_pair_with};
pub use manual::{ManualEntryForm, build_manual_entry};
pub use payroll::{
    PayrollError, ensure_adjustable, generate_period, payroll_postings, payroll_total,
    recalculate, working_days,
};
pub use status::{Lifecycle, PayrollAction, ProformaAction, TransitionError};
pub use totals::{DocumentTotals, FormattedTotals, LineTotals, compute_totals, line_totals};
pub use validation::{LedgerForm, PartyRef, ValidationErrors, ValidationIssue, validate, validate_line_items};
