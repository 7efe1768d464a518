//! Guarded actions on proforma invoices and payroll entries.
//!
//! Credit notes have no action guard: their status is picked freely from
//! [`CreditNoteStatus::ALL`](ledgerline_core::CreditNoteStatus::ALL) on
//! create and edit. Plain edits of a proforma's status are likewise free; only
//! the approve and convert actions are guarded.

use std::fmt;

use ledgerline_core::{PayrollStatus, ProformaStatus};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {action} a {subject} that is {from}")]
pub struct TransitionError {
    pub subject: &'static str,
    pub action: String,
    pub from: String,
}

/// A status that moves forward through named actions.
pub trait Lifecycle: Copy + fmt::Display + Sized {
    type Action: Copy + fmt::Display + PartialEq + 'static;

    const SUBJECT: &'static str;

    /// The target status if `action` is allowed from `self`.
    fn target(self, action: Self::Action) -> Option<Self>;

    fn all_actions() -> &'static [Self::Action];

    fn apply(self, action: Self::Action) -> Result<Self, TransitionError> {
        self.target(action).ok_or_else(|| TransitionError {
            subject: Self::SUBJECT,
            action: action.to_string(),
            from: self.to_string(),
        })
    }

    fn allows(self, action: Self::Action) -> bool {
        self.target(action).is_some()
    }

    /// Actions offered while in this status.
    fn available_actions(self) -> Vec<Self::Action> {
        Self::all_actions()
            .iter()
            .copied()
            .filter(|action| self.allows(*action))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProformaAction {
    Approve,
    Convert,
}

impl fmt::Display for ProformaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProformaAction::Approve => "approve",
            ProformaAction::Convert => "convert",
        })
    }
}

impl Lifecycle for ProformaStatus {
    type Action = ProformaAction;

    const SUBJECT: &'static str = "proforma invoice";

    fn target(self, action: ProformaAction) -> Option<Self> {
        match (self, action) {
            (ProformaStatus::Draft | ProformaStatus::Sent, ProformaAction::Approve) => {
                Some(ProformaStatus::Approved)
            }
            (ProformaStatus::Approved, ProformaAction::Convert) => Some(ProformaStatus::Converted),
            _ => None,
        }
    }

    fn all_actions() -> &'static [ProformaAction] {
        &[ProformaAction::Approve, ProformaAction::Convert]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayrollAction {
    Approve,
    MarkPaid,
}

impl fmt::Display for PayrollAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PayrollAction::Approve => "approve",
            PayrollAction::MarkPaid => "pay",
        })
    }
}

impl Lifecycle for PayrollStatus {
    type Action = PayrollAction;

    const SUBJECT: &'static str = "payroll entry";

    fn target(self, action: PayrollAction) -> Option<Self> {
        match (self, action) {
            (PayrollStatus::Draft, PayrollAction::Approve) => Some(PayrollStatus::Approved),
            (PayrollStatus::Approved, PayrollAction::MarkPaid) => Some(PayrollStatus::Paid),
            _ => None,
        }
    }

    fn all_actions() -> &'static [PayrollAction] {
        &[PayrollAction::Approve, PayrollAction::MarkPaid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proforma_approve_from_draft_or_sent() {
        assert_eq!(
            ProformaStatus::Draft.apply(ProformaAction::Approve),
            Ok(ProformaStatus::Approved)
        );
        assert_eq!(
            ProformaStatus::Sent.apply(ProformaAction::Approve),
            Ok(ProformaStatus::Approved)
        );
        let err = ProformaStatus::Approved
            .apply(ProformaAction::Approve)
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot approve a proforma invoice that is approved");
    }

    #[test]
    fn only_approved_proforma_offers_conversion() {
        assert_eq!(
            ProformaStatus::Approved.available_actions(),
            vec![ProformaAction::Convert]
        );
        for status in [
            ProformaStatus::Draft,
            ProformaStatus::Sent,
            ProformaStatus::Rejected,
            ProformaStatus::Converted,
            ProformaStatus::Expired,
        ] {
            assert!(!status.allows(ProformaAction::Convert), "{status}");
        }
        assert!(ProformaStatus::Converted.available_actions().is_empty());
    }

    #[test]
    fn payroll_moves_draft_approved_paid() {
        assert_eq!(
            PayrollStatus::Draft.available_actions(),
            vec![PayrollAction::Approve]
        );
        let approved = PayrollStatus::Draft.apply(PayrollAction::Approve).unwrap();
        assert_eq!(approved.available_actions(), vec![PayrollAction::MarkPaid]);
        assert_eq!(approved.apply(PayrollAction::MarkPaid), Ok(PayrollStatus::Paid));

        assert!(PayrollStatus::Draft.apply(PayrollAction::MarkPaid).is_err());
        assert!(PayrollStatus::Paid.apply(PayrollAction::Approve).is_err());
    }
}
