use ledgerline_core::AmountError;
use ledgerline_finance::{PayrollError, TransitionError, ValidationErrors, ValidationIssue};
use thiserror::Error;

pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Payroll(#[from] PayrollError),
    #[error("request failed with status {status}")]
    Http { status: u16, message: Option<String> },
    #[error("request could not be sent: {0}")]
    Transport(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("query cache failure: {0}")]
    Cache(String),
}

impl ActionError {
    /// Text for the toast shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            ActionError::Validation(errors) => errors.to_string(),
            ActionError::Amount(err) => err.to_string(),
            ActionError::Transition(err) => err.to_string(),
            ActionError::Payroll(err) => err.to_string(),
            ActionError::Http {
                message: Some(message),
                ..
            } => message.clone(),
            ActionError::Http { message: None, .. }
            | ActionError::Transport(_)
            | ActionError::Decode(_)
            | ActionError::Cache(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    /// True when the failure was caught before anything was sent.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ActionError::Validation(_)
                | ActionError::Amount(_)
                | ActionError::Transition(_)
                | ActionError::Payroll(_)
        )
    }
}

impl From<ValidationIssue> for ActionError {
    fn from(issue: ValidationIssue) -> Self {
        ActionError::Validation(issue.into())
    }
}

impl From<anyhow::Error> for ActionError {
    fn from(err: anyhow::Error) -> Self {
        ActionError::Cache(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for ActionError {
    fn from(err: serde_json::Error) -> Self {
        ActionError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_is_shown_verbatim() {
        let err = ActionError::Http {
            status: 409,
            message: Some("Credit note number already exists".to_string()),
        };
        assert_eq!(err.user_message(), "Credit note number already exists");
        assert!(!err.is_local());
    }

    #[test]
    fn falls_back_to_generic_message() {
        let err = ActionError::Http {
            status: 500,
            message: None,
        };
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
        assert_eq!(
            ActionError::Transport("connection refused".to_string()).user_message(),
            GENERIC_FAILURE_MESSAGE
        );
    }

    #[test]
    fn validation_lists_every_problem() {
        let mut errors = ValidationErrors::new();
        errors.push(ValidationIssue::MissingDescription);
        errors.push(ValidationIssue::NonPositiveAmount);
        let err = ActionError::from(errors);

        assert!(err.is_local());
        assert_eq!(
            err.user_message(),
            "Description is required; Amount must be greater than zero"
        );
    }
}
