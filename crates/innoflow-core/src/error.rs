use thiserror::Error;

/// Required-field failures caught before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title is required")]
    EmptyTitle,

    #[error("description is required")]
    EmptyDescription,

    #[error("a rejection reason is required")]
    MissingRejectionReason,

    #[error("a deadline is required when postponing")]
    MissingDeadline,

    #[error("deadline must be formatted YYYY-MM-DD HH:MM")]
    InvalidDeadline,

    #[error("deadline must be in the future")]
    DeadlineNotInFuture,

    #[error("a conclusion is required")]
    MissingConclusion,

    #[error("negative feedback details are required")]
    MissingNegativeFeedback,

    #[error("a project lead is required")]
    MissingProjectLead,

    #[error("{0} is required")]
    MissingField(&'static str),
}
