use thiserror::Error;

/// Reasons a raw lead/project row is rejected before classification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ItemError {
    #[error("unknown item kind: {0}")]
    UnknownKind(String),
    #[error("negative cv count: {0}")]
    NegativeCvCount(i32),
    #[error("client name is empty")]
    EmptyClientName,
}

/// Rejected command-line filters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid month {0:?}, expected YYYY-MM")]
    InvalidMonth(String),
}
