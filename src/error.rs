use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdbookError {
    #[error("line item '{0}' not found")]
    LineItemNotFound(String),

    #[error("campaign '{0}' not found")]
    CampaignNotFound(String),

    #[error("exportation '{0}' not found")]
    ExportNotFound(String),

    #[error("can't update a reviewed line item")]
    LineItemReviewed,

    #[error("invalid sort field '{0}'")]
    InvalidSortField(String),

    #[error("invalid sort direction '{0}'")]
    InvalidDirection(String),

    #[error("invalid search field '{0}'")]
    InvalidSearchField(String),

    #[error("invalid cursor '{0}'")]
    InvalidCursor(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("service error: {0}")]
    Service(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, AdbookError>;
