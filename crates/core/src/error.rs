use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("pdf is encrypted and cannot be read")]
    Encrypted,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InferenceError {
    #[error("inference endpoint unavailable at {endpoint}: {details}")]
    Unavailable { endpoint: String, details: String },

    #[error("invalid response from inference endpoint: {0}")]
    Response(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("no document has been uploaded")]
    NoDocument,

    #[error("highlight count must be between {min} and {max}, got {got}")]
    InvalidHighlightCount { min: u8, max: u8, got: i64 },

    #[error("question is empty")]
    EmptyQuestion,

    #[error("background task failed: {0}")]
    Task(String),
}
