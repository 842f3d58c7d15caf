use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("line {line}: cannot read visit time {value:?}")]
    InvalidTimestamp { line: usize, value: String },

    #[error("failed to serialize summary: {0}")]
    Serialize(#[from] csv::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("history content is empty")]
    Empty,

    #[error("history is too large ({size} bytes, limit is {limit} bytes)")]
    TooLarge { size: usize, limit: usize },
}

#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("GOOGLE_API_KEY is not set")]
    MissingApiKey,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("model request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model response contained no text")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Narrative(#[from] NarrativeError),
}
