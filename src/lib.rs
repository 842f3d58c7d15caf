pub mod aggregate;
pub mod args;
pub mod classify;
pub mod commands;
pub mod domain;
pub mod error;
pub mod narrative;
pub mod record;
pub mod sqlite;
pub mod stats;
pub mod submission;
pub mod timestamp;
pub mod utils;

pub use aggregate::{aggregate, summarize, Aggregation};
pub use args::Args;
pub use classify::{classify, Axis, Profile};
pub use domain::{extract, DomainLabel};
pub use error::{AggregateError, AnalyzeError, NarrativeError, SubmissionError};
pub use narrative::{GeminiClient, Narrator};
pub use record::{recover, recover_fields, RawHistoryLine};
pub use stats::{DerivedTable, DomainRecord, Summary};
pub use submission::{analyze, Analysis, Limits, Submission};
