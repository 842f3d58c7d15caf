use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregate::aggregate;
use crate::classify::{classify, Profile};
use crate::error::{AnalyzeError, SubmissionError};
use crate::narrative::Narrator;

pub const DEFAULT_MAX_INPUT_KIB: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_input_bytes: usize,
}

impl Limits {
    pub fn from_kib(kib: usize) -> Self {
        Limits {
            max_input_bytes: kib.saturating_mul(1024),
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits::from_kib(DEFAULT_MAX_INPUT_KIB)
    }
}

/// A history export handed over by a caller.
#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    pub content: String,
    pub filename: String,
}

impl Submission {
    pub fn new(content: impl Into<String>, filename: impl Into<String>) -> Self {
        Submission {
            content: content.into(),
            filename: filename.into(),
        }
    }

    /// Rejects empty or oversized content. Oversized content is never
    /// truncated.
    pub fn validate(&self, limits: &Limits) -> Result<(), SubmissionError> {
        if self.content.is_empty() {
            return Err(SubmissionError::Empty);
        }
        let size = self.content.len();
        if size > limits.max_input_bytes {
            return Err(SubmissionError::TooLarge {
                size,
                limit: limits.max_input_bytes,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub filename: String,
    /// Model report; `None` when nothing could be summarized.
    pub analysis: Option<String>,
    pub summary_rows: usize,
    pub skipped_lines: usize,
    pub profile: Option<Profile>,
}

/// Validates, summarizes and profiles a submission, then asks `narrator` for
/// a report on the summary.
pub fn analyze(
    submission: &Submission,
    narrator: &dyn Narrator,
    limits: &Limits,
) -> Result<Analysis, AnalyzeError> {
    let start_time = Instant::now();
    submission.validate(limits)?;
    info!(
        action = "start",
        component = "analysis",
        filename = %submission.filename,
        bytes = submission.content.len(),
        "Analysis received"
    );

    let aggregation = aggregate(&submission.content)?;
    let summary_csv = aggregation.summary.to_csv().map_err(crate::error::AggregateError::from)?;
    let profile = classify(&summary_csv);

    let analysis = if aggregation.summary.is_empty() {
        info!(
            action = "skip",
            component = "analysis",
            filename = %submission.filename,
            "Nothing to send to the model"
        );
        None
    } else {
        Some(narrator.narrate(&summary_csv)?)
    };

    info!(
        action = "complete",
        component = "analysis",
        filename = %submission.filename,
        summary_rows = aggregation.summary.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Analysis completed"
    );

    Ok(Analysis {
        filename: submission.filename.clone(),
        analysis,
        summary_rows: aggregation.summary.len(),
        skipped_lines: aggregation.skipped.len(),
        profile,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Axis;
    use crate::error::NarrativeError;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<String>>,
    }

    impl Narrator for Recorder {
        fn narrate(&self, summary_csv: &str) -> Result<String, NarrativeError> {
            self.calls.borrow_mut().push(summary_csv.to_string());
            Ok("# Report".to_string())
        }
    }

    struct Failing;

    impl Narrator for Failing {
        fn narrate(&self, _: &str) -> Result<String, NarrativeError> {
            Err(NarrativeError::EmptyResponse)
        }
    }

    const HISTORY: &str = "URL,Last Visited,Visit Count\n\
                           https://github.com/a,b,2024-01-01T10:00:00,3\n\
                           https://github.com/c,2024-01-01T12:00:00,2\n\
                           broken line\n";

    #[test]
    fn empty_content_is_rejected() {
        let submission = Submission::new("", "history.csv");
        assert_eq!(
            submission.validate(&Limits::default()),
            Err(SubmissionError::Empty)
        );
        assert!(matches!(
            analyze(&submission, &Recorder::default(), &Limits::default()),
            Err(AnalyzeError::Submission(SubmissionError::Empty))
        ));
    }

    #[test]
    fn oversized_content_is_rejected() {
        let submission = Submission::new("x".repeat(2049), "history.csv");
        let recorder = Recorder::default();
        let result = analyze(&submission, &recorder, &Limits::from_kib(2));
        assert!(matches!(
            result,
            Err(AnalyzeError::Submission(SubmissionError::TooLarge {
                size: 2049,
                limit: 2048
            }))
        ));
        assert!(recorder.calls.borrow().is_empty());
    }

    #[test]
    fn default_limit_is_2000_kib() {
        assert_eq!(Limits::default().max_input_bytes, 2_048_000);
        let at_limit = Submission::new("x".repeat(2_048_000), "h.csv");
        assert!(at_limit.validate(&Limits::default()).is_ok());
    }

    #[test]
    fn narrator_gets_the_summary() {
        let recorder = Recorder::default();
        let analysis = analyze(
            &Submission::new(HISTORY, "history.csv"),
            &recorder,
            &Limits::default(),
        )
        .unwrap();

        assert_eq!(analysis.filename, "history.csv");
        assert_eq!(analysis.analysis.as_deref(), Some("# Report"));
        assert_eq!(analysis.summary_rows, 1);
        assert_eq!(analysis.skipped_lines, 1);
        let profile = analysis.profile.unwrap();
        assert!((profile.percentage(Axis::Conscientiousness) - 100.0).abs() < 1e-9);

        let calls = recorder.calls.borrow();
        assert_eq!(
            calls.as_slice(),
            ["URL,Date,Visit Count\nhttps://github.com,2024-01-01,5\n"]
        );
    }

    #[test]
    fn empty_summary_skips_the_model() {
        let recorder = Recorder::default();
        let analysis = analyze(
            &Submission::new("URL,Last Visited,Visit Count\n", "empty.csv"),
            &recorder,
            &Limits::default(),
        )
        .unwrap();
        assert_eq!(analysis.analysis, None);
        assert_eq!(analysis.profile, None);
        assert!(recorder.calls.borrow().is_empty());
    }

    #[test]
    fn model_errors_propagate() {
        let result = analyze(
            &Submission::new(HISTORY, "history.csv"),
            &Failing,
            &Limits::default(),
        );
        assert!(matches!(
            result,
            Err(AnalyzeError::Narrative(NarrativeError::EmptyResponse))
        ));
    }

    #[test]
    fn bad_timestamps_surface_as_aggregate_errors() {
        let result = analyze(
            &Submission::new("URL,Last Visited,Visit Count\nhttps://a.com,soon,1", "h.csv"),
            &Recorder::default(),
            &Limits::default(),
        );
        assert!(matches!(result, Err(AnalyzeError::Aggregate(_))));
    }

    #[test]
    fn submissions_deserialize_from_json() {
        let submission: Submission =
            serde_json::from_str(r#"{"content":"URL,Last Visited,Visit Count","filename":"h.csv"}"#)
                .unwrap();
        assert_eq!(submission.filename, "h.csv");
    }
}
