use thiserror::Error;

/// Every failure the quiz core can report.
///
/// Settings and data errors abort the operation that raised them and leave the
/// session untouched. The remaining kinds are logged by the state machine and
/// never halt a running session.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuizError {
    #[error("invalid value for {field}: {value:?}")]
    InvalidSettingsInput { field: String, value: String },

    #[error("not enough vocabulary to sample {requested} questions (only {available} available)")]
    InsufficientData { requested: usize, available: usize },

    #[error("invalid answer outcome: {0}")]
    InvalidOutcome(String),

    #[error("media failure: {0}")]
    MediaFailure(String),

    #[error("index {index} out of range for {len} questions")]
    IndexOutOfRange { index: isize, len: usize },

    #[error("no vocabulary category selected")]
    NoCategorySelected,

    #[error("failed to load vocabulary: {0}")]
    VocabLoad(String),
}

impl From<std::io::Error> for QuizError {
    fn from(e: std::io::Error) -> Self {
        QuizError::VocabLoad(e.to_string())
    }
}

impl From<serde_json::Error> for QuizError {
    fn from(e: serde_json::Error) -> Self {
        QuizError::VocabLoad(e.to_string())
    }
}

impl From<csv::Error> for QuizError {
    fn from(e: csv::Error) -> Self {
        QuizError::VocabLoad(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = QuizError::InvalidSettingsInput {
            field: "Question Count".into(),
            value: "abc".into(),
        };
        assert_eq!(err.to_string(), "invalid value for Question Count: \"abc\"");

        let err = QuizError::IndexOutOfRange { index: 4, len: 4 };
        assert_eq!(err.to_string(), "index 4 out of range for 4 questions");
    }
}
