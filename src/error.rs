// Error taxonomy for the coverage engine.
//
// The scoring path never swallows an error: each failure either has a
// defined fallback value (zero-norm similarity is 0.0) or surfaces here with
// enough context (record, stage) to diagnose. The CLI and the crawler work in
// anyhow; these convert through `?`.

/// Errors raised by the normalize → encode → matrix → decide → aggregate path.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoverageError {
    /// Bad setup detected before any computation: empty trend list,
    /// threshold outside [0, 1], unknown encoder, non-unique row labels.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A course record that cannot be scored as given.
    #[error("Malformed input record '{record}': {reason}")]
    MalformedInput { record: String, reason: String },

    /// The encoder could not produce a consistent vector set.
    #[error("Encoding failed during {stage}: {message}")]
    EncodingFailure { stage: String, message: String },

    /// Aggregate statistics were requested over zero courses.
    #[error("No courses to aggregate: coverage rate is undefined for an empty corpus")]
    EmptyCorpus,
}

impl CoverageError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    pub fn encoding(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EncodingFailure {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

pub type CoverageResult<T> = std::result::Result<T, CoverageError>;
