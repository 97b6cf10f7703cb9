// Pipelines: coverage scoring and catalogue summarization.

pub mod coverage;
pub mod summarize;
