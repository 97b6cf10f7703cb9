// Coverage engine: similarity matrix, threshold decision, aggregate report.

pub mod decision;
pub mod matrix;
pub mod report;

pub use decision::{decide, CoverageDecision};
pub use matrix::{build_matrix, SimilarityMatrix};
pub use report::{aggregate, CoverageReport};
