// Text preparation shared by trend phrases and course descriptions.

pub mod normalize;

pub use normalize::{normalize, normalize_opt};
