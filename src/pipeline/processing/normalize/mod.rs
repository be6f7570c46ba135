// Pure normalization helpers for free-text feed values

pub mod date;
pub mod grade;

pub use date::parse_feed_date;
pub use grade::{normalize as normalize_grade, GradeList};
