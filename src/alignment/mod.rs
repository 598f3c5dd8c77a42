pub mod edit_distance;
pub mod measures;
pub mod report;
pub mod tokenization;
