pub mod records;
pub mod stats;
