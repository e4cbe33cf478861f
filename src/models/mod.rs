//! Core data models for the pint tracker.

mod friend;
mod geo;
mod ids;
mod record;
mod report;

pub use friend::*;
pub use geo::*;
pub use ids::*;
pub use record::*;
pub use report::*;
