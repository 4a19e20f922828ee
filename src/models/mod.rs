//! Data models for the BrandHub versioning core.
//!
//! These models match the frontend TypeScript interfaces exactly for seamless interoperability.

mod resource;
mod version;

pub use resource::*;
pub use version::*;
