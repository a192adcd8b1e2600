//! Package publishing.
//!
//! Ties archive reading, draft building, the management API and the upload
//! session into one call per package.

mod publisher;

pub use publisher::{PublishReport, Publisher};
