//! # intunewin_publisher
//!
//! Publishes packaged Win32 applications (`.intunewin`) into a
//! device-management backend.
//!
//! ## Pipeline
//!
//! - **Archive**: locate and parse the package manifest, optionally load the
//!   encrypted payload
//! - **Draft**: map the manifest onto the Win32 app resource, with install
//!   commands, return codes and detection rules
//! - **Upload**: wait for a storage URI, transfer the payload in blocks while
//!   renewing the URI, finalize the block list, commit the file and then the
//!   content version
//!
//! ## Usage
//!
//! ```no_run
//! use intunewin_publisher::{GraphConfig, Publisher, UploadConfig};
//!
//! # async fn run() -> intunewin_publisher::Result<()> {
//! let publisher = Publisher::connect(&GraphConfig::from_env()?, UploadConfig::from_env())?;
//! let report = publisher.publish("Setup.intunewin").await?;
//! println!("committed content version {} of {}", report.content_version_id, report.app_id);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod archive;
pub mod config;
pub mod draft;
pub mod error;
pub mod graph;
pub mod publish;
pub mod upload;

pub use archive::{PackageDescriptor, read_package, read_package_file};
pub use config::{GraphConfig, UploadConfig};
pub use draft::{DraftBuilder, DraftDefaults, Win32LobApp};
pub use error::{PublishError, Result};
pub use graph::{ContentFile, ContentFileHandle, GraphClient, ManagementApi};
pub use publish::{PublishReport, Publisher};
pub use upload::{AzureBlobTransport, BlockTransport, UploadPhase, UploadReport, UploadSession};

use std::path::Path;

/// Read an archive's manifest and build the application draft with default
/// settings. The payload is not loaded.
pub fn build_descriptor_from_archive(path: impl AsRef<Path>) -> Result<Win32LobApp> {
    let descriptor = read_package_file(path, false)?;
    Ok(draft::build_draft(&descriptor)?)
}
