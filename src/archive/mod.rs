//! Package archive reading.
//!
//! A `.intunewin` package is a zip container holding an XML manifest and an
//! encrypted payload entry. This module locates both, parses the manifest and
//! produces an immutable [`PackageDescriptor`].

mod descriptor;
mod manifest;
mod reader;

pub use descriptor::PackageDescriptor;
pub use manifest::{ApplicationInfo, EncryptionInfo, MsiInfo};
pub use reader::{MANIFEST_SUFFIX, read_package, read_package_file};
