//! Immutable description of one package archive.

use bytes::Bytes;

use super::manifest::{ApplicationInfo, EncryptionInfo, MsiInfo};

/// Everything the pipeline needs to know about a package archive.
///
/// Built once by the archive reader and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct PackageDescriptor {
    name: String,
    file_name: String,
    setup_file: String,
    unencrypted_size: u64,
    encrypted_size: u64,
    encryption: EncryptionInfo,
    msi: Option<MsiInfo>,
    tool_version: Option<String>,
    payload: Option<Bytes>,
}

impl PackageDescriptor {
    pub(crate) fn new(info: ApplicationInfo, encrypted_size: u64, payload: Option<Bytes>) -> Self {
        Self {
            name: info.name,
            file_name: info.file_name,
            setup_file: info.setup_file,
            unencrypted_size: info.unencrypted_content_size,
            encrypted_size,
            encryption: info.encryption_info,
            msi: info.msi_info.filter(MsiInfo::is_populated),
            tool_version: info.tool_version,
            payload,
        }
    }

    /// Application display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the encrypted payload entry
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Installer entry point inside the payload
    pub fn setup_file(&self) -> &str {
        &self.setup_file
    }

    /// Payload size before encryption, as declared by the manifest
    pub fn unencrypted_size(&self) -> u64 {
        self.unencrypted_size
    }

    /// Stored (compressed) size of the payload entry
    pub fn encrypted_size(&self) -> u64 {
        self.encrypted_size
    }

    /// Payload encryption parameters
    pub fn encryption(&self) -> &EncryptionInfo {
        &self.encryption
    }

    /// Installer-package metadata, present only when the manifest populated it
    pub fn msi(&self) -> Option<&MsiInfo> {
        self.msi.as_ref()
    }

    /// Version of the packaging tool, if recorded
    pub fn tool_version(&self) -> Option<&str> {
        self.tool_version.as_deref()
    }

    /// Payload bytes, present only when read with `include_payload`
    pub fn payload(&self) -> Option<&Bytes> {
        self.payload.as_ref()
    }
}
