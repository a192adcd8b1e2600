//! Manifest (`Detection.xml`) model.

use serde::{Deserialize, Serialize};

/// Profile identifier sent when the manifest leaves it empty
pub const DEFAULT_PROFILE_IDENTIFIER: &str = "ProfileVersion1";

/// Root `<ApplicationInfo>` element of the package manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename = "ApplicationInfo", rename_all = "PascalCase", default)]
pub struct ApplicationInfo {
    /// Version of the tool that produced the package
    #[serde(rename = "@ToolVersion")]
    pub tool_version: Option<String>,
    /// Display name of the packaged application
    pub name: String,
    /// Size of the payload before encryption
    pub unencrypted_content_size: u64,
    /// Name of the encrypted payload entry inside the archive
    pub file_name: String,
    /// Installer entry point inside the payload
    pub setup_file: String,
    /// Encryption parameters for the payload
    pub encryption_info: EncryptionInfo,
    /// Installer-package metadata; absent for non-MSI installers
    pub msi_info: Option<MsiInfo>,
}

impl ApplicationInfo {
    /// Parse a manifest document.
    pub fn from_xml(xml: &str) -> Result<Self, quick_xml::DeError> {
        quick_xml::de::from_str(xml)
    }
}

/// Payload encryption parameters.
///
/// Read from PascalCase manifest elements and written as the camelCase body
/// of the file commit call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    rename_all(serialize = "camelCase", deserialize = "PascalCase"),
    default
)]
pub struct EncryptionInfo {
    /// Symmetric encryption key (base64)
    pub encryption_key: String,
    /// HMAC key (base64)
    pub mac_key: String,
    /// AES initialization vector (base64)
    pub initialization_vector: String,
    /// HMAC digest of the encrypted payload (base64)
    pub mac: String,
    /// Encryption profile identifier
    pub profile_identifier: String,
    /// Digest of the unencrypted payload (base64)
    pub file_digest: String,
    /// Algorithm used for `file_digest`
    pub file_digest_algorithm: String,
}

impl EncryptionInfo {
    /// Copy with the profile identifier defaulted when empty.
    pub fn with_default_profile(&self) -> Self {
        let mut info = self.clone();
        if info.profile_identifier.is_empty() {
            info.profile_identifier = DEFAULT_PROFILE_IDENTIFIER.to_string();
        }
        info
    }
}

/// Installer-package (MSI) metadata block
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MsiInfo {
    /// Product code (GUID)
    pub msi_product_code: String,
    /// Product version
    pub msi_product_version: String,
    /// Package code (GUID)
    pub msi_package_code: String,
    /// Upgrade code (GUID)
    pub msi_upgrade_code: String,
    /// `System`, `User` or `Any`
    pub msi_execution_context: String,
    /// Installer needs an interactive logon
    pub msi_requires_logon: bool,
    /// Installer asks for a restart
    pub msi_requires_reboot: bool,
    /// Installs per machine
    pub msi_is_machine_install: bool,
    /// Installs per user
    pub msi_is_user_install: bool,
    /// Installs Windows services
    pub msi_includes_services: bool,
    /// Registers ODBC data sources
    #[serde(rename = "MsiIncludesODBCDataSource")]
    pub msi_includes_odbc_data_source: bool,
    /// Writes machine-wide registry keys
    pub msi_contains_system_registry_keys: bool,
    /// Writes to system folders
    pub msi_contains_system_folders: bool,
    /// Publisher from the installer's summary information
    pub msi_publisher: String,
}

impl MsiInfo {
    /// True when at least one field carries a value.
    pub fn is_populated(&self) -> bool {
        *self != MsiInfo::default()
    }
}
