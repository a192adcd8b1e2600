//! Win32 application resource shapes sent to the management API.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// OData type discriminator for Win32 line-of-business apps
pub const WIN32_LOB_APP_ODATA_TYPE: &str = "#microsoft.graph.win32LobApp";

/// Application resource submitted when creating a Win32 app
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Win32LobApp {
    /// Type discriminator, always [`WIN32_LOB_APP_ODATA_TYPE`]
    #[serde(rename = "@odata.type")]
    pub odata_type: String,
    /// Name shown to administrators and users
    pub display_name: String,
    /// Free-form description
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Publisher shown in the company portal
    #[serde(skip_serializing_if = "String::is_empty")]
    pub publisher: String,
    /// Developer name
    #[serde(skip_serializing_if = "String::is_empty")]
    pub developer: String,
    /// Version shown to users
    #[serde(skip_serializing_if = "String::is_empty")]
    pub display_version: String,
    /// Name of the encrypted content file
    pub file_name: String,
    /// Installer entry point inside the payload
    pub setup_file_path: String,
    /// Command run to install
    #[serde(skip_serializing_if = "String::is_empty")]
    pub install_command_line: String,
    /// Command run to uninstall
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uninstall_command_line: String,
    /// Comma-separated target architectures, e.g. `x86,x64`
    pub applicable_architectures: String,
    /// Minimum Windows 10 release, e.g. `1607`
    pub minimum_supported_windows_release: String,
    /// Minimum OS flags keyed by release name
    pub minimum_supported_operating_system: BTreeMap<String, bool>,
    /// Account and restart policy for the installer
    pub install_experience: InstallExperience,
    /// Exit code table
    pub return_codes: Vec<ReturnCode>,
    /// Rules deciding whether the app is already installed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub detection_rules: Vec<DetectionRule>,
    /// Installer-package details, for MSI payloads only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msi_information: Option<MsiInformation>,
}

/// How the installer runs on the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallExperience {
    /// Account the installer runs under
    pub run_as_account: RunAsAccount,
    /// Restart policy after install
    pub device_restart_behavior: DeviceRestartBehavior,
}

/// Account context the installer runs under
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunAsAccount {
    /// Local system account
    #[default]
    System,
    /// Signed-in user
    User,
}

/// Device restart policy after installation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceRestartBehavior {
    /// Restart decided by the installer's return code
    #[default]
    BasedOnReturnCode,
    /// Restart without prompting the installer
    Allow,
    /// Never restart
    Suppress,
    /// Always restart
    Force,
}

impl DeviceRestartBehavior {
    /// Wire name of the behavior
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BasedOnReturnCode => "basedOnReturnCode",
            Self::Allow => "allow",
            Self::Suppress => "suppress",
            Self::Force => "force",
        }
    }

    /// Case-insensitive parse; unrecognized input maps to `BasedOnReturnCode`.
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl fmt::Display for DeviceRestartBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceRestartBehavior {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basedonreturncode" => Ok(Self::BasedOnReturnCode),
            "allow" => Ok(Self::Allow),
            "suppress" => Ok(Self::Suppress),
            "force" => Ok(Self::Force),
            _ => Err(format!(
                "invalid restart behavior '{s}' - must be one of basedOnReturnCode, allow, suppress or force"
            )),
        }
    }
}

/// Installer exit code and what it means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnCode {
    /// Installer exit code
    pub return_code: i32,
    /// Outcome the exit code signals
    #[serde(rename = "type")]
    pub kind: ReturnCodeType,
}

/// Outcome attached to an installer exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReturnCodeType {
    /// Installed
    Success,
    /// Installed; restart recommended
    SoftReboot,
    /// Installed; restart required
    HardReboot,
    /// Another installation is in progress
    Retry,
    /// Installation failed
    Failed,
}

impl ReturnCode {
    const fn new(return_code: i32, kind: ReturnCodeType) -> Self {
        Self { return_code, kind }
    }
}

/// Standard Windows installer exit codes
pub const DEFAULT_RETURN_CODES: [ReturnCode; 5] = [
    ReturnCode::new(0, ReturnCodeType::Success),
    ReturnCode::new(1707, ReturnCodeType::Success),
    ReturnCode::new(3010, ReturnCodeType::SoftReboot),
    ReturnCode::new(1641, ReturnCodeType::HardReboot),
    ReturnCode::new(1618, ReturnCodeType::Retry),
];

/// Installer-package details reported to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MsiInformation {
    /// Installer product code (GUID)
    pub product_code: String,
    /// Installer product version
    pub product_version: String,
    /// Installer upgrade code (GUID)
    pub upgrade_code: String,
    /// Whether the installer asks for a restart
    pub requires_reboot: bool,
    /// Install scope
    pub package_type: MsiPackageType,
    /// Product name
    pub product_name: String,
    /// Publisher reported by the installer
    pub publisher: String,
}

/// Install scope of an installer package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MsiPackageType {
    /// Installs for all users
    PerMachine,
    /// Installs for the current user
    PerUser,
    /// Either scope
    DualPurpose,
}

impl MsiPackageType {
    /// Classify from the manifest's execution context.
    pub fn from_execution_context(context: &str) -> Self {
        match context {
            "System" => Self::PerMachine,
            "User" => Self::PerUser,
            _ => Self::DualPurpose,
        }
    }
}

/// Rule the device agent uses to decide whether the app is installed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "@odata.type")]
pub enum DetectionRule {
    /// Installed-product lookup by installer product code
    #[serde(
        rename = "#microsoft.graph.win32LobAppProductCodeDetection",
        rename_all = "camelCase"
    )]
    ProductCode {
        /// Installer product code (GUID)
        product_code: String,
        /// How the installed version is compared
        product_version_operator: VersionOperator,
        /// Version compared against; unused when not configured
        #[serde(skip_serializing_if = "Option::is_none")]
        product_version: Option<String>,
    },
}

impl DetectionRule {
    /// Product-code rule that ignores the installed version.
    pub fn product_code(product_code: impl Into<String>) -> Self {
        Self::ProductCode {
            product_code: product_code.into(),
            product_version_operator: VersionOperator::NotConfigured,
            product_version: None,
        }
    }
}

/// Version comparison for detection rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VersionOperator {
    /// Any installed version matches
    NotConfigured,
    /// Installed version equals the rule version
    Equal,
    /// Installed version differs
    NotEqual,
    /// Installed version is newer
    GreaterThan,
    /// Installed version is the same or newer
    GreaterThanOrEqual,
    /// Installed version is older
    LessThan,
    /// Installed version is the same or older
    LessThanOrEqual,
}
