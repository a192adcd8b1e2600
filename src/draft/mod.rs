//! Application resource drafts.
//!
//! Turns a [`PackageDescriptor`](crate::archive::PackageDescriptor) into the
//! Win32 app resource the management API expects, including install and
//! uninstall command lines, return codes and detection rules.

mod builder;
mod model;

pub use builder::{DraftBuilder, DraftDefaults, build_draft};
pub use model::{
    DEFAULT_RETURN_CODES, DetectionRule, DeviceRestartBehavior, InstallExperience,
    MsiInformation, MsiPackageType, ReturnCode, ReturnCodeType, RunAsAccount, VersionOperator,
    WIN32_LOB_APP_ODATA_TYPE, Win32LobApp,
};
