//! Maps a package descriptor onto an application draft.

use std::collections::BTreeMap;

use super::model::{
    DEFAULT_RETURN_CODES, DetectionRule, DeviceRestartBehavior, InstallExperience,
    MsiInformation, MsiPackageType, RunAsAccount, WIN32_LOB_APP_ODATA_TYPE, Win32LobApp,
};
use crate::archive::{MsiInfo, PackageDescriptor};
use crate::error::DescriptorError;

/// Values the draft uses where the manifest says nothing
#[derive(Debug, Clone)]
pub struct DraftDefaults {
    /// Developer recorded on the app
    pub developer: String,
    /// Publisher used when the installer metadata has none
    pub publisher: String,
    /// Target architectures
    pub applicable_architectures: String,
    /// Minimum Windows 10 release, e.g. `1607`
    pub minimum_windows_release: String,
    /// Key of the minimum-OS flag set, e.g. `v10_1607`
    pub minimum_operating_system: String,
    /// Install context
    pub run_as_account: RunAsAccount,
    /// Restart policy after install
    pub restart_behavior: DeviceRestartBehavior,
}

impl Default for DraftDefaults {
    fn default() -> Self {
        Self {
            developer: "intunewin-publisher".to_string(),
            publisher: "intunewin-publisher".to_string(),
            applicable_architectures: "x64".to_string(),
            minimum_windows_release: "1607".to_string(),
            minimum_operating_system: "v10_1607".to_string(),
            run_as_account: RunAsAccount::System,
            restart_behavior: DeviceRestartBehavior::Suppress,
        }
    }
}

/// Builds [`Win32LobApp`] drafts from package descriptors.
///
/// Pure mapping; performs no I/O.
#[derive(Debug, Clone, Default)]
pub struct DraftBuilder {
    defaults: DraftDefaults,
}

impl DraftBuilder {
    /// Create a builder with custom defaults
    pub fn new(defaults: DraftDefaults) -> Self {
        Self { defaults }
    }

    /// Build the application resource for a descriptor.
    pub fn build(&self, descriptor: &PackageDescriptor) -> Result<Win32LobApp, DescriptorError> {
        let name = required("Name", descriptor.name())?;
        let file_name = required("FileName", descriptor.file_name())?;
        let setup_file = required("SetupFile", descriptor.setup_file())?;
        let defaults = &self.defaults;

        let mut app = Win32LobApp {
            odata_type: WIN32_LOB_APP_ODATA_TYPE.to_string(),
            display_name: name.to_string(),
            description: name.to_string(),
            publisher: defaults.publisher.clone(),
            developer: defaults.developer.clone(),
            file_name: file_name.to_string(),
            setup_file_path: setup_file.to_string(),
            applicable_architectures: defaults.applicable_architectures.clone(),
            minimum_supported_windows_release: defaults.minimum_windows_release.clone(),
            minimum_supported_operating_system: BTreeMap::from([(
                defaults.minimum_operating_system.clone(),
                true,
            )]),
            install_experience: InstallExperience {
                run_as_account: defaults.run_as_account,
                device_restart_behavior: defaults.restart_behavior,
            },
            return_codes: DEFAULT_RETURN_CODES.to_vec(),
            ..Default::default()
        };

        if let Some(msi) = descriptor.msi() {
            apply_msi(&mut app, name, setup_file, msi)?;
        }

        Ok(app)
    }
}

/// Build a draft with [`DraftDefaults::default`].
pub fn build_draft(descriptor: &PackageDescriptor) -> Result<Win32LobApp, DescriptorError> {
    DraftBuilder::default().build(descriptor)
}

fn apply_msi(
    app: &mut Win32LobApp,
    name: &str,
    setup_file: &str,
    msi: &MsiInfo,
) -> Result<(), DescriptorError> {
    let product_code = required("MsiProductCode", &msi.msi_product_code)?;

    if !msi.msi_publisher.is_empty() {
        app.publisher = msi.msi_publisher.clone();
    }
    app.display_version = msi.msi_product_version.clone();
    app.install_command_line = format!(r#"msiexec /i "{setup_file}" /q"#);
    app.uninstall_command_line = format!(r#"msiexec /x "{product_code}" /q"#);
    app.msi_information = Some(MsiInformation {
        product_code: product_code.to_string(),
        product_version: msi.msi_product_version.clone(),
        upgrade_code: msi.msi_upgrade_code.clone(),
        requires_reboot: msi.msi_requires_reboot,
        package_type: MsiPackageType::from_execution_context(&msi.msi_execution_context),
        product_name: name.to_string(),
        publisher: msi.msi_publisher.clone(),
    });
    app.detection_rules.push(DetectionRule::product_code(product_code));
    Ok(())
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, DescriptorError> {
    if value.trim().is_empty() {
        Err(DescriptorError::MissingField { field })
    } else {
        Ok(value)
    }
}
