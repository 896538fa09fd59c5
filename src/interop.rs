//! Installing pythonnet from its source repository.

use std::path::Path;

use crate::config::Settings;
use crate::error::Result;
use crate::native::NativeBuildConfig;
use crate::packages::pip_install;
use crate::process::{check_output, CommandRunner, CommandSpec};

pub fn install_command(
    python: &Path,
    settings: &Settings,
    native: &NativeBuildConfig,
) -> CommandSpec {
    native.apply(pip_install(python).arg(format!("git+{}", settings.pythonnet_url)))
}

/// Force-installs pythonnet and returns the installer output.
pub fn install_pythonnet(
    runner: &dyn CommandRunner,
    python: &Path,
    settings: &Settings,
    native: &NativeBuildConfig,
) -> Result<String> {
    println!(
        "
    Install/updates pythonnet
    -------------------------
    "
    );
    check_output(runner, &install_command(python, settings, native))
}
