//! Native build settings for compiling pythonnet.
//!
//! On macOS pythonnet links against Mono: the interpreter's `lib/mono` must
//! point into the Mono framework and `pkg-config` must be able to find
//! `mono-2.pc`. Other platforms need nothing.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::artifact::{dirs_containing, walk};
use crate::config::Settings;
use crate::environment::EnvironmentDescriptor;
use crate::error::{Result, SetupError};
use crate::interpreter::InterpreterInfo;
use crate::process::{CommandSpec, ToolLocator};

pub const PKG_CONFIG_PATH: &str = "PKG_CONFIG_PATH";

/// Settings handed to the native build of the interop library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeBuildConfig {
    /// Whether the interpreter core is a shared library.
    pub shared: bool,
    pub pkg_config_path: Option<String>,
}

impl Default for NativeBuildConfig {
    fn default() -> Self {
        Self {
            shared: true,
            pkg_config_path: None,
        }
    }
}

impl NativeBuildConfig {
    /// Adds the build environment to a command.
    pub fn apply(&self, command: CommandSpec) -> CommandSpec {
        match &self.pkg_config_path {
            Some(path) => command.env(PKG_CONFIG_PATH, path),
            None => command,
        }
    }
}

pub fn configure(
    env: &EnvironmentDescriptor,
    settings: &Settings,
    interpreter: &InterpreterInfo,
    locator: &dyn ToolLocator,
) -> Result<NativeBuildConfig> {
    let Some(pkg_config) = env.native_tool() else {
        return Ok(NativeBuildConfig::default());
    };
    pkg_config.check(locator)?;

    let link = interpreter.lib_dir().join("mono");
    replace_symlink(&settings.mono_lib.join("mono"), &link)?;

    let dirs = dirs_containing(walk(&settings.mono_lib), &settings.pkg_config_file);
    if dirs.is_empty() {
        return Err(SetupError::NotFound {
            what: format!("\"{}\"", settings.pkg_config_file),
            location: format!("\"{}\" tree", settings.mono_lib.display()),
            hint: None,
        });
    }
    let joined = dirs
        .iter()
        .map(|dir| dir.to_string_lossy())
        .collect::<Vec<_>>()
        .join(":");
    debug!(pkg_config_path = %joined, "collected pkg-config directories");

    Ok(NativeBuildConfig {
        shared: interpreter.shared,
        pkg_config_path: Some(joined),
    })
}

/// Points `link` at `target`, removing whatever entry `link` names first,
/// dangling symlinks included.
pub fn replace_symlink(target: &Path, link: &Path) -> Result<()> {
    if fs::symlink_metadata(link).is_ok() {
        fs::remove_file(link).map_err(|e| SetupError::io("remove", link, e))?;
    }
    symlink(target, link).map_err(|e| SetupError::io("symlink", link, e))?;
    info!(link = %link.display(), target = %target.display(), "linked Mono libraries");
    Ok(())
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}
