//! Provisioning settings.
//!
//! Every field has a default matching the Lean setup, so an empty or absent
//! settings file yields a working configuration. A TOML file can override any
//! subset of fields.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SetupError};
use crate::platform::Arch;

/// File picked up from the working directory when no `--config` is given.
pub const DEFAULT_SETTINGS_FILE: &str = "pythonnet-setup.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PythonRequirement {
    pub major: u8,
    pub minor: u8,
    pub arch: Arch,
}

impl Default for PythonRequirement {
    fn default() -> Self {
        Self {
            major: 3,
            minor: 6,
            arch: Arch::X64,
        }
    }
}

impl std::fmt::Display for PythonRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{} {}", self.major, self.minor, self.arch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Interpreter to provision; discovered on PATH when unset.
    pub python_executable: Option<PathBuf>,
    /// Packages installed or updated, in order. `conda` itself is skipped by pip.
    pub packages: Vec<String>,
    pub pythonnet_url: String,
    pub readme_url: String,
    pub packages_dir: PathBuf,
    pub artifact: String,
    pub backup_extension: String,
    /// Relative to the grandparent directory of the target artifact.
    pub mac_build_artifact: PathBuf,
    pub interop_module: String,
    pub mono_lib: PathBuf,
    pub pkg_config_file: String,
    pub python: PythonRequirement,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            python_executable: None,
            packages: ["conda", "pip", "wheel", "setuptools", "pandas"]
                .into_iter()
                .map(String::from)
                .collect(),
            pythonnet_url: "https://github.com/QuantConnect/pythonnet".to_string(),
            readme_url: "https://github.com/QuantConnect/Lean#installation-instructions"
                .to_string(),
            packages_dir: PathBuf::from("packages"),
            artifact: "Python.Runtime.dll".to_string(),
            backup_extension: "ori".to_string(),
            mac_build_artifact: PathBuf::from("build/Python.Runtime.mac"),
            interop_module: "clr".to_string(),
            mono_lib: PathBuf::from("/Library/Frameworks/Mono.framework/Versions/Current/lib"),
            pkg_config_file: "mono-2.pc".to_string(),
            python: PythonRequirement::default(),
        }
    }
}

impl Settings {
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|e| SetupError::Settings {
            path: origin.to_path_buf(),
            message: e.message().to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| SetupError::io("read settings", path, e))?;
        debug!(path = %path.display(), "loaded settings file");
        Self::from_toml(&text, path)
    }

    /// Loads `explicit` when given, otherwise the default settings file if it
    /// exists in `cwd`, otherwise built-in defaults.
    pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let fallback = cwd.join(DEFAULT_SETTINGS_FILE);
        if fallback.is_file() {
            Self::load(&fallback)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SetupError::Settings {
            path: PathBuf::from("<effective>"),
            message: e.to_string(),
        })
    }

    /// Packages handed to pip, which cannot install the environment manager.
    pub fn pip_packages(&self) -> impl Iterator<Item = &str> {
        self.packages
            .iter()
            .map(String::as_str)
            .filter(|pkg| *pkg != "conda")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let settings = Settings::from_toml(
            "packages_dir = \"deps\"\n\n[python]\nminor = 8\n",
            Path::new("inline.toml"),
        )
        .unwrap();

        assert_eq!(settings.packages_dir, PathBuf::from("deps"));
        assert_eq!(settings.python.major, 3);
        assert_eq!(settings.python.minor, 8);
        assert_eq!(settings.python.arch, Arch::X64);
        assert_eq!(settings.artifact, "Python.Runtime.dll");
    }

    #[test]
    fn malformed_file_reports_origin() {
        let err = Settings::from_toml("packages = 12", Path::new("bad.toml")).unwrap_err();
        match err {
            SetupError::Settings { path, .. } => assert_eq!(path, PathBuf::from("bad.toml")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn discover_prefers_file_in_working_directory() {
        let dir = TempDir::new().unwrap();
        assert_eq!(Settings::discover(None, dir.path()).unwrap(), Settings::default());

        fs::write(dir.path().join(DEFAULT_SETTINGS_FILE), "artifact = \"Other.dll\"\n").unwrap();
        let settings = Settings::discover(None, dir.path()).unwrap();
        assert_eq!(settings.artifact, "Other.dll");
    }

    #[test]
    fn pip_skips_environment_manager() {
        let settings = Settings::default();
        let pip: Vec<_> = settings.pip_packages().collect();
        assert_eq!(pip, ["pip", "wheel", "setuptools", "pandas"]);
    }

    #[test]
    fn effective_settings_serialize() {
        let text = Settings::default().to_toml().unwrap();
        assert!(text.contains("pythonnet_url"));
        assert_eq!(Settings::from_toml(&text, Path::new("x")).unwrap(), Settings::default());
    }
}
