//! Inspection of the Python interpreter being provisioned.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, SetupError};
use crate::platform::Arch;
use crate::process::{check_output, CommandRunner, CommandSpec, ToolLocator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PythonVersion {
    pub major: u8,
    pub minor: u8,
}

impl std::fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterInfo {
    pub executable: PathBuf,
    pub version: PythonVersion,
    pub arch: Arch,
    /// `Py_ENABLE_SHARED` from the build configuration.
    pub shared: bool,
}

impl InterpreterInfo {
    /// `<prefix>/lib` for an interpreter living in `<prefix>/bin`.
    pub fn lib_dir(&self) -> PathBuf {
        let bin = self.executable.parent().unwrap_or(Path::new(""));
        bin.parent().unwrap_or(Path::new("")).join("lib")
    }
}

pub trait InterpreterProbe {
    fn probe(&self) -> Result<InterpreterInfo>;

    /// Directory holding the given importable module.
    fn module_dir(&self, module: &str) -> Result<PathBuf>;
}

const PROBE_SCRIPT: &str = "\
import sys, sysconfig
print(sys.executable)
print(sys.version_info.major)
print(sys.version_info.minor)
print('x64' if sys.maxsize > 2**32 else 'x86')
print(1 if sysconfig.get_config_var('Py_ENABLE_SHARED') else 0)
";

/// Picks the interpreter: explicit override, then `python3`, then `python`.
pub fn find_python(locator: &dyn ToolLocator, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    ["python3", "python"]
        .into_iter()
        .find_map(|name| locator.locate(name))
        .ok_or_else(|| SetupError::MissingTool {
            tool: "Python".to_string(),
            hint: None,
        })
}

/// Builds that check the linked runtime cannot provision another interpreter.
pub fn reject_interpreter_override(explicit: Option<&Path>) -> Result<()> {
    match explicit {
        Some(python) => Err(SetupError::UnsupportedOverride {
            python: python.to_path_buf(),
        }),
        None => Ok(()),
    }
}

/// Whether `executable`, after resolving symlinks, lives under one of `prefixes`.
pub fn executable_within(executable: &Path, prefixes: &[&Path]) -> bool {
    let resolve = |path: &Path| path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let executable = resolve(executable);
    prefixes.iter().any(|&prefix| executable.starts_with(resolve(prefix)))
}

/// Queries an interpreter by running it with `-c`.
pub struct SubprocessProbe<'a> {
    python: PathBuf,
    runner: &'a dyn CommandRunner,
}

impl<'a> SubprocessProbe<'a> {
    pub fn new(python: impl Into<PathBuf>, runner: &'a dyn CommandRunner) -> Self {
        Self {
            python: python.into(),
            runner,
        }
    }

    fn eval(&self, script: &str) -> Result<String> {
        let command = CommandSpec::new(&self.python).arg("-c").arg(script);
        check_output(self.runner, &command)
    }
}

impl InterpreterProbe for SubprocessProbe<'_> {
    fn probe(&self) -> Result<InterpreterInfo> {
        let output = self.eval(PROBE_SCRIPT)?;
        let info = parse_probe_output(&output)?;
        debug!(?info, "probed interpreter");
        Ok(info)
    }

    fn module_dir(&self, module: &str) -> Result<PathBuf> {
        let script = format!("import os, {module}; print(os.path.dirname({module}.__file__))");
        let output = self.eval(&script)?;
        Ok(PathBuf::from(output.trim()))
    }
}

fn parse_probe_output(output: &str) -> Result<InterpreterInfo> {
    let malformed = || SetupError::Probe {
        reason: format!("unexpected probe output: {output:?}"),
    };
    let mut lines = output.lines().map(str::trim);
    let mut next = || lines.next().ok_or_else(malformed);

    let executable = PathBuf::from(next()?);
    let major = next()?.parse().map_err(|_| malformed())?;
    let minor = next()?.parse().map_err(|_| malformed())?;
    let arch = Arch::parse(next()?).ok_or_else(malformed)?;
    let shared = next()? == "1";

    Ok(InterpreterInfo {
        executable,
        version: PythonVersion { major, minor },
        arch,
        shared,
    })
}

#[cfg(feature = "embedded-python")]
pub use embedded::EmbeddedProbe;

#[cfg(feature = "embedded-python")]
mod embedded {
    use std::path::PathBuf;

    use pyo3::prelude::*;

    use super::{executable_within, InterpreterInfo, InterpreterProbe, PythonVersion};
    use crate::error::{Result, SetupError};
    use crate::platform::Arch;

    /// Queries the interpreter linked into this process.
    ///
    /// `sys.executable` is resolved through PATH when Python is embedded, so it
    /// may name a different installation; that is rejected rather than reported.
    #[derive(Debug, Default)]
    pub struct EmbeddedProbe;

    fn probe_error(e: PyErr) -> SetupError {
        SetupError::Probe {
            reason: e.to_string(),
        }
    }

    impl InterpreterProbe for EmbeddedProbe {
        fn probe(&self) -> Result<InterpreterInfo> {
            let (info, base_prefix, prefix) = Python::with_gil(|py| {
                let sys = py.import("sys")?;
                let base_prefix: String = sys.getattr("base_prefix")?.extract()?;
                let prefix: String = sys.getattr("prefix")?.extract()?;
                Ok::<_, PyErr>((runtime_info(py)?, base_prefix, prefix))
            })
            .map_err(probe_error)?;

            let base_prefix = PathBuf::from(base_prefix);
            let prefix = PathBuf::from(prefix);
            let prefixes = [base_prefix.as_path(), prefix.as_path()];
            if !executable_within(&info.executable, &prefixes) {
                return Err(SetupError::ForeignExecutable {
                    executable: info.executable,
                    prefix: base_prefix,
                });
            }
            Ok(info)
        }

        fn module_dir(&self, module: &str) -> Result<PathBuf> {
            Python::with_gil(|py| -> PyResult<PathBuf> {
                let file: String = py.import(module)?.getattr("__file__")?.extract()?;
                let file = PathBuf::from(file);
                Ok(file.parent().map(PathBuf::from).unwrap_or_default())
            })
            .map_err(probe_error)
        }
    }

    fn runtime_info(py: Python<'_>) -> PyResult<InterpreterInfo> {
        let sys = py.import("sys")?;
        let executable: String = sys.getattr("executable")?.extract()?;
        let version_info = sys.getattr("version_info")?;
        let major: u8 = version_info.getattr("major")?.extract()?;
        let minor: u8 = version_info.getattr("minor")?.extract()?;
        let maxsize: u64 = sys.getattr("maxsize")?.extract()?;

        let sysconfig = py.import("sysconfig")?;
        let shared = sysconfig.call_method1("get_config_var", ("Py_ENABLE_SHARED",))?;
        let shared = !shared.is_none() && shared.is_truthy()?;

        Ok(InterpreterInfo {
            executable: PathBuf::from(executable),
            version: PythonVersion { major, minor },
            arch: if maxsize > 1 << 32 { Arch::X64 } else { Arch::X86 },
            shared,
        })
    }
}
