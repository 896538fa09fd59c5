//! External command execution and executable lookup.
//!
//! Every process the provisioner spawns goes through [`CommandRunner`], and
//! every PATH lookup through [`ToolLocator`], so the workflow can run against
//! scripted fakes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{Result, SetupError};

/// A command line plus extra environment for the child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: PathBuf,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_envs(&self) -> &[(String, String)] {
        &self.envs
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: output.into(),
            stderr: String::new(),
        }
    }

    /// Diagnostic text: stdout then stderr, one trimmed line per line.
    pub fn diagnostic(&self) -> String {
        self.stdout
            .lines()
            .chain(self.stderr.lines())
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub trait CommandRunner {
    /// Spawns the command and waits for it. Only spawn failures are errors;
    /// a non-zero exit is reported through [`CommandOutput::success`].
    fn run(&self, command: &CommandSpec) -> Result<CommandOutput>;
}

pub trait ToolLocator {
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// Runs `command` and returns its stdout, failing with the captured
/// diagnostic output when it exits non-zero.
pub fn check_output(runner: &dyn CommandRunner, command: &CommandSpec) -> Result<String> {
    let output = runner.run(command)?;
    if !output.success {
        return Err(SetupError::CommandFailed {
            command: command.to_string(),
            output: output.diagnostic(),
        });
    }
    Ok(output.stdout)
}

/// Real processes and the real PATH.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        debug!(command = %spec, "spawning");
        let mut command = Command::new(spec.program());
        command.args(spec.get_args());
        for (key, value) in spec.get_envs() {
            command.env(key, value);
        }

        let output = command
            .output()
            .map_err(|e| SetupError::io("spawn", spec.program(), e))?;
        debug!(command = %spec, status = ?output.status.code(), "finished");

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl ToolLocator for SystemRunner {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    #[test]
    fn display_joins_program_and_args() {
        let spec = CommandSpec::new("/usr/bin/python3")
            .args(["-m", "pip"])
            .arg("list")
            .env("PKG_CONFIG_PATH", "/x");
        assert_eq!(spec.to_string(), "/usr/bin/python3 -m pip list");
        assert_eq!(
            spec.get_envs(),
            [("PKG_CONFIG_PATH".to_string(), "/x".to_string())]
        );
    }

    #[test]
    fn diagnostic_reformats_each_line() {
        let output = CommandOutput {
            success: false,
            stdout: "Collecting pandas   \r\n".to_string(),
            stderr: "error: network unreachable\n".to_string(),
        };
        assert_eq!(output.diagnostic(), "Collecting pandas\nerror: network unreachable");
    }

    #[test]
    fn check_output_surfaces_failure_text() {
        let runner = ScriptedRunner::new()
            .respond("install", CommandOutput::failed("error: network unreachable"));
        let err = check_output(&runner, &CommandSpec::new("pip").arg("install")).unwrap_err();
        assert_eq!(err.to_string(), "error: network unreachable");
    }

    #[test]
    fn check_output_returns_stdout() {
        let runner = ScriptedRunner::new().respond("list", CommandOutput::ok("pip 20.0\n"));
        let out = check_output(&runner, &CommandSpec::new("pip").arg("list")).unwrap();
        assert_eq!(out, "pip 20.0\n");
    }
}
