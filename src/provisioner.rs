//! The provisioning workflow.
//!
//! Preparation validates the host and locates the artifact to replace; only
//! then are packages installed, pythonnet built, and the artifact swapped.
//! Any failing step ends the run.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{info, warn};

use crate::artifact::{self, TargetArtifact};
use crate::config::Settings;
use crate::environment::EnvironmentDescriptor;
use crate::error::{Result, SetupError};
use crate::interop;
use crate::interpreter::{InterpreterInfo, InterpreterProbe};
use crate::native::{self, NativeBuildConfig};
use crate::outcome::Outcome;
use crate::packages::{self, PackageManager};
use crate::platform::Platform;
use crate::process::{CommandRunner, ToolLocator};

pub const REBUILD_MESSAGE: &str = "Please REBUILD Lean solution to complete pythonnet setup.";

/// Everything the workflow needs from the machine it runs on.
#[derive(Clone, Copy)]
pub struct Host<'a> {
    pub platform: Platform,
    pub runner: &'a dyn CommandRunner,
    pub locator: &'a dyn ToolLocator,
    pub probe: &'a dyn InterpreterProbe,
}

pub struct Provisioner<'a> {
    host: Host<'a>,
    settings: &'a Settings,
    interpreter: InterpreterInfo,
    native: NativeBuildConfig,
    target: TargetArtifact,
}

impl<'a> Provisioner<'a> {
    /// Prints the header, checks requirements, applies platform settings and
    /// backs up the target artifact found under `cwd`.
    pub fn prepare(host: Host<'a>, settings: &'a Settings, cwd: &Path) -> Result<Self> {
        let env = EnvironmentDescriptor::new(host.platform, settings);
        println!("{}", env.header(settings));

        let interpreter = host.probe.probe()?;
        env.check_requirements(&interpreter, host.locator)?;
        info!(
            python = %interpreter.executable.display(),
            version = %interpreter.version,
            "requirements met"
        );

        let native = native::configure(&env, settings, &interpreter, host.locator)?;
        let target = artifact::locate_target(settings, cwd)?;

        Ok(Self {
            host,
            settings,
            interpreter,
            native,
            target,
        })
    }

    pub fn target(&self) -> &TargetArtifact {
        &self.target
    }

    pub fn install_packages(&self) -> Result<BTreeSet<String>> {
        let manager = PackageManager::detect(self.host.locator, &self.interpreter.executable);
        packages::install_packages(&manager, self.host.runner, self.settings)
    }

    pub fn install_pythonnet(&self) -> Result<String> {
        interop::install_pythonnet(
            self.host.runner,
            &self.interpreter.executable,
            self.settings,
            &self.native,
        )
    }

    /// Copies the freshly built artifact over the target.
    pub fn update_artifact(&self) -> Result<Outcome> {
        let copy = || -> Result<()> {
            let module_dir = || self.host.probe.module_dir(&self.settings.interop_module);
            let shared = self.native.shared;
            let source = artifact::source_artifact(self.settings, &self.target, shared, module_dir);
            artifact::replace_target(&source?, &self.target)
        };
        copy().map_err(|e| SetupError::ArtifactCopy {
            artifact: self.settings.artifact.clone(),
            reason: e.to_string(),
        })?;
        Ok(Outcome::FollowUp(REBUILD_MESSAGE.to_string()))
    }
}

/// Runs the whole workflow.
pub fn provision(host: Host<'_>, settings: &Settings, cwd: &Path) -> Outcome {
    let run = || -> Result<Outcome> {
        let provisioner = Provisioner::prepare(host, settings, cwd)?;
        provisioner.install_packages()?;

        let output = provisioner.install_pythonnet()?;
        if !output.trim().is_empty() {
            return provisioner.update_artifact();
        }
        if host.platform.is_windows() {
            let link = host
                .platform
                .native_prerequisite()
                .map(|(_, link)| link)
                .unwrap_or_default();
            return Err(SetupError::InteropInstall {
                hint: format!("Please install Visual C++ for Python: {link}"),
            });
        }
        warn!("pythonnet installer produced no output; artifact left unchanged");
        Ok(Outcome::Success)
    };
    run().into()
}

/// Header and requirement checks only; nothing is installed or modified.
pub fn check(host: Host<'_>, settings: &Settings) -> Outcome {
    let run = || -> Result<Outcome> {
        let env = EnvironmentDescriptor::new(host.platform, settings);
        println!("{}", env.header(settings));
        let interpreter = host.probe.probe()?;
        env.check_requirements(&interpreter, host.locator)?;
        if let Some(tool) = env.native_tool() {
            tool.check(host.locator)?;
        }
        println!("All prerequisites found for {}", interpreter.executable.display());
        Ok(Outcome::Success)
    };
    run().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    use crate::platform::Arch;
    use crate::process::CommandOutput;
    use crate::testing::{FakeLocator, FakeProbe, ScriptedRunner};

    struct Workspace {
        root: TempDir,
        site_packages: PathBuf,
    }

    impl Workspace {
        fn new() -> Self {
            let root = TempDir::new().unwrap();
            let lib = root.path().join("packages/QuantConnect.pythonnet/lib");
            fs::create_dir_all(&lib).unwrap();
            fs::write(lib.join("Python.Runtime.dll"), b"stock").unwrap();

            let site_packages = root.path().join("site-packages");
            fs::create_dir_all(&site_packages).unwrap();
            fs::write(site_packages.join("Python.Runtime.dll"), b"fresh").unwrap();
            Self { root, site_packages }
        }

        fn cwd(&self) -> &Path {
            self.root.path()
        }

        fn target(&self) -> PathBuf {
            self.cwd().join("packages/QuantConnect.pythonnet/lib/Python.Runtime.dll")
        }
    }

    fn host<'a>(
        platform: Platform,
        runner: &'a ScriptedRunner,
        locator: &'a FakeLocator,
        probe: &'a FakeProbe,
    ) -> Host<'a> {
        Host {
            platform,
            runner,
            locator,
            probe,
        }
    }

    #[test]
    fn full_run_replaces_artifact_and_asks_for_rebuild() {
        let ws = Workspace::new();
        let runner = ScriptedRunner::new()
            .respond("git+", CommandOutput::ok("Successfully installed pythonnet\n"));
        let locator = FakeLocator::with(&["git", "pip"]);
        let probe = FakeProbe::python(3, 6, Arch::X64).module("clr", &ws.site_packages);

        let machine = host(Platform::Other, &runner, &locator, &probe);
        let outcome = provision(machine, &Settings::default(), ws.cwd());

        match outcome {
            Outcome::FollowUp(message) => assert_eq!(message, REBUILD_MESSAGE),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(fs::read(ws.target()).unwrap(), b"fresh");
        assert_eq!(fs::read(ws.target().with_extension("ori")).unwrap(), b"stock");
    }

    #[test]
    fn installer_failure_stops_the_run() {
        let ws = Workspace::new();
        let runner = ScriptedRunner::new()
            .respond("git+", CommandOutput::failed("error: network unreachable"));
        let locator = FakeLocator::with(&["git", "pip"]);
        let probe = FakeProbe::python(3, 6, Arch::X64).module("clr", &ws.site_packages);

        let machine = host(Platform::Other, &runner, &locator, &probe);
        let outcome = provision(machine, &Settings::default(), ws.cwd());

        match &outcome {
            Outcome::Failure(err) => assert_eq!(err.to_string(), "error: network unreachable"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(outcome.exit_code(), 5);
        assert!(runner.command_lines().last().unwrap().contains("git+"));
        assert_eq!(fs::read(ws.target()).unwrap(), b"stock");
    }

    #[test]
    fn wrong_interpreter_fails_before_anything_runs() {
        let ws = Workspace::new();
        let runner = ScriptedRunner::new();
        let locator = FakeLocator::with(&["git", "pip"]);
        let probe = FakeProbe::python(3, 7, Arch::X64);

        let machine = host(Platform::Other, &runner, &locator, &probe);
        let outcome = provision(machine, &Settings::default(), ws.cwd());

        assert!(matches!(outcome, Outcome::Failure(SetupError::Configuration { .. })));
        assert!(runner.commands().is_empty());
        assert!(!ws.target().with_extension("ori").exists());
    }

    #[test]
    fn silent_installer_on_windows_needs_visual_cpp() {
        let ws = Workspace::new();
        let runner = ScriptedRunner::new();
        let locator = FakeLocator::with(&["git", "pip"]);
        let probe = FakeProbe::python(3, 6, Arch::X64);

        let machine = host(Platform::Windows, &runner, &locator, &probe);
        let outcome = provision(machine, &Settings::default(), ws.cwd());
        match outcome {
            Outcome::Failure(err @ SetupError::InteropInstall { .. }) => {
                assert!(err.to_string().contains("Visual C++ for Python"))
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let machine = host(Platform::Other, &runner, &locator, &probe);
        let outcome = provision(machine, &Settings::default(), ws.cwd());
        assert!(matches!(outcome, Outcome::Success));
        assert_eq!(fs::read(ws.target()).unwrap(), b"stock");
    }

    #[test]
    fn missing_interop_module_reports_reason() {
        let ws = Workspace::new();
        let runner = ScriptedRunner::new().respond("git+", CommandOutput::ok("done\n"));
        let locator = FakeLocator::with(&["git", "pip"]);
        let probe = FakeProbe::python(3, 6, Arch::X64);

        let machine = host(Platform::Other, &runner, &locator, &probe);
        let outcome = provision(machine, &Settings::default(), ws.cwd());
        match outcome {
            Outcome::Failure(err @ SetupError::ArtifactCopy { .. }) => assert_eq!(
                err.to_string(),
                "Python.Runtime.dll not found in site-packages directories. \
                 Reason: could not inspect the Python interpreter: No module named 'clr'"
            ),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn check_mode_touches_nothing() {
        let runner = ScriptedRunner::new();
        let locator = FakeLocator::with(&["git", "pip"]);
        let probe = FakeProbe::python(3, 6, Arch::X64);

        let outcome = check(host(Platform::MacOs, &runner, &locator, &probe), &Settings::default());
        assert!(matches!(outcome, Outcome::Failure(SetupError::MissingTool { .. })));

        let locator = FakeLocator::with(&["git", "pip", "pkg-config"]);
        let outcome = check(host(Platform::MacOs, &runner, &locator, &probe), &Settings::default());
        assert!(matches!(outcome, Outcome::Success));
        assert!(runner.commands().is_empty());
    }
}
