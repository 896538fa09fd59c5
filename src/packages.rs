//! Installing and updating the fixed package set through conda or pip.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::Settings;
use crate::error::Result;
use crate::process::{check_output, CommandRunner, CommandSpec, ToolLocator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageManager {
    Conda(PathBuf),
    Pip { python: PathBuf },
}

impl PackageManager {
    /// conda when it is on PATH, pip through the interpreter otherwise.
    pub fn detect(locator: &dyn ToolLocator, python: &Path) -> Self {
        match locator.locate("conda") {
            Some(conda) => PackageManager::Conda(conda),
            None => PackageManager::Pip {
                python: python.to_path_buf(),
            },
        }
    }

    fn label(&self) -> &'static str {
        match self {
            PackageManager::Conda(_) => "conda",
            PackageManager::Pip { .. } => " pip ",
        }
    }

    fn list_command(&self) -> CommandSpec {
        match self {
            PackageManager::Conda(conda) => CommandSpec::new(conda).arg("list"),
            PackageManager::Pip { python } => pip(python).arg("list"),
        }
    }

    /// Names from the fixed package list that the manager reports as installed.
    pub fn installed(
        &self,
        runner: &dyn CommandRunner,
        packages: &[String],
    ) -> Result<BTreeSet<String>> {
        let listing = check_output(runner, &self.list_command())?;
        Ok(parse_listing(&listing, packages))
    }
}

fn pip(python: &Path) -> CommandSpec {
    CommandSpec::new(python).args(["-m", "pip"])
}

/// `<python> -m pip install -U <args>`.
pub fn pip_install(python: &Path) -> CommandSpec {
    pip(python).args(["install", "-U"])
}

/// First column of each listing line, restricted to `packages`.
pub fn parse_listing(listing: &str, packages: &[String]) -> BTreeSet<String> {
    let listed: BTreeSet<&str> = listing
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    packages
        .iter()
        .filter(|pkg| listed.contains(pkg.as_str()))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondaAction {
    Install,
    Update,
}

impl fmt::Display for CondaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CondaAction::Install => "install",
            CondaAction::Update => "update",
        })
    }
}

/// `update` for packages already installed, `install` for the rest, in list order.
pub fn plan_conda<'a>(
    packages: &'a [String],
    installed: &BTreeSet<String>,
) -> Vec<(CondaAction, &'a str)> {
    packages
        .iter()
        .map(|pkg| {
            let action = if installed.contains(pkg) {
                CondaAction::Update
            } else {
                CondaAction::Install
            };
            (action, pkg.as_str())
        })
        .collect()
}

/// Brings every listed package up to date and returns the ones present afterwards.
pub fn install_packages(
    manager: &PackageManager,
    runner: &dyn CommandRunner,
    settings: &Settings,
) -> Result<BTreeSet<String>> {
    println!(
        "
    Install/updates required packages
    ---------------------------------
    "
    );

    match manager {
        PackageManager::Conda(conda) => {
            let installed = manager.installed(runner, &settings.packages)?;
            for (action, pkg) in plan_conda(&settings.packages, &installed) {
                info!(%action, pkg, "conda");
                let command = CommandSpec::new(conda)
                    .arg(action.to_string())
                    .args(["-y", pkg]);
                check_output(runner, &command)?;
            }
        }
        PackageManager::Pip { python } => {
            let command = pip_install(python).args(settings.pip_packages());
            check_output(runner, &command)?;
        }
    }

    let present = manager.installed(runner, &settings.packages)?;
    println!(
        "[{}] Successfully installed/updated: {}",
        manager.label(),
        present.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    );
    Ok(present)
}
