//! Prerequisites of a provisioning run and the checks that enforce them.

use crate::config::{PythonRequirement, Settings};
use crate::error::{Result, SetupError};
use crate::interpreter::InterpreterInfo;
use crate::platform::Platform;
use crate::process::ToolLocator;

/// An executable that must be reachable through PATH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredTool {
    pub program: &'static str,
    /// Name used in messages.
    pub label: &'static str,
    pub install_link: Option<&'static str>,
}

const GIT: RequiredTool = RequiredTool {
    program: "git",
    label: "Git",
    install_link: Some("https://git-scm.com/downloads"),
};

const PIP: RequiredTool = RequiredTool {
    program: "pip",
    label: "pip",
    install_link: None,
};

impl RequiredTool {
    pub fn check(&self, locator: &dyn ToolLocator) -> Result<()> {
        match locator.locate(self.program) {
            Some(_) => Ok(()),
            None => Err(SetupError::MissingTool {
                tool: self.label.to_string(),
                hint: self.install_link.map(|link| format!("Link to install: {link}")),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentDescriptor {
    pub platform: Platform,
    pub required: PythonRequirement,
    /// Tools checked before anything is installed.
    pub tools: Vec<RequiredTool>,
}

impl EnvironmentDescriptor {
    pub fn new(platform: Platform, settings: &Settings) -> Self {
        Self {
            platform,
            required: settings.python.clone(),
            tools: vec![GIT, PIP],
        }
    }

    /// `pkg-config`, needed on macOS to build pythonnet against Mono.
    pub fn native_tool(&self) -> Option<RequiredTool> {
        match self.platform {
            Platform::MacOs => {
                let (program, link) = self.platform.native_prerequisite()?;
                Some(RequiredTool {
                    program,
                    label: program,
                    install_link: Some(link),
                })
            }
            _ => None,
        }
    }

    pub fn header(&self, settings: &Settings) -> String {
        let extra = self
            .platform
            .native_prerequisite()
            .map(|(name, link)| format!("\n        - {name}: {link}"))
            .unwrap_or_default();

        format!(
            "
    Python support in Lean with pythonnet
    =====================================

    Prerequisites:
        - LEAN: {readme}
        - Python {required}{extra}
        - git
        - pip

    It will update {packages} packages.
    ",
            readme = settings.readme_url,
            required = self.required,
            packages = settings.packages.join(", "),
        )
    }

    /// Rejects any interpreter other than the exact required version and
    /// architecture, then checks the required tools in order.
    pub fn check_requirements(
        &self,
        interpreter: &InterpreterInfo,
        locator: &dyn ToolLocator,
    ) -> Result<()> {
        let version_matches = interpreter.version.major == self.required.major
            && interpreter.version.minor == self.required.minor;
        if !version_matches || interpreter.arch != self.required.arch {
            return Err(SetupError::Configuration {
                required: self.required.to_string(),
                found: format!("{} {}", interpreter.version, interpreter.arch),
            });
        }

        for tool in &self.tools {
            tool.check(locator)?;
        }
        Ok(())
    }
}
