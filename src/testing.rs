//! Scripted stand-ins for processes, PATH lookup and the interpreter.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{Result, SetupError};
use crate::interpreter::{InterpreterInfo, InterpreterProbe, PythonVersion};
use crate::platform::Arch;
use crate::process::{CommandOutput, CommandRunner, CommandSpec, ToolLocator};

/// Answers each command with the first rule whose pattern occurs in the
/// rendered command line; unmatched commands succeed with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<(String, CommandOutput)>,
    log: RefCell<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, pattern: &str, output: CommandOutput) -> Self {
        self.rules.push((pattern.to_string(), output));
        self
    }

    pub fn commands(&self) -> Vec<CommandSpec> {
        self.log.borrow().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.log.borrow().iter().map(ToString::to_string).collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        self.log.borrow_mut().push(command.clone());
        let line = command.to_string();
        Ok(self
            .rules
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| CommandOutput::ok("")))
    }
}

/// Resolves the listed programs to `/usr/bin/<name>`.
pub struct FakeLocator {
    tools: HashMap<String, PathBuf>,
}

impl FakeLocator {
    pub fn with(names: &[&str]) -> Self {
        Self {
            tools: names
                .iter()
                .map(|name| (name.to_string(), PathBuf::from("/usr/bin").join(name)))
                .collect(),
        }
    }
}

impl ToolLocator for FakeLocator {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        self.tools.get(program).cloned()
    }
}

pub struct FakeProbe {
    pub info: InterpreterInfo,
    pub modules: HashMap<String, PathBuf>,
}

impl FakeProbe {
    pub fn python(major: u8, minor: u8, arch: Arch) -> Self {
        Self {
            info: InterpreterInfo {
                executable: PathBuf::from("/opt/python/bin/python"),
                version: PythonVersion { major, minor },
                arch,
                shared: true,
            },
            modules: HashMap::new(),
        }
    }

    pub fn shared(mut self, shared: bool) -> Self {
        self.info.shared = shared;
        self
    }

    pub fn module(mut self, name: &str, dir: impl Into<PathBuf>) -> Self {
        self.modules.insert(name.to_string(), dir.into());
        self
    }
}

impl InterpreterProbe for FakeProbe {
    fn probe(&self) -> Result<InterpreterInfo> {
        Ok(self.info.clone())
    }

    fn module_dir(&self, module: &str) -> Result<PathBuf> {
        self.modules.get(module).cloned().ok_or_else(|| SetupError::Probe {
            reason: format!("No module named '{module}'"),
        })
    }
}
