//! pythonnet-setup: prepares a Python interpreter for Lean's pythonnet bridge.
//!
//! The run checks the interpreter and the tools it depends on, installs the
//! required packages through conda or pip, builds pythonnet from source and
//! copies the resulting `Python.Runtime.dll` into Lean's package tree.

pub mod artifact;
pub mod config;
pub mod environment;
pub mod error;
pub mod interop;
pub mod interpreter;
pub mod native;
pub mod outcome;
pub mod packages;
pub mod platform;
pub mod process;
pub mod provisioner;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Settings;
pub use error::{ErrorKind, SetupError};
pub use interpreter::{
    executable_within, find_python, reject_interpreter_override, InterpreterProbe, SubprocessProbe,
};
pub use outcome::Outcome;
pub use platform::Platform;
pub use process::SystemRunner;
pub use provisioner::{check, provision, Host};

#[cfg(feature = "embedded-python")]
pub use interpreter::EmbeddedProbe;
