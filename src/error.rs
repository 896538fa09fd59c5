//! Error types for provisioning.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SetupError>;

/// Coarse category of a [`SetupError`], used to pick a process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    MissingTool,
    NotFound,
    CommandFailed,
    ArtifactCopy,
    InteropInstall,
    Other,
}

impl ErrorKind {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Other => 1,
            ErrorKind::Configuration => 2,
            ErrorKind::MissingTool => 3,
            ErrorKind::NotFound => 4,
            ErrorKind::CommandFailed => 5,
            ErrorKind::ArtifactCopy => 6,
            ErrorKind::InteropInstall => 7,
        }
    }
}

#[derive(Debug, Error)]
pub enum SetupError {
    /// The running interpreter does not match the required version or architecture.
    #[error("Python {required} is required: version {found} found.")]
    Configuration { required: String, found: String },

    #[error("{tool} is required and not found in the path.{}", hint_suffix(.hint))]
    MissingTool { tool: String, hint: Option<String> },

    #[error("{what} not found in {location}.{}", line_suffix(.hint))]
    NotFound {
        what: String,
        location: String,
        hint: Option<String>,
    },

    /// Captured output of a command that exited non-zero.
    #[error("{output}")]
    CommandFailed { command: String, output: String },

    #[error("{artifact} not found in site-packages directories. Reason: {reason}")]
    ArtifactCopy { artifact: String, reason: String },

    #[error("Failed to install pythonnet. {hint}")]
    InteropInstall { hint: String },

    /// An interpreter path was given, but the embedded runtime is what gets checked.
    #[error(
        "{} cannot be provisioned by this build: it checks its embedded Python runtime only",
        .python.display()
    )]
    UnsupportedOverride { python: PathBuf },

    /// The embedded runtime reports an executable from another installation.
    #[error(
        "embedded Python runtime at {} reports foreign executable {}",
        .prefix.display(),
        .executable.display()
    )]
    ForeignExecutable { executable: PathBuf, prefix: PathBuf },

    #[error("could not inspect the Python interpreter: {reason}")]
    Probe { reason: String },

    #[error("invalid settings in {path}: {message}")]
    Settings { path: PathBuf, message: String },

    #[error("{operation} failed for {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn hint_suffix(hint: &Option<String>) -> String {
    match hint {
        Some(hint) => format!(" {hint}"),
        None => String::new(),
    }
}

fn line_suffix(hint: &Option<String>) -> String {
    match hint {
        Some(hint) => format!("\n{hint}"),
        None => String::new(),
    }
}

impl SetupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SetupError::Configuration { .. }
            | SetupError::UnsupportedOverride { .. }
            | SetupError::ForeignExecutable { .. } => ErrorKind::Configuration,
            SetupError::MissingTool { .. } => ErrorKind::MissingTool,
            SetupError::NotFound { .. } => ErrorKind::NotFound,
            SetupError::CommandFailed { .. } => ErrorKind::CommandFailed,
            SetupError::ArtifactCopy { .. } => ErrorKind::ArtifactCopy,
            SetupError::InteropInstall { .. } => ErrorKind::InteropInstall,
            SetupError::Probe { .. } | SetupError::Settings { .. } | SetupError::Io { .. } => {
                ErrorKind::Other
            }
        }
    }

    pub(crate) fn io(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        SetupError::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
