//! Host platform detection.

use std::fmt;

use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Other
        }
    }

    pub fn is_macos(self) -> bool {
        self == Platform::MacOs
    }

    pub fn is_windows(self) -> bool {
        self == Platform::Windows
    }

    /// Extra native prerequisite for building pythonnet, as `(name, link)`.
    pub fn native_prerequisite(self) -> Option<(&'static str, &'static str)> {
        match self {
            Platform::MacOs => Some(("pkg-config", "http://macappstore.org/pkg-config/")),
            Platform::Windows => Some((
                "Visual C++ for Python",
                "https://www.microsoft.com/en-us/download/details.aspx?id=44266",
            )),
            Platform::Other => None,
        }
    }
}

/// Pointer width of an interpreter build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X64,
    X86,
}

impl Arch {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "x64" => Some(Arch::X64),
            "x86" => Some(Arch::X86),
            _ => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Arch::X64 => "x64",
            Arch::X86 => "x86",
        })
    }
}

/// Logs what sysinfo knows about the host operating system.
pub fn log_host_details(platform: Platform) {
    debug!(
        ?platform,
        os = System::name().unwrap_or_default(),
        os_version = System::long_os_version().unwrap_or_default(),
        kernel = System::kernel_version().unwrap_or_default(),
        "host details"
    );
}
