//! Target platform conventions for the generated package

use serde::{Deserialize, Serialize};

/// Platform the generated launcher and classpath are written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPlatform {
    Windows,
    Unix,
}

impl Default for TargetPlatform {
    fn default() -> Self {
        Self::host()
    }
}

impl TargetPlatform {
    /// The platform this binary was built for
    pub fn host() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    /// Separator between entries of a classpath
    pub fn path_list_separator(&self) -> char {
        match self {
            Self::Windows => ';',
            Self::Unix => ':',
        }
    }

    /// Separator between components of a single path
    pub fn path_separator(&self) -> char {
        match self {
            Self::Windows => '\\',
            Self::Unix => '/',
        }
    }

    /// Whether `c` separates path components on this platform
    pub fn is_separator(&self, c: char) -> bool {
        match self {
            Self::Windows => c == '\\' || c == '/',
            Self::Unix => c == '/',
        }
    }

    /// Whether file names compare case-insensitively
    pub fn case_insensitive(&self) -> bool {
        matches!(self, Self::Windows)
    }

    /// Default launcher script file name
    pub fn launcher_file_name(&self) -> &'static str {
        match self {
            Self::Windows => "start_program.bat",
            Self::Unix => "start_program.sh",
        }
    }

    /// Join relative path components with this platform's separator
    pub fn join<S: AsRef<str>>(&self, components: &[S]) -> String {
        let sep = self.path_separator().to_string();
        components
            .iter()
            .map(|c| c.as_ref())
            .collect::<Vec<_>>()
            .join(&sep)
    }
}

/// Append the host executable suffix to a tool name
pub fn executable_name(tool: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", tool)
    } else {
        tool.to_string()
    }
}
