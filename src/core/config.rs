//! Packaging configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::PackError;
use super::Result;
use crate::platform::{self, TargetPlatform};

/// Packaging settings, built once at startup and passed down by reference
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackConfig {
    // Toolchain
    /// JDK holding `bin/jcmd`, `bin/java`, `bin/jlink` and `jmods`
    pub jdk_path: PathBuf,
    /// Build a trimmed runtime image into the package
    pub build_runtime_image: bool,
    /// Timeout for each external tool invocation in seconds (0 = wait forever)
    pub tool_timeout_secs: u64,

    // Output layout
    /// Package output root
    pub pack_dir: PathBuf,
    /// Directory under the package root holding mirrored classpath entries
    pub dependency_dir_name: String,
    /// Directory under the package root holding the runtime image
    pub runtime_image_dir_name: String,
    /// Launcher script file name (defaults per target platform)
    pub launcher_name: Option<String>,
    /// Platform the launcher is generated for
    pub target: TargetPlatform,

    // Process selection
    /// Substring of the process name or command line identifying candidates
    pub process_filter: String,
    /// Main class to look for; also the fallback when diagnostics omit it
    pub main_class: Option<String>,

    // Launch defaults
    /// JVM arguments used when none are recovered from the process
    pub default_jvm_args: Vec<String>,
    /// Program arguments used when none are recovered from the process
    pub default_program_args: Vec<String>,

    /// Files and directories copied directly under the package root
    pub extra_files_and_dirs: Vec<PathBuf>,

    /// Enable debug logging
    pub debug_logging: bool,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            jdk_path: std::env::var_os("JAVA_HOME")
                .map(PathBuf::from)
                .unwrap_or_default(),
            build_runtime_image: true,
            tool_timeout_secs: 120,

            pack_dir: PathBuf::from("pack"),
            dependency_dir_name: "dependencies".to_string(),
            runtime_image_dir_name: "custom-jre".to_string(),
            launcher_name: None,
            target: TargetPlatform::host(),

            process_filter: "java".to_string(),
            main_class: None,

            default_jvm_args: vec!["--add-opens=java.desktop/java.beans=ALL-UNNAMED".to_string()],
            default_program_args: Vec::new(),

            extra_files_and_dirs: Vec::new(),

            debug_logging: false,
        }
    }
}

impl PackConfig {
    /// Default location of the config file
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("livepack")
            .join("config.json")
    }

    /// Load config from an explicit path, which must exist.
    ///
    /// The result is not validated; call [`PackConfig::validate`] once any
    /// overrides have been applied.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PackError::NotFound(format!(
                "config file {}",
                path.display()
            )));
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load config from the default location, falling back to built-in defaults
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reject values that would produce a broken or escaping package
    pub fn validate(&self) -> Result<()> {
        for (field, name) in [
            ("dependency_dir_name", &self.dependency_dir_name),
            ("runtime_image_dir_name", &self.runtime_image_dir_name),
        ] {
            if !is_plain_name(name) {
                return Err(PackError::Config(format!(
                    "{} must be a single path component, got '{}'",
                    field, name
                )));
            }
        }
        if let Some(ref launcher) = self.launcher_name {
            if !is_plain_name(launcher) {
                return Err(PackError::Config(format!(
                    "launcher_name must be a single path component, got '{}'",
                    launcher
                )));
            }
        }
        let names = [
            ("dependency_dir_name", self.dependency_dir_name.as_str()),
            ("runtime_image_dir_name", self.runtime_image_dir_name.as_str()),
            ("launcher_name", self.launcher_file_name()),
        ];
        let fold = |name: &str| {
            if self.target.case_insensitive() {
                name.to_lowercase()
            } else {
                name.to_string()
            }
        };
        for (i, (field, name)) in names.iter().enumerate() {
            for (other_field, other) in &names[i + 1..] {
                if fold(name) == fold(other) {
                    return Err(PackError::Config(format!(
                        "{} and {} must differ, both are '{}'",
                        field, other_field, name
                    )));
                }
            }
        }
        if self.pack_dir.as_os_str().is_empty() {
            return Err(PackError::Config("pack_dir must not be empty".to_string()));
        }
        if self.build_runtime_image && self.jdk_path.as_os_str().is_empty() {
            return Err(PackError::Config(
                "jdk_path is required (set it or JAVA_HOME)".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-tool timeout, if any
    pub fn tool_timeout(&self) -> Option<Duration> {
        (self.tool_timeout_secs > 0).then(|| Duration::from_secs(self.tool_timeout_secs))
    }

    /// Launcher script file name
    pub fn launcher_file_name(&self) -> &str {
        self.launcher_name
            .as_deref()
            .unwrap_or_else(|| self.target.launcher_file_name())
    }

    /// Path to a JDK tool, e.g. `jcmd`
    pub fn jdk_tool(&self, tool: &str) -> PathBuf {
        if self.jdk_path.as_os_str().is_empty() {
            PathBuf::from(platform::executable_name(tool))
        } else {
            self.jdk_path.join("bin").join(platform::executable_name(tool))
        }
    }

    /// Directory of the runtime image inside the package
    pub fn runtime_image_dir(&self) -> PathBuf {
        self.pack_dir.join(&self.runtime_image_dir_name)
    }

    /// Path of the generated launcher
    pub fn launcher_path(&self) -> PathBuf {
        self.pack_dir.join(self.launcher_file_name())
    }

    /// Java executable inside the package, relative to the package root
    pub fn runtime_executable(&self) -> String {
        self.target
            .join(&[self.runtime_image_dir_name.as_str(), "bin", "java"])
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', ':'])
}
