//! Runtime image generation with `jlink`

use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use tracing::info;

use super::config::PackConfig;
use super::error::PackError;
use super::runner::{CommandOutput, Runner};
use super::Result;

/// Module names from `java --list-modules` output (`name@version` per line)
pub fn parse_module_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| line.split('@').next())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Builds the trimmed runtime shipped inside the package
pub struct RuntimeImageBuilder<'a> {
    config: &'a PackConfig,
    runner: &'a dyn Runner,
}

impl<'a> RuntimeImageBuilder<'a> {
    pub fn new(config: &'a PackConfig, runner: &'a dyn Runner) -> Self {
        Self { config, runner }
    }

    /// Replace the runtime image directory with a fresh `jlink` output.
    ///
    /// The old image is deleted before `jlink` runs; a failure leaves no image.
    pub fn build(&self) -> Result<PathBuf> {
        let output_dir = self.config.runtime_image_dir();
        if output_dir.exists() {
            info!("Directory already exists, removing: {}", output_dir.display());
            fs::remove_dir_all(&output_dir)?;
        }

        let modules = self.list_modules()?;
        info!(
            "Generating custom runtime with {} modules at: {}",
            modules.len(),
            output_dir.display()
        );

        let jlink = self.config.jdk_tool("jlink");
        let args = vec![
            OsString::from("--module-path"),
            self.config.jdk_path.join("jmods").into_os_string(),
            OsString::from("--add-modules"),
            OsString::from(modules.join(",")),
            OsString::from("--output"),
            output_dir.clone().into_os_string(),
            OsString::from("--no-header-files"),
            OsString::from("--no-man-pages"),
        ];
        let output = self.runner.invoke(jlink.as_os_str(), &args)?;
        check("jlink", &output)?;

        info!("Custom runtime generated successfully");
        Ok(output_dir)
    }

    fn list_modules(&self) -> Result<Vec<String>> {
        let java = self.config.jdk_tool("java");
        let output = self
            .runner
            .invoke(java.as_os_str(), &[OsString::from("--list-modules")])?;
        check("java --list-modules", &output)?;

        let modules = parse_module_list(&output.stdout);
        if modules.is_empty() {
            return Err(PackError::FatalToolFailure {
                tool: "java --list-modules".to_string(),
                message: "no modules reported".to_string(),
            });
        }
        Ok(modules)
    }
}

fn check(tool: &str, output: &CommandOutput) -> Result<()> {
    if output.success() {
        Ok(())
    } else {
        Err(PackError::FatalToolFailure {
            tool: tool.to_string(),
            message: output.failure_message(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::ffi::OsStr;
    use tempfile::TempDir;

    struct ScriptedRunner {
        responses: RefCell<Vec<CommandOutput>>,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl ScriptedRunner {
        fn new(responses: Vec<CommandOutput>) -> Self {
            Self {
                responses: RefCell::new(responses),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Runner for ScriptedRunner {
        fn invoke(&self, program: &OsStr, args: &[OsString]) -> Result<CommandOutput> {
            let mut call = vec![program.to_string_lossy().to_string()];
            call.extend(args.iter().map(|a| a.to_string_lossy().to_string()));
            self.calls.borrow_mut().push(call);
            Ok(self.responses.borrow_mut().remove(0))
        }
    }

    fn ok(stdout: &str) -> CommandOutput {
        CommandOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    fn config(pack_dir: PathBuf) -> PackConfig {
        PackConfig {
            jdk_path: PathBuf::from("/opt/jdk22"),
            pack_dir,
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_module_list() {
        let output = "java.base@22.0.1\njava.desktop@22.0.1\r\n\njdk.unsupported\n";
        assert_eq!(
            parse_module_list(output),
            vec!["java.base", "java.desktop", "jdk.unsupported"]
        );
    }

    #[test]
    fn test_build_replaces_existing_image() {
        let out = TempDir::new().unwrap();
        let config = config(out.path().to_path_buf());
        let stale = config.runtime_image_dir().join("stale.txt");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, b"old").unwrap();

        let runner = ScriptedRunner::new(vec![ok("java.base@22\njava.sql@22\n"), ok("")]);
        let image = RuntimeImageBuilder::new(&config, &runner).build().unwrap();

        assert_eq!(image, config.runtime_image_dir());
        assert!(!stale.exists());
        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0][1], "--list-modules");
        let add_modules = calls[1].iter().position(|a| a == "--add-modules").unwrap();
        assert_eq!(calls[1][add_modules + 1], "java.base,java.sql");
        assert!(calls[1].contains(&"--no-man-pages".to_string()));
    }

    #[test]
    fn test_jlink_failure_is_fatal() {
        let out = TempDir::new().unwrap();
        let config = config(out.path().to_path_buf());
        let failed = CommandOutput {
            stdout: String::new(),
            stderr: "Error: module not found".to_string(),
            exit_code: Some(1),
        };
        let runner = ScriptedRunner::new(vec![ok("java.base@22\n"), failed]);
        let err = RuntimeImageBuilder::new(&config, &runner).build().unwrap_err();
        assert!(matches!(err, PackError::FatalToolFailure { ref tool, .. } if tool == "jlink"));
    }

    #[test]
    fn test_empty_module_list_is_fatal() {
        let out = TempDir::new().unwrap();
        let config = config(out.path().to_path_buf());
        let runner = ScriptedRunner::new(vec![ok("\n")]);
        let err = RuntimeImageBuilder::new(&config, &runner).build().unwrap_err();
        assert!(matches!(err, PackError::FatalToolFailure { .. }));
    }
}
