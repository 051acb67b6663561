//! Packaging pipeline - query, parse, map, mirror, generate

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::config::PackConfig;
use super::diagnostics::{query_process, DiagnosticRecord};
use super::error::PackError;
use super::launcher::LauncherGenerator;
use super::locator::ProcessHandle;
use super::mirror::{DependencyMirror, MirrorReport};
use super::remap::{resolve_entry, PathMapping};
use super::runner::Runner;
use super::runtime_image::RuntimeImageBuilder;
use super::Result;

/// Outcome of a successful packaging run
#[derive(Debug)]
pub struct PackageSummary {
    pub pack_dir: PathBuf,
    pub launcher_path: PathBuf,
    pub runtime_image: Option<PathBuf>,
    pub main_class: String,
    pub record: DiagnosticRecord,
    pub mirror: MirrorReport,
}

/// Pick the main class: diagnostics first, then the process hint, then config
pub fn resolve_main_class(
    record: &DiagnosticRecord,
    handle: &ProcessHandle,
    config: &PackConfig,
) -> Result<String> {
    if !record.main_class.is_empty() {
        return Ok(record.main_class.clone());
    }
    if !handle.main_class_hint.is_empty() {
        warn!(
            "No java_command in diagnostics, using main class from command line: {}",
            handle.main_class_hint
        );
        return Ok(handle.main_class_hint.clone());
    }
    match config.main_class.as_deref() {
        Some(main_class) if !main_class.is_empty() => {
            warn!("No java_command in diagnostics, using configured main class: {}", main_class);
            Ok(main_class.to_string())
        }
        _ => Err(PackError::NotFound(format!(
            "main class of process {}",
            handle.id
        ))),
    }
}

/// Make relative classpath entries absolute against the process's working directory.
///
/// Entries that cannot be resolved are dropped with a warning. A main entry
/// naming one of the classpath entries (a `-jar` launch) follows it.
pub fn resolve_relative_entries(
    mut record: DiagnosticRecord,
    mut main_class: String,
    handle: &ProcessHandle,
    config: &PackConfig,
) -> Result<(DiagnosticRecord, String)> {
    let platform = config.target;
    let base = handle
        .working_dir
        .as_ref()
        .map(|dir| dir.to_string_lossy().to_string());

    let mut entries = Vec::with_capacity(record.classpath_entries.len());
    for entry in std::mem::take(&mut record.classpath_entries) {
        match resolve_entry(&entry, base.as_deref(), platform) {
            Some(resolved) => {
                if resolved != entry {
                    debug!("Resolved relative classpath entry {} -> {}", entry, resolved);
                    if main_class == entry {
                        main_class = resolved.clone();
                    }
                }
                entries.push(resolved);
            }
            None => warn!(
                "Relative classpath entry {} skipped: working directory of process {} unknown",
                entry, handle.id
            ),
        }
    }
    if entries.is_empty() {
        return Err(PackError::MissingClasspath);
    }
    record.classpath_entries = entries;
    Ok((record, main_class))
}

/// Runs the packaging stages in order against one process
pub struct Pipeline<'a> {
    config: &'a PackConfig,
    runner: &'a dyn Runner,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a PackConfig, runner: &'a dyn Runner) -> Self {
        Self { config, runner }
    }

    /// Query the process and package it
    pub fn run(&self, handle: &ProcessHandle) -> Result<PackageSummary> {
        let jcmd = self.config.jdk_tool("jcmd");
        let diagnostics = query_process(self.runner, &jcmd, handle)?;
        self.package(&diagnostics, handle)
    }

    /// Package from already-captured diagnostic text.
    ///
    /// Nothing is written to disk until parsing and mapping have succeeded.
    pub fn package(&self, diagnostics: &str, handle: &ProcessHandle) -> Result<PackageSummary> {
        let config = self.config;

        let record = DiagnosticRecord::parse(diagnostics, config.target)?;
        info!("Found {} classpath entries", record.classpath_entries.len());
        if !record.jvm_args.is_empty() {
            info!("Extracted JVM arguments: {}", record.jvm_args.join(" "));
        }

        let main_class = resolve_main_class(&record, handle, config)?;
        let (record, main_class) = resolve_relative_entries(record, main_class, handle, config)?;
        let mapping = PathMapping::build(
            &record.classpath_entries,
            &config.extra_files_and_dirs,
            config,
        )?;

        fs::create_dir_all(&config.pack_dir)?;

        let runtime_image = if config.build_runtime_image {
            Some(RuntimeImageBuilder::new(config, self.runner).build()?)
        } else {
            None
        };

        let mirror = DependencyMirror::new(&config.pack_dir).mirror(&mapping);
        let launcher_path =
            LauncherGenerator::new(config).generate(&record, &mapping, &main_class)?;

        Ok(PackageSummary {
            pack_dir: config.pack_dir.clone(),
            launcher_path,
            runtime_image,
            main_class,
            record,
            mirror,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::TargetPlatform;

    fn handle(hint: &str) -> ProcessHandle {
        ProcessHandle {
            id: 42,
            main_class_hint: hint.to_string(),
            raw_command_line: String::new(),
            working_dir: None,
        }
    }

    #[test]
    fn test_main_class_prefers_diagnostics() {
        let record = DiagnosticRecord {
            main_class: "from.Diagnostics".into(),
            ..Default::default()
        };
        let main = resolve_main_class(&record, &handle("from.Hint"), &PackConfig::default());
        assert_eq!(main.unwrap(), "from.Diagnostics");
    }

    #[test]
    fn test_main_class_fallbacks() {
        let record = DiagnosticRecord::default();
        let config = PackConfig {
            main_class: Some("from.Config".into()),
            ..Default::default()
        };
        assert_eq!(
            resolve_main_class(&record, &handle("from.Hint"), &config).unwrap(),
            "from.Hint"
        );
        assert_eq!(
            resolve_main_class(&record, &handle(""), &config).unwrap(),
            "from.Config"
        );
        let err = resolve_main_class(&record, &handle(""), &PackConfig::default()).unwrap_err();
        assert!(matches!(err, PackError::NotFound(_)));
    }

    #[test]
    fn test_relative_entries_resolve_against_working_dir() {
        let config = PackConfig {
            target: TargetPlatform::Unix,
            ..Default::default()
        };
        let record = DiagnosticRecord {
            classpath_entries: vec![
                "/opt/lib/a.jar".into(),
                "app.jar".into(),
                "../shared/b.jar".into(),
            ],
            main_class: "app.jar".into(),
            ..Default::default()
        };
        let handle = ProcessHandle {
            working_dir: Some(PathBuf::from("/srv/app")),
            ..handle("")
        };

        let (record, main_class) =
            resolve_relative_entries(record, "app.jar".into(), &handle, &config).unwrap();
        assert_eq!(
            record.classpath_entries,
            vec!["/opt/lib/a.jar", "/srv/app/app.jar", "/srv/shared/b.jar"]
        );
        assert_eq!(main_class, "/srv/app/app.jar");
    }

    #[test]
    fn test_unresolvable_relative_entries_are_skipped() {
        let config = PackConfig {
            target: TargetPlatform::Unix,
            ..Default::default()
        };
        let record = DiagnosticRecord {
            classpath_entries: vec![
                "/opt/lib/a.jar".into(),
                "classes".into(),
                "/opt/lib/b.jar".into(),
            ],
            ..Default::default()
        };
        let (record, main_class) =
            resolve_relative_entries(record, "app.Main".into(), &handle(""), &config).unwrap();
        assert_eq!(record.classpath_entries, vec!["/opt/lib/a.jar", "/opt/lib/b.jar"]);
        assert_eq!(main_class, "app.Main");

        let only_relative = DiagnosticRecord {
            classpath_entries: vec!["classes".into()],
            ..Default::default()
        };
        let err = resolve_relative_entries(only_relative, "app.Main".into(), &handle(""), &config)
            .unwrap_err();
        assert!(matches!(err, PackError::MissingClasspath));
    }
}
