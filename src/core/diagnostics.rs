//! Parsing `jcmd <pid> VM.command_line` output
//!
//! The output is free-form text owned by the JDK. Three lines matter, each
//! located independently of the others:
//!
//! ```text
//! jvm_args: -Xmx512m -Dfoo=bar
//! java_command: com.example.Main arg1 arg2
//! java_class_path (initial): C:\libs\a.jar;D:\libs\b.jar
//! ```
//!
//! Everything else is ignored.

use std::ffi::OsString;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use super::error::PackError;
use super::locator::ProcessHandle;
use super::runner::Runner;
use super::Result;
use crate::platform::TargetPlatform;

static CLASSPATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*java_class_path \(initial\):[ \t]*(.*?)[ \t\r]*$")
        .expect("classpath pattern is valid")
});

static JVM_ARGS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*jvm_args:[ \t]*(.*?)[ \t\r]*$").expect("jvm_args pattern is valid")
});

static JAVA_COMMAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*java_command:[ \t]*(.*?)[ \t\r]*$")
        .expect("java_command pattern is valid")
});

/// Startup parameters recovered from a running JVM
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticRecord {
    /// Classpath entries in search-precedence order
    pub classpath_entries: Vec<String>,
    /// JVM arguments, unfiltered
    pub jvm_args: Vec<String>,
    /// Main class or entry identifier; empty if not reported
    pub main_class: String,
    /// Program arguments
    pub program_args: Vec<String>,
}

impl DiagnosticRecord {
    /// Parse raw diagnostic text.
    ///
    /// A missing classpath is fatal. Missing JVM arguments or command yield
    /// empty fields. Any field reported more than once is ambiguous.
    pub fn parse(text: &str, platform: TargetPlatform) -> Result<Self> {
        let classpath = single_match(&CLASSPATH_RE, text, "java_class_path")?
            .ok_or(PackError::MissingClasspath)?;
        let classpath_entries: Vec<String> = classpath
            .split(platform.path_list_separator())
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(String::from)
            .collect();
        if classpath_entries.is_empty() {
            return Err(PackError::MissingClasspath);
        }

        let jvm_args = single_match(&JVM_ARGS_RE, text, "jvm_args")?
            .map(tokens)
            .unwrap_or_default();

        let command = single_match(&JAVA_COMMAND_RE, text, "java_command")?
            .filter(|cmd| !cmd.is_empty() && !cmd.eq_ignore_ascii_case("<unknown>"))
            .map(tokens)
            .unwrap_or_default();
        let mut command = command.into_iter();
        let main_class = command.next().unwrap_or_default();
        let program_args = command.collect();

        Ok(Self {
            classpath_entries,
            jvm_args,
            main_class,
            program_args,
        })
    }
}

/// Capture group 1 of the only match, `None` if absent
fn single_match<'t>(
    re: &Regex,
    text: &'t str,
    field: &'static str,
) -> Result<Option<&'t str>> {
    let mut matches = re.captures_iter(text);
    let first = matches.next();
    let extra = matches.count();
    if extra > 0 {
        return Err(PackError::AmbiguousDiagnostics {
            field,
            count: extra + 1,
        });
    }
    Ok(first.and_then(|c| c.get(1)).map(|m| m.as_str()))
}

fn tokens(s: &str) -> Vec<String> {
    s.split_whitespace().map(String::from).collect()
}

/// Ask the JVM behind `handle` for its startup parameters
pub fn query_process(runner: &dyn Runner, jcmd: &Path, handle: &ProcessHandle) -> Result<String> {
    info!("Querying process {} with {:?}", handle.id, jcmd);
    let args = vec![
        OsString::from(handle.id.to_string()),
        OsString::from("VM.command_line"),
    ];
    let output = runner.invoke(jcmd.as_os_str(), &args).map_err(|e| match e {
        PackError::FatalToolFailure { message, .. } => PackError::QueryFailure(message),
        other => other,
    })?;

    if !output.success() {
        return Err(PackError::QueryFailure(output.failure_message()));
    }
    if !output.stderr.trim().is_empty() {
        return Err(PackError::QueryFailure(output.stderr.trim().to_string()));
    }
    debug!("Diagnostic output:\n{}", output.stdout);
    Ok(output.stdout)
}
