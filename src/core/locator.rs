//! Process discovery - finding the running JVM to package

use std::io::IsTerminal;
use std::path::PathBuf;

use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::{debug, info};

use super::error::PackError;
use super::Result;

/// A local process that may be packaged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    /// Operating system process ID
    pub id: u32,
    /// Main class (or jar) guessed from the command line
    pub main_class_hint: String,
    /// Full command line as reported by the OS
    pub raw_command_line: String,
    /// Working directory, used to resolve relative classpath entries
    pub working_dir: Option<PathBuf>,
}

impl ProcessHandle {
    /// Build a handle from a process command line
    pub fn from_command(id: u32, cmd: &[String]) -> Self {
        Self {
            id,
            main_class_hint: main_class_hint(cmd),
            raw_command_line: cmd.join(" "),
            working_dir: None,
        }
    }

    /// One-line description for selection lists
    pub fn label(&self) -> String {
        let hint = if self.main_class_hint.is_empty() {
            "<unknown main class>"
        } else {
            &self.main_class_hint
        };
        format!("{:>7}  {}", self.id, hint)
    }
}

/// Launcher options whose value is the following token
const OPTIONS_WITH_VALUE: &[&str] = &[
    "-cp",
    "-classpath",
    "--class-path",
    "-p",
    "--module-path",
    "--upgrade-module-path",
    "--add-modules",
    "--limit-modules",
    "--add-opens",
    "--add-exports",
    "--add-reads",
    "--patch-module",
    "--enable-native-access",
];

/// Guess the entry point from a `java` command line.
///
/// Returns the jar for `-jar`, the module entry for `-m`/`--module`, otherwise
/// the first token after the executable that is not an option or an option's
/// value. Empty if nothing qualifies.
pub fn main_class_hint(cmd: &[String]) -> String {
    let mut tokens = cmd.iter().skip(1);
    while let Some(token) = tokens.next() {
        match token.as_str() {
            "-jar" | "-m" | "--module" => {
                return tokens.next().cloned().unwrap_or_default();
            }
            t if OPTIONS_WITH_VALUE.contains(&t) => {
                tokens.next();
            }
            t if t.starts_with('-') => {}
            t => return t.to_string(),
        }
    }
    String::new()
}

/// Enumerates candidate processes on the local machine
pub struct ProcessLocator {
    system: System,
    filter: String,
    main_class: Option<String>,
}

impl ProcessLocator {
    pub fn new(filter: impl Into<String>, main_class: Option<String>) -> Self {
        Self {
            system: System::new(),
            filter: filter.into(),
            main_class,
        }
    }

    /// Refresh the process table and return matching candidates sorted by pid
    pub fn candidates(&mut self) -> Vec<ProcessHandle> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::everything(),
        );

        let own_pid = std::process::id();
        let mut handles: Vec<ProcessHandle> = self
            .system
            .processes()
            .iter()
            .filter(|(pid, _)| pid.as_u32() != own_pid)
            .filter_map(|(pid, proc)| {
                let cmd: Vec<String> = proc
                    .cmd()
                    .iter()
                    .map(|s| s.to_string_lossy().to_string())
                    .collect();
                let name = proc.name().to_string_lossy();
                let handle = ProcessHandle::from_command(pid.as_u32(), &cmd);
                if !matches_filter(&name, &handle.raw_command_line, &self.filter) {
                    return None;
                }
                Some(ProcessHandle {
                    working_dir: proc.cwd().map(|dir| dir.to_path_buf()),
                    ..handle
                })
            })
            .collect();

        handles = filter_by_main_class(handles, self.main_class.as_deref());
        handles.sort_by_key(|h| h.id);
        debug!("Found {} candidate processes", handles.len());
        handles
    }
}

/// Whether the process name or full command line contains `filter`, ignoring case
pub fn matches_filter(name: &str, command_line: &str, filter: &str) -> bool {
    let filter = filter.to_lowercase();
    name.to_lowercase().contains(&filter) || command_line.to_lowercase().contains(&filter)
}

/// Keep only candidates whose hint contains `main_class`
pub fn filter_by_main_class(
    handles: Vec<ProcessHandle>,
    main_class: Option<&str>,
) -> Vec<ProcessHandle> {
    match main_class {
        Some(wanted) if !wanted.is_empty() => handles
            .into_iter()
            .filter(|h| h.main_class_hint.contains(wanted))
            .collect(),
        _ => handles,
    }
}

/// Chooses one process among candidates
pub trait ProcessSelector {
    /// Index into `candidates`, or `None` if nothing was chosen
    fn choose(&self, candidates: &[ProcessHandle]) -> Result<Option<usize>>;
}

/// Interactive selection on the terminal
pub struct ConsoleSelector;

impl ProcessSelector for ConsoleSelector {
    fn choose(&self, candidates: &[ProcessHandle]) -> Result<Option<usize>> {
        if candidates.is_empty() {
            return Ok(None);
        }
        if !std::io::stdin().is_terminal() {
            return Err(PackError::NotFound(
                "no terminal for interactive selection; use --pid or --first".to_string(),
            ));
        }
        let items: Vec<String> = candidates.iter().map(ProcessHandle::label).collect();
        Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Select the Java process to package")
            .items(&items)
            .default(0)
            .interact_opt()
            .map_err(|e| PackError::Io(std::io::Error::other(e)))
    }
}

/// Picks the first candidate
pub struct FirstMatchSelector;

impl ProcessSelector for FirstMatchSelector {
    fn choose(&self, candidates: &[ProcessHandle]) -> Result<Option<usize>> {
        Ok((!candidates.is_empty()).then_some(0))
    }
}

/// Picks the candidate with a known pid
pub struct PidSelector(pub u32);

impl ProcessSelector for PidSelector {
    fn choose(&self, candidates: &[ProcessHandle]) -> Result<Option<usize>> {
        Ok(candidates.iter().position(|h| h.id == self.0))
    }
}

/// Run `selector` over `candidates` and return the chosen handle
pub fn select_process(
    candidates: Vec<ProcessHandle>,
    selector: &dyn ProcessSelector,
) -> Result<ProcessHandle> {
    if candidates.is_empty() {
        return Err(PackError::NotFound("no candidate Java process".to_string()));
    }
    let index = selector
        .choose(&candidates)?
        .ok_or_else(|| PackError::NotFound("no process selected".to_string()))?;
    let handle = candidates
        .into_iter()
        .nth(index)
        .ok_or_else(|| PackError::NotFound(format!("selection {} out of range", index)))?;
    info!("Selected process {} ({})", handle.id, handle.main_class_hint);
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_hint_skips_options_and_values() {
        let line = cmd(&[
            "java",
            "-Xmx512m",
            "-cp",
            "a.jar:b.jar",
            "--add-opens",
            "java.base/java.lang=ALL-UNNAMED",
            "com.example.Main",
            "arg1",
        ]);
        assert_eq!(main_class_hint(&line), "com.example.Main");
    }

    #[test]
    fn test_hint_jar_and_module() {
        assert_eq!(main_class_hint(&cmd(&["java", "-jar", "app.jar", "x"])), "app.jar");
        assert_eq!(
            main_class_hint(&cmd(&["java", "-m", "my.mod/my.pkg.Main"])),
            "my.mod/my.pkg.Main"
        );
        assert_eq!(main_class_hint(&cmd(&["java", "-version"])), "");
    }

    #[test]
    fn test_filter_matches_anywhere_in_command_line() {
        let line = "/usr/bin/env JAVA_HOME=/opt/jdk /opt/jdk/bin/Java -cp app.jar com.example.Main";
        assert!(matches_filter("env", line, "java"));
        assert!(matches_filter("env", line, "com.example"));
        assert!(matches_filter("java.exe", "", "JAVA"));
        assert!(!matches_filter("bash", "bash -c ls", "java"));
    }

    #[test]
    fn test_filter_by_main_class() {
        let handles = vec![
            ProcessHandle::from_command(10, &cmd(&["java", "com.example.Main"])),
            ProcessHandle::from_command(11, &cmd(&["java", "org.other.Tool"])),
        ];
        let kept = filter_by_main_class(handles.clone(), Some("example"));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, 10);
        assert_eq!(filter_by_main_class(handles, None).len(), 2);
    }

    #[test]
    fn test_select_with_pid_and_first() {
        let handles = vec![
            ProcessHandle::from_command(10, &cmd(&["java", "A"])),
            ProcessHandle::from_command(20, &cmd(&["java", "B"])),
        ];
        let chosen = select_process(handles.clone(), &PidSelector(20)).unwrap();
        assert_eq!(chosen.main_class_hint, "B");
        let chosen = select_process(handles.clone(), &FirstMatchSelector).unwrap();
        assert_eq!(chosen.id, 10);
        let err = select_process(handles, &PidSelector(99)).unwrap_err();
        assert!(matches!(err, PackError::NotFound(_)));
    }

    #[test]
    fn test_select_without_candidates() {
        let err = select_process(Vec::new(), &FirstMatchSelector).unwrap_err();
        assert!(matches!(err, PackError::NotFound(_)));
    }
}
