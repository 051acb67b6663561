//! Launcher generation - the script that replays the original invocation

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use super::config::PackConfig;
use super::diagnostics::DiagnosticRecord;
use super::error::PackError;
use super::remap::PathMapping;
use super::Result;
use crate::platform::TargetPlatform;

/// Filename fragments of agents injected by IDEs
pub const IDE_AGENT_FRAGMENTS: &[&str] = &["idea_rt.jar", "eclipse", "debugger-agent.jar"];

const JAVAAGENT_PREFIX: &str = "-javaagent:";

/// Whether `token` loads an IDE-injected instrumentation agent
pub fn is_ide_agent(token: &str) -> bool {
    let Some(agent) = token.strip_prefix(JAVAAGENT_PREFIX) else {
        return false;
    };
    let agent = agent.to_lowercase();
    IDE_AGENT_FRAGMENTS.iter().any(|f| agent.contains(f))
}

/// Drop IDE agents, keeping every other token in order
pub fn filter_jvm_args(args: &[String]) -> Vec<String> {
    args.iter()
        .filter(|arg| {
            let drop = is_ide_agent(arg);
            if drop {
                debug!("Dropping IDE agent argument: {}", arg);
            }
            !drop
        })
        .cloned()
        .collect()
}

/// What the launcher hands to `java` after the JVM arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPoint {
    /// `-cp <classpath> <main class>`
    MainClass(String),
    /// `-jar <jar>`, the jar given relative to the package root
    Jar(String),
}

impl EntryPoint {
    /// Name shown by the launcher's start message
    pub fn label(&self) -> &str {
        match self {
            Self::MainClass(class) => class.as_str(),
            Self::Jar(jar) => jar.as_str(),
        }
    }
}

/// The java invocation written into the launcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub runtime_executable: String,
    pub jvm_args: Vec<String>,
    /// Remapped classpath joined with the target's list separator
    pub classpath: String,
    pub entry: EntryPoint,
    pub program_args: Vec<String>,
}

impl LaunchCommand {
    /// Assemble the invocation from recovered diagnostics.
    ///
    /// Empty JVM or program arguments fall back to the configured defaults.
    /// Classpath entries keep their original order, duplicates included.
    /// A main entry that is itself a classpath entry was started with `-jar`
    /// and is launched the same way from its packaged copy.
    pub fn build(
        record: &DiagnosticRecord,
        mapping: &PathMapping,
        main_class: &str,
        config: &PackConfig,
    ) -> Result<Self> {
        let platform = config.target;

        let jvm_args = if record.jvm_args.is_empty() {
            info!("No JVM arguments found, using defaults");
            &config.default_jvm_args
        } else {
            &record.jvm_args
        };
        let program_args = if record.program_args.is_empty() {
            config.default_program_args.clone()
        } else {
            record.program_args.clone()
        };

        let classpath = record
            .classpath_entries
            .iter()
            .map(|entry| {
                mapping
                    .destination_of(entry)
                    .map(|dest| dest.render(platform))
                    .ok_or_else(|| {
                        PackError::NotFound(format!("no package path for classpath entry {}", entry))
                    })
            })
            .collect::<Result<Vec<_>>>()?
            .join(&platform.path_list_separator().to_string());

        let entry = match mapping.destination_of(main_class) {
            Some(jar) => {
                debug!("Main entry {} is a packaged jar", main_class);
                EntryPoint::Jar(jar.render(platform))
            }
            None => EntryPoint::MainClass(main_class.to_string()),
        };

        Ok(Self {
            runtime_executable: config.runtime_executable(),
            jvm_args: filter_jvm_args(jvm_args),
            classpath,
            entry,
            program_args,
        })
    }

    /// The single invocation line, quoted for `platform`'s shell
    pub fn command_line(&self, platform: TargetPlatform) -> String {
        let mut parts = vec![quote_arg(&self.runtime_executable, platform)];
        parts.extend(self.jvm_args.iter().map(|arg| quote_arg(arg, platform)));
        match &self.entry {
            EntryPoint::MainClass(class) => {
                parts.push("-cp".to_string());
                parts.push(quote_text(&self.classpath, platform));
                parts.push(quote_arg(class, platform));
            }
            EntryPoint::Jar(jar) => {
                parts.push("-jar".to_string());
                parts.push(quote_text(jar, platform));
            }
        }
        parts.extend(self.program_args.iter().map(|arg| quote_arg(arg, platform)));
        parts.join(" ")
    }
}

/// Characters `sh` passes through literally outside quotes
fn is_sh_plain(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c)
}

/// Characters `cmd` treats specially outside quotes
const CMD_SPECIAL: &[char] = &[' ', '\t', '&', '|', '<', '>', '^', '(', ')'];

fn sh_single_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Quote one argument token so the shell passes it through unchanged
fn quote_arg(token: &str, platform: TargetPlatform) -> String {
    match platform {
        TargetPlatform::Unix => {
            if !token.is_empty() && token.chars().all(is_sh_plain) {
                token.to_string()
            } else {
                sh_single_quote(token)
            }
        }
        TargetPlatform::Windows => {
            let escaped = token.replace('%', "%%");
            if escaped.is_empty() || escaped.contains(CMD_SPECIAL) {
                format!("\"{}\"", escaped)
            } else {
                escaped
            }
        }
    }
}

/// Quote free text as one word, double quotes when the shell leaves it alone
fn quote_text(text: &str, platform: TargetPlatform) -> String {
    match platform {
        TargetPlatform::Unix if text.contains(['$', '`', '"', '\\']) => sh_single_quote(text),
        TargetPlatform::Unix => format!("\"{}\"", text),
        TargetPlatform::Windows => format!("\"{}\"", text.replace('%', "%%")),
    }
}

fn cmd_echo_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '%' => out.push_str("%%"),
            '&' | '|' | '<' | '>' | '^' => {
                out.push('^');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Render the full launcher script for `platform`
pub fn render_script(command: &LaunchCommand, platform: TargetPlatform) -> String {
    let banner = format!("Starting {}...", command.entry.label());
    match platform {
        TargetPlatform::Windows => format!(
            "@echo off\r\necho {}\r\n{}\r\n",
            cmd_echo_escape(&banner),
            command.command_line(platform)
        ),
        TargetPlatform::Unix => format!(
            "#!/bin/sh\ncd \"$(dirname \"$0\")\"\necho {}\n{}\n",
            quote_text(&banner, platform),
            command.command_line(platform)
        ),
    }
}

/// Writes the launcher script into the package root
pub struct LauncherGenerator<'a> {
    config: &'a PackConfig,
}

impl<'a> LauncherGenerator<'a> {
    pub fn new(config: &'a PackConfig) -> Self {
        Self { config }
    }

    /// Build and write the launcher, replacing any previous one
    pub fn generate(
        &self,
        record: &DiagnosticRecord,
        mapping: &PathMapping,
        main_class: &str,
    ) -> Result<PathBuf> {
        let command = LaunchCommand::build(record, mapping, main_class, self.config)?;
        let script = render_script(&command, self.config.target);
        let path = self.config.launcher_path();
        fs::write(&path, script)?;
        info!("Launcher created: {}", path.display());
        Ok(path)
    }
}
