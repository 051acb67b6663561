//! Core module - Process discovery, diagnostics, path remapping, mirroring and launcher generation

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod launcher;
pub mod locator;
pub mod mirror;
pub mod pipeline;
pub mod remap;
pub mod runner;
pub mod runtime_image;

pub use config::PackConfig;
pub use diagnostics::DiagnosticRecord;
pub use error::PackError;
pub use launcher::{EntryPoint, LaunchCommand, LauncherGenerator};
pub use locator::{
    ConsoleSelector, FirstMatchSelector, PidSelector, ProcessHandle, ProcessLocator,
    ProcessSelector,
};
pub use mirror::{DependencyMirror, MirrorReport};
pub use pipeline::{PackageSummary, Pipeline};
pub use remap::{PathMapping, RelPath};
pub use runner::{CommandOutput, Runner, SystemRunner};
pub use runtime_image::RuntimeImageBuilder;

/// Result type used throughout the packaging pipeline
pub type Result<T> = std::result::Result<T, PackError>;
