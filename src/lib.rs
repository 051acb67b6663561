//! livepack - Package a running Java process into a relocatable directory
//!
//! Reads the classpath and arguments of a live JVM through `jcmd`, mirrors every
//! classpath entry into a self-contained directory, and writes a launcher that
//! reproduces the original invocation on another machine.

pub mod core;
pub mod platform;

/// Application name constant
pub const APP_NAME: &str = "livepack";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
