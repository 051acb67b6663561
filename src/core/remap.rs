//! Path remapping - placing absolute source paths inside a relocatable package
//!
//! An absolute path is split into a volume and a remainder. The volume becomes
//! a lowercase token (`c` for `C:\`, `unc` for `\\server\share`, `root` for a
//! Unix `/`), and the destination is `<dependency dir>/<token>/<remainder>`.
//! Distinct (volume, remainder) pairs therefore never share a destination,
//! and no absolute prefix survives into the package.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::config::PackConfig;
use super::error::PackError;
use super::Result;
use crate::platform::TargetPlatform;

/// Token for Windows UNC shares; server and share follow as components
const UNC_TOKEN: &str = "unc";
/// Token for the single Unix root volume
const ROOT_TOKEN: &str = "root";

/// A path relative to the package root, stored as components
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelPath(Vec<String>);

impl RelPath {
    pub fn new(components: Vec<String>) -> Self {
        Self(components)
    }

    pub fn components(&self) -> &[String] {
        &self.0
    }

    /// Render with the target platform's separator
    pub fn render(&self, platform: TargetPlatform) -> String {
        platform.join(&self.0)
    }

    /// Resolve under a package root on the host filesystem
    pub fn to_host(&self, root: &Path) -> PathBuf {
        self.0.iter().fold(root.to_path_buf(), |acc, c| acc.join(c))
    }

    /// Comparison key honoring the platform's case sensitivity
    fn key(&self, platform: TargetPlatform) -> String {
        fold_case(self.0.join("/"), platform)
    }
}

/// An absolute path split into volume token and remainder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumePath {
    pub volume: String,
    pub remainder: Vec<String>,
}

impl VolumePath {
    /// Split an absolute path written for `platform`
    pub fn parse(path: &str, platform: TargetPlatform) -> Result<Self> {
        let (volume, rest) = match platform {
            TargetPlatform::Windows => split_windows(path)?,
            TargetPlatform::Unix => split_unix(path)?,
        };

        let mut remainder = Vec::new();
        for component in rest.split(|c| platform.is_separator(c)) {
            match component {
                "" | "." => {}
                ".." => {
                    return Err(PackError::InvalidPath {
                        path: path.to_string(),
                        reason: "parent directory components are not allowed",
                    })
                }
                c => remainder.push(c.to_string()),
            }
        }
        if volume == UNC_TOKEN && remainder.len() < 2 {
            return Err(PackError::InvalidPath {
                path: path.to_string(),
                reason: "UNC path needs a server and a share",
            });
        }

        Ok(Self { volume, remainder })
    }

    /// Identity of the source: equal keys name the same file
    pub fn key(&self, platform: TargetPlatform) -> String {
        let mut key = self.volume.clone();
        for c in &self.remainder {
            key.push('/');
            key.push_str(c);
        }
        fold_case(key, platform)
    }
}

fn split_windows(path: &str) -> Result<(String, &str)> {
    let is_sep = |c: char| c == '\\' || c == '/';
    let mut path_str = path;

    // Verbatim prefix: \\?\C:\... or \\?\UNC\server\share\...
    if path_str.get(..4).is_some_and(|p| p.replace('/', "\\") == r"\\?\") {
        path_str = &path_str[4..];
        let unc = path_str.get(..4).is_some_and(|p| {
            p.is_char_boundary(3) && p[..3].eq_ignore_ascii_case("UNC") && p.ends_with(is_sep)
        });
        if unc {
            return Ok((UNC_TOKEN.to_string(), &path_str[4..]));
        }
    }

    let mut chars = path_str.chars();
    match (chars.next(), chars.next()) {
        (Some(a), Some(b)) if is_sep(a) && is_sep(b) => {
            Ok((UNC_TOKEN.to_string(), &path_str[2..]))
        }
        (Some(drive), Some(':')) if drive.is_ascii_alphabetic() => {
            let rest = &path_str[2..];
            if !rest.is_empty() && !rest.starts_with(is_sep) {
                return Err(PackError::InvalidPath {
                    path: path.to_string(),
                    reason: "drive-relative paths are not allowed",
                });
            }
            Ok((drive.to_ascii_lowercase().to_string(), rest))
        }
        (Some(a), _) if is_sep(a) => Err(PackError::InvalidPath {
            path: path.to_string(),
            reason: "path has no drive letter",
        }),
        _ => Err(PackError::InvalidPath {
            path: path.to_string(),
            reason: "path is not absolute",
        }),
    }
}

fn split_unix(path: &str) -> Result<(String, &str)> {
    if path.starts_with('/') {
        Ok((ROOT_TOKEN.to_string(), path))
    } else {
        Err(PackError::InvalidPath {
            path: path.to_string(),
            reason: "path is not absolute",
        })
    }
}

fn fold_case(s: String, platform: TargetPlatform) -> String {
    if platform.case_insensitive() {
        s.to_lowercase()
    } else {
        s
    }
}

/// Whether `path` has neither a root, a drive nor a UNC prefix
pub fn is_relative(path: &str, platform: TargetPlatform) -> bool {
    match platform {
        TargetPlatform::Windows => {
            let mut chars = path.chars();
            match (chars.next(), chars.next()) {
                (Some(a), _) if platform.is_separator(a) => false,
                (Some(drive), Some(':')) if drive.is_ascii_alphabetic() => false,
                _ => true,
            }
        }
        TargetPlatform::Unix => !path.starts_with('/'),
    }
}

/// Make a classpath entry absolute against the directory it was given in.
///
/// Absolute entries come back unchanged. A relative entry is joined onto
/// `base` with `.` and `..` folded lexically; `None` if there is no base.
pub fn resolve_entry(entry: &str, base: Option<&str>, platform: TargetPlatform) -> Option<String> {
    if !is_relative(entry, platform) {
        return Some(entry.to_string());
    }
    let base = base?;

    let unc = platform == TargetPlatform::Windows
        && base.len() >= 2
        && base.chars().take(2).all(|c| platform.is_separator(c));
    let (prefix, rest) = if unc { (r"\\", &base[2..]) } else { ("", base) };

    let mut parts: Vec<&str> = rest
        .split(|c| platform.is_separator(c))
        .enumerate()
        .filter(|(i, part)| *i == 0 || !part.is_empty())
        .map(|(_, part)| part)
        .collect();
    for component in entry.split(|c| platform.is_separator(c)) {
        match component {
            "" | "." => {}
            ".." => {
                let at_volume = parts.len() <= 1 || parts.last().is_some_and(|p| p.ends_with(':'));
                if !at_volume {
                    parts.pop();
                }
            }
            c => parts.push(c),
        }
    }
    let sep = platform.path_separator().to_string();
    Some(format!("{}{}", prefix, parts.join(&sep)))
}

/// Map an absolute path to `<volume token>/<remainder>`.
///
/// Pure: the result depends only on the input string and platform.
pub fn remap(path: &str, platform: TargetPlatform) -> Result<RelPath> {
    let split = VolumePath::parse(path, platform)?;
    let mut components = Vec::with_capacity(split.remainder.len() + 1);
    components.push(split.volume);
    components.extend(split.remainder);
    Ok(RelPath(components))
}

/// What a mapped entry is mirrored for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A classpath entry, volume-remapped under the dependency directory
    Classpath,
    /// An auxiliary file or directory, placed directly under the package root
    Auxiliary,
}

/// One source and its place in the package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedEntry {
    pub source: String,
    pub destination: RelPath,
    pub kind: EntryKind,
}

/// Source to destination table, computed once per run
#[derive(Debug, Clone)]
pub struct PathMapping {
    platform: TargetPlatform,
    entries: Vec<MappedEntry>,
    /// Source identity key -> index into `entries`
    by_source: HashMap<String, usize>,
}

impl PathMapping {
    /// Map every classpath entry and auxiliary path, rejecting collisions.
    ///
    /// Repeated classpath entries are mapped once.
    pub fn build(
        classpath: &[String],
        auxiliary: &[PathBuf],
        config: &PackConfig,
    ) -> Result<Self> {
        let platform = config.target;
        let mut mapping = Self {
            platform,
            entries: Vec::new(),
            by_source: HashMap::new(),
        };
        let mut by_destination: HashMap<String, String> = HashMap::new();

        let reserved = [
            config.dependency_dir_name.as_str(),
            config.runtime_image_dir_name.as_str(),
            config.launcher_file_name(),
        ];
        for name in reserved {
            by_destination.insert(fold_case(name.to_string(), platform), format!("<{}>", name));
        }

        for source in classpath {
            let split = VolumePath::parse(source, platform)?;
            let key = split.key(platform);
            if mapping.by_source.contains_key(&key) {
                continue;
            }
            let mut components = vec![config.dependency_dir_name.clone(), split.volume];
            components.extend(split.remainder);
            mapping.insert(
                key,
                MappedEntry {
                    source: source.clone(),
                    destination: RelPath(components),
                    kind: EntryKind::Classpath,
                },
                &mut by_destination,
            )?;
        }

        for path in auxiliary {
            let source = path.to_string_lossy().to_string();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| PackError::InvalidPath {
                    path: source.clone(),
                    reason: "auxiliary path has no final component",
                })?;
            let key = fold_case(format!("aux:{}", source), platform);
            if mapping.by_source.contains_key(&key) {
                continue;
            }
            mapping.insert(
                key,
                MappedEntry {
                    source,
                    destination: RelPath(vec![name]),
                    kind: EntryKind::Auxiliary,
                },
                &mut by_destination,
            )?;
        }

        Ok(mapping)
    }

    fn insert(
        &mut self,
        key: String,
        entry: MappedEntry,
        by_destination: &mut HashMap<String, String>,
    ) -> Result<()> {
        let dest_key = entry.destination.key(self.platform);
        if let Some(existing) = by_destination.get(&dest_key) {
            return Err(PackError::Collision {
                destination: entry.destination.render(self.platform),
                first: existing.clone(),
                second: entry.source,
            });
        }
        by_destination.insert(dest_key, entry.source.clone());
        self.by_source.insert(key, self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    pub fn classpath_entries(&self) -> impl Iterator<Item = &MappedEntry> {
        self.entries.iter().filter(|e| e.kind == EntryKind::Classpath)
    }

    pub fn auxiliary_entries(&self) -> impl Iterator<Item = &MappedEntry> {
        self.entries.iter().filter(|e| e.kind == EntryKind::Auxiliary)
    }

    /// Destination of a classpath entry
    pub fn destination_of(&self, source: &str) -> Option<&RelPath> {
        let key = VolumePath::parse(source, self.platform).ok()?.key(self.platform);
        self.by_source.get(&key).map(|&i| &self.entries[i].destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(target: TargetPlatform) -> PackConfig {
        PackConfig {
            target,
            ..Default::default()
        }
    }

    fn rel(parts: &[&str]) -> RelPath {
        RelPath::new(parts.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_remap_drive_paths() {
        let w = TargetPlatform::Windows;
        assert_eq!(remap(r"C:\libs\a.jar", w).unwrap(), rel(&["c", "libs", "a.jar"]));
        assert_eq!(remap("D:/libs/b.jar", w).unwrap(), rel(&["d", "libs", "b.jar"]));
        assert_eq!(
            remap(r"C:\libs\a.jar", w).unwrap().render(w),
            r"c\libs\a.jar"
        );
    }

    #[test]
    fn test_remap_is_reflexive_and_case_normalized() {
        let w = TargetPlatform::Windows;
        let a = remap(r"C:\libs\a.jar", w).unwrap();
        assert_eq!(a, remap(r"C:\libs\a.jar", w).unwrap());
        assert_eq!(a, remap(r"c:\libs\a.jar", w).unwrap());
    }

    #[test]
    fn test_remap_separates_volumes() {
        let w = TargetPlatform::Windows;
        assert_ne!(
            remap(r"C:\libs\a.jar", w).unwrap(),
            remap(r"D:\libs\a.jar", w).unwrap()
        );
        assert_ne!(
            remap(r"C:\libs\a.jar", w).unwrap(),
            remap(r"C:\libs\b.jar", w).unwrap()
        );
    }

    #[test]
    fn test_remap_unc_and_verbatim() {
        let w = TargetPlatform::Windows;
        assert_eq!(
            remap(r"\\fileserver\share\lib\x.jar", w).unwrap(),
            rel(&["unc", "fileserver", "share", "lib", "x.jar"])
        );
        assert_eq!(
            remap(r"\\?\C:\libs\a.jar", w).unwrap(),
            rel(&["c", "libs", "a.jar"])
        );
        assert_eq!(
            remap(r"\\?\UNC\fileserver\share\x.jar", w).unwrap(),
            rel(&["unc", "fileserver", "share", "x.jar"])
        );
    }

    #[test]
    fn test_resolve_relative_entries() {
        let u = TargetPlatform::Unix;
        let w = TargetPlatform::Windows;
        assert_eq!(
            resolve_entry("classes", Some("/home/dev/app"), u).as_deref(),
            Some("/home/dev/app/classes")
        );
        assert_eq!(
            resolve_entry("./../lib/a.jar", Some("/home/dev/app/"), u).as_deref(),
            Some("/home/dev/lib/a.jar")
        );
        assert_eq!(
            resolve_entry("/opt/a.jar", None, u).as_deref(),
            Some("/opt/a.jar")
        );
        assert_eq!(resolve_entry("classes", None, u), None);
        assert_eq!(
            resolve_entry(r"..\..\lib\a.jar", Some(r"C:\work"), w).as_deref(),
            Some(r"C:\lib\a.jar")
        );
        assert_eq!(
            resolve_entry("bin", Some(r"\\fileserver\share\app"), w).as_deref(),
            Some(r"\\fileserver\share\app\bin")
        );
        assert_eq!(
            resolve_entry(r"C:libs\a.jar", Some(r"D:\work"), w).as_deref(),
            Some(r"C:libs\a.jar")
        );
    }

    #[test]
    fn test_remap_unix() {
        let u = TargetPlatform::Unix;
        assert_eq!(
            remap("/opt/app//lib/./a.jar", u).unwrap(),
            rel(&["root", "opt", "app", "lib", "a.jar"])
        );
        assert_eq!(remap("/opt/app/a.jar", u).unwrap().render(u), "root/opt/app/a.jar");
    }

    #[test]
    fn test_remap_rejects_unsafe_paths() {
        let w = TargetPlatform::Windows;
        for bad in ["libs\\a.jar", "C:libs\\a.jar", "\\libs\\a.jar", "C:\\libs\\..\\..\\x"] {
            assert!(
                matches!(remap(bad, w), Err(PackError::InvalidPath { .. })),
                "{} should be rejected",
                bad
            );
        }
        assert!(remap("lib/a.jar", TargetPlatform::Unix).is_err());
        assert!(remap(r"\\server", w).is_err());
    }

    #[test]
    fn test_mapping_prefixes_dependency_dir_and_dedupes() {
        let cfg = config(TargetPlatform::Windows);
        let classpath = vec![
            r"C:\libs\a.jar".to_string(),
            r"D:\libs\a.jar".to_string(),
            r"c:\LIBS\A.jar".to_string(),
        ];
        let mapping = PathMapping::build(&classpath, &[], &cfg).unwrap();
        assert_eq!(mapping.classpath_entries().count(), 2);
        assert_eq!(
            mapping.destination_of(r"C:\libs\a.jar").unwrap().render(cfg.target),
            r"dependencies\c\libs\a.jar"
        );
        assert_eq!(
            mapping.destination_of(r"c:\LIBS\A.jar"),
            mapping.destination_of(r"C:\libs\a.jar")
        );
        assert_eq!(
            mapping.destination_of(r"D:\libs\a.jar").unwrap().render(cfg.target),
            r"dependencies\d\libs\a.jar"
        );
    }

    #[test]
    fn test_mapping_auxiliary_uses_basename() {
        let cfg = config(TargetPlatform::Unix);
        let mapping = PathMapping::build(
            &["/opt/app/a.jar".to_string()],
            &[PathBuf::from("/srv/conf/tcs-config")],
            &cfg,
        )
        .unwrap();
        let aux: Vec<_> = mapping.auxiliary_entries().collect();
        assert_eq!(aux.len(), 1);
        assert_eq!(aux[0].destination, rel(&["tcs-config"]));
    }

    #[test]
    fn test_mapping_auxiliary_collisions() {
        let cfg = config(TargetPlatform::Unix);
        let cp = vec!["/opt/app/a.jar".to_string()];

        let err = PathMapping::build(
            &cp,
            &[PathBuf::from("/a/conf"), PathBuf::from("/b/conf")],
            &cfg,
        )
        .unwrap_err();
        assert!(matches!(err, PackError::Collision { .. }));

        for reserved in ["dependencies", "custom-jre", "start_program.sh"] {
            let err = PathMapping::build(&cp, &[PathBuf::from("/x").join(reserved)], &cfg)
                .unwrap_err();
            assert!(
                matches!(err, PackError::Collision { .. }),
                "{} should collide",
                reserved
            );
        }
    }

    #[test]
    fn test_mapping_auxiliary_collision_is_case_insensitive_on_windows() {
        let cfg = config(TargetPlatform::Windows);
        let err = PathMapping::build(
            &[r"C:\a.jar".to_string()],
            &[PathBuf::from("Dependencies")],
            &cfg,
        )
        .unwrap_err();
        assert!(matches!(err, PackError::Collision { .. }));
    }

    #[test]
    fn test_mapping_invalid_entry_aborts() {
        let cfg = config(TargetPlatform::Unix);
        let err = PathMapping::build(&["relative.jar".to_string()], &[], &cfg).unwrap_err();
        assert!(matches!(err, PackError::InvalidPath { .. }));
    }
}
