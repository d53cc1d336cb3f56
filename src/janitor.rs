//! Removes transient cache artifacts after a run.
//!
//! Targets: cached Overpass responses in `<root>/.cache/` (the directory
//! itself goes only once empty) and loose `*.cache` files directly in
//! `<root>`. Anything else under `.cache/` is left alone, so running from
//! `$HOME` never touches other applications' caches. Missing targets are
//! not an error.

use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::render::{CACHE_DIR_NAME, OVERPASS_CACHE_PREFIX};

const CACHE_SUFFIX: &str = "cache";

/// What a sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub files_removed: usize,
    pub dirs_removed: usize,
}

pub struct CacheJanitor {
    root: PathBuf,
}

impl CacheJanitor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(CACHE_DIR_NAME)
    }

    /// Delete all cache artifacts. Idempotent.
    pub fn sweep(&self) -> Result<CleanupReport, JanitorError> {
        let mut report = CleanupReport::default();

        let cache_dir = self.cache_dir();
        match fs::read_dir(&cache_dir) {
            Ok(entries) => {
                for entry in entries {
                    let entry = entry.map_err(|e| JanitorError::new(&cache_dir, e))?;
                    let path = entry.path();
                    let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
                    if is_file && is_render_artifact(&path) {
                        remove_file(&path, &mut report)?;
                    }
                }
                if is_empty_dir(&cache_dir).map_err(|e| JanitorError::new(&cache_dir, e))? {
                    fs::remove_dir(&cache_dir).map_err(|e| JanitorError::new(&cache_dir, e))?;
                    report.dirs_removed += 1;
                } else {
                    log::debug!("Leaving {} in place: it holds other files", cache_dir.display());
                }
            }
            // missing, or not a directory
            Err(e) if e.kind() == io::ErrorKind::NotFound || cache_dir.is_file() => {}
            Err(e) => return Err(JanitorError::new(&cache_dir, e)),
        }

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(report),
            Err(e) => return Err(JanitorError::new(&self.root, e)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| JanitorError::new(&self.root, e))?;
            let path = entry.path();
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if is_file && has_cache_suffix(&path) {
                remove_file(&path, &mut report)?;
            }
        }

        if report.files_removed > 0 || report.dirs_removed > 0 {
            log::info!(
                "Removed {} cache file(s) and {} cache dir(s) under {}",
                report.files_removed,
                report.dirs_removed,
                self.root.display()
            );
        }
        Ok(report)
    }
}

fn has_cache_suffix(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(CACHE_SUFFIX)
}

/// Overpass responses cached by the renderer: `overpass-*.json`.
fn is_render_artifact(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(OVERPASS_CACHE_PREFIX) && n.ends_with(".json"))
}

fn is_empty_dir(dir: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(dir)?.next().is_none())
}

fn remove_file(path: &Path, report: &mut CleanupReport) -> Result<(), JanitorError> {
    match fs::remove_file(path) {
        Ok(()) => report.files_removed += 1,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(JanitorError::new(path, e)),
    }
    Ok(())
}

/// A filesystem failure while deleting cache artifacts.
#[derive(Debug)]
pub struct JanitorError {
    pub path: PathBuf,
    pub source: io::Error,
}

impl JanitorError {
    fn new(path: &Path, source: io::Error) -> Self {
        Self { path: path.to_path_buf(), source }
    }
}

impl fmt::Display for JanitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not clean {}: {}", self.path.display(), self.source)
    }
}

impl std::error::Error for JanitorError {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn populate(root: &Path) {
        let cache = root.join(".cache");
        fs::create_dir_all(&cache).unwrap();
        fs::write(cache.join("overpass-1.json"), "{}").unwrap();
        fs::write(cache.join("overpass-2.json"), "{}").unwrap();
        fs::write(root.join("tiles.cache"), "x").unwrap();
        fs::write(root.join("map.png"), "keep").unwrap();
        fs::write(root.join("notes.cache.txt"), "keep").unwrap();
    }

    #[test]
    fn test_sweep_removes_cache_artifacts() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());

        let report = CacheJanitor::new(dir.path()).sweep().unwrap();
        assert_eq!(report, CleanupReport { files_removed: 3, dirs_removed: 1 });
        assert!(!dir.path().join(".cache").exists());
        assert!(!dir.path().join("tiles.cache").exists());
        assert!(dir.path().join("map.png").exists());
        assert!(dir.path().join("notes.cache.txt").exists());
    }

    #[test]
    fn test_sweep_twice_is_noop() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());
        let janitor = CacheJanitor::new(dir.path());

        janitor.sweep().unwrap();
        let second = janitor.sweep().unwrap();
        assert_eq!(second, CleanupReport::default());
    }

    #[test]
    fn test_sweep_missing_root() {
        let dir = TempDir::new().unwrap();
        let janitor = CacheJanitor::new(dir.path().join("does-not-exist"));
        assert_eq!(janitor.sweep().unwrap(), CleanupReport::default());
    }

    #[test]
    fn test_sweep_in_home_keeps_other_caches() {
        // In $HOME, `.cache` is the XDG cache shared with every application.
        let home = TempDir::new().unwrap();
        let xdg = home.path().join(".cache");
        fs::create_dir_all(xdg.join("streetmap")).unwrap();
        fs::create_dir_all(xdg.join("mozilla")).unwrap();
        fs::write(xdg.join("streetmap").join("geocode.json"), "{}").unwrap();
        fs::write(xdg.join("mozilla").join("profile.db"), "x").unwrap();
        fs::write(xdg.join("fontconfig.json"), "x").unwrap();
        fs::write(xdg.join("overpass-0123456789abcdef.json"), "{}").unwrap();

        let report = CacheJanitor::new(home.path()).sweep().unwrap();
        assert_eq!(report, CleanupReport { files_removed: 1, dirs_removed: 0 });
        assert!(!xdg.join("overpass-0123456789abcdef.json").exists());
        assert!(xdg.join("streetmap").join("geocode.json").exists());
        assert!(xdg.join("mozilla").join("profile.db").exists());
        assert!(xdg.join("fontconfig.json").exists());
    }

    #[test]
    fn test_sweep_ignores_cache_named_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("keep.cache")).unwrap();
        let report = CacheJanitor::new(dir.path()).sweep().unwrap();
        assert_eq!(report.files_removed, 0);
        assert!(dir.path().join("keep.cache").exists());
    }
}
