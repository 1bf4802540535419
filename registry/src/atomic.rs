//! Atomic file-replace persistence: write to a sibling temp file, `fsync`,
//! then rename over the live file, keeping at most one `.bak` backup of
//! the previous good content. This is the only place in the core that
//! touches durable state.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if path.exists() {
        let bak_path = backup_path(path);
        fs::copy(path, &bak_path)?;
    }

    let tmp_path = tmp_path(path);
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Read `path`, falling back to its `.bak` sibling if `path` is missing or
/// fails `parse`. Returns `None` only if both are unreadable/unparseable.
pub fn read_with_fallback<T>(path: &Path, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    if let Ok(contents) = fs::read_to_string(path) {
        if let Some(value) = parse(&contents) {
            return Some(value);
        }
    }
    let bak_path = backup_path(path);
    if let Ok(contents) = fs::read_to_string(&bak_path) {
        if let Some(value) = parse(&contents) {
            tracing::warn!(path = %path.display(), "recovered state from backup after primary read failure");
            return Some(value);
        }
    }
    None
}

fn tmp_path(path: &Path) -> std::path::PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(".tmp");
    p.into()
}

fn backup_path(path: &Path) -> std::path::PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(".bak");
    p.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_atomic_creates_file_and_one_backup_on_rewrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        write_atomic(&path, b"first").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"first");
        assert!(!backup_path(&path).exists());

        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert_eq!(fs::read(backup_path(&path)).unwrap(), b"first");
    }

    #[test]
    fn read_with_fallback_uses_backup_when_primary_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        write_atomic(&path, b"{\"ok\":true}").unwrap();
        write_atomic(&path, b"not valid json").unwrap();

        let parse = |s: &str| serde_json::from_str::<serde_json::Value>(s).ok();
        let recovered = read_with_fallback(&path, parse).unwrap();
        assert_eq!(recovered, serde_json::json!({"ok": true}));
    }

    #[test]
    fn read_with_fallback_returns_none_when_both_unreadable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let parse = |s: &str| serde_json::from_str::<serde_json::Value>(s).ok();
        assert!(read_with_fallback(&path, parse).is_none());
    }
}
