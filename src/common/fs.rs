use std::{fs::File, io::Write, path::Path};

use anyhow::{Context, Result, bail};
use tempfile::NamedTempFile;

/// Write `bytes` to `target` via a temp file and atomic rename, so a crash
/// mid-write never leaves a truncated output. Refuses to overwrite an
/// existing file unless `force`.
pub fn write_atomic(target: &Path, bytes: &[u8], force: bool) -> Result<()> {
    let parent = target.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = parent {
        std::fs::create_dir_all(dir).with_context(|| format!("create dir {}", dir.display()))?;
    }
    if !force && target.exists() {
        bail!(
            "Refusing to overwrite existing file: {} (use --force)",
            target.display()
        );
    }

    let mut tmp =
        NamedTempFile::new_in(parent.unwrap_or(Path::new("."))).context("create temp file")?;
    tmp.write_all(bytes).context("write temp file")?;
    tmp.as_file().sync_all().ok(); // best-effort fsync
    tmp.persist(target)
        .with_context(|| format!("rename to {}", target.display()))?;
    if let Some(dir) = parent {
        let _ = File::open(dir).and_then(|f| f.sync_all());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");

        write_atomic(&path, b"{}", false).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");

        assert!(write_atomic(&path, b"[]", false).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");

        write_atomic(&path, b"[]", true).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"[]");
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deep/out.json");
        write_atomic(&path, b"ok", false).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"ok");
    }
}
