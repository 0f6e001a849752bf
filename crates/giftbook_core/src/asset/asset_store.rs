//! Asset storage contract and filesystem implementation.
//!
//! # Responsibility
//! - Move captured images into the permanent asset directory.
//! - Delete committed assets when their owning idea goes away.
//!
//! # Invariants
//! - Committed assets keep the base filename of their source.
//! - An existing asset is never overwritten by a later commit.
//! - The asset root is canonical, so committed paths are absolute and stay
//!   valid when the working directory changes.
//! - `remove` only touches files whose resolved location is inside the
//!   asset directory.

use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub type AssetResult<T> = Result<T, AssetError>;

/// Asset move/delete failure.
#[derive(Debug)]
pub enum AssetError {
    /// Source path has no usable UTF-8 file name.
    InvalidSource(PathBuf),
    /// Source file does not exist or is not a regular file.
    SourceMissing(PathBuf),
    /// Target name is already taken by another asset.
    AlreadyExists(PathBuf),
    /// Removal target is not inside the asset directory.
    OutsideRoot(PathBuf),
    Io {
        op: &'static str,
        path: PathBuf,
        source: io::Error,
    },
}

impl Display for AssetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSource(path) => write!(f, "invalid asset source `{}`", path.display()),
            Self::SourceMissing(path) => {
                write!(f, "asset source `{}` does not exist", path.display())
            }
            Self::AlreadyExists(path) => write!(f, "asset `{}` already exists", path.display()),
            Self::OutsideRoot(path) => write!(
                f,
                "asset `{}` is outside the asset directory",
                path.display()
            ),
            Self::Io { op, path, source } => {
                write!(f, "asset {op} failed for `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for AssetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Storage for binary assets owned by ideas.
pub trait AssetStore {
    /// Moves `source` into permanent storage and returns the stored path.
    fn commit(&self, source: &Path) -> AssetResult<PathBuf>;
    /// Deletes a previously committed asset.
    fn remove(&self, stored: &Path) -> AssetResult<()>;
}

/// Flat asset directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    root: PathBuf,
}

impl FsAssetStore {
    /// Opens (and creates if needed) the asset directory at `root`.
    ///
    /// Relative roots are resolved against the current working directory
    /// once, here.
    pub fn new(root: impl Into<PathBuf>) -> AssetResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| AssetError::Io {
            op: "create_dir",
            path: root.clone(),
            source,
        })?;
        let root = fs::canonicalize(&root).map_err(|source| AssetError::Io {
            op: "resolve_root",
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetStore for FsAssetStore {
    fn commit(&self, source: &Path) -> AssetResult<PathBuf> {
        let file_name = source
            .file_name()
            .filter(|name| name.to_str().is_some())
            .ok_or_else(|| AssetError::InvalidSource(source.to_path_buf()))?;
        if !source.is_file() {
            return Err(AssetError::SourceMissing(source.to_path_buf()));
        }

        let target = self.root.join(file_name);
        if target.to_str().is_none() {
            return Err(AssetError::InvalidSource(source.to_path_buf()));
        }
        if target.exists() {
            return Err(AssetError::AlreadyExists(target));
        }

        move_file(source, &target)?;
        info!(
            "event=asset_commit module=asset status=ok path={}",
            target.display()
        );
        Ok(target)
    }

    fn remove(&self, stored: &Path) -> AssetResult<()> {
        // Resolve `..` and symlinks before the containment check.
        let resolved = fs::canonicalize(stored).map_err(|source| AssetError::Io {
            op: "remove",
            path: stored.to_path_buf(),
            source,
        })?;
        if !resolved.starts_with(&self.root) {
            return Err(AssetError::OutsideRoot(stored.to_path_buf()));
        }
        fs::remove_file(stored).map_err(|source| AssetError::Io {
            op: "remove",
            path: stored.to_path_buf(),
            source,
        })?;
        info!(
            "event=asset_remove module=asset status=ok path={}",
            stored.display()
        );
        Ok(())
    }
}

/// Renames `source` to `target`, falling back to copy + delete when a
/// plain rename is not possible (e.g. across filesystems).
fn move_file(source: &Path, target: &Path) -> AssetResult<()> {
    let rename_err = match fs::rename(source, target) {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };

    if let Err(copy_err) = fs::copy(source, target) {
        let _ = fs::remove_file(target);
        return Err(AssetError::Io {
            op: "move",
            path: source.to_path_buf(),
            source: if copy_err.kind() == io::ErrorKind::NotFound {
                rename_err
            } else {
                copy_err
            },
        });
    }

    if let Err(err) = fs::remove_file(source) {
        // The asset is committed; the leftover capture is only clutter.
        warn!(
            "event=asset_commit module=asset status=warn error_code=source_cleanup_failed path={} error={}",
            source.display(),
            err
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{AssetError, AssetStore, FsAssetStore};
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn commit_moves_file_and_keeps_base_name() {
        let capture = tempfile::tempdir().unwrap();
        let assets = tempfile::tempdir().unwrap();
        let source = capture.path().join("photo-1.jpg");
        fs::write(&source, b"jpeg").unwrap();

        let store = FsAssetStore::new(assets.path()).unwrap();
        let stored = store.commit(&source).unwrap();

        assert_eq!(stored, store.root().join("photo-1.jpg"));
        assert!(stored.is_absolute());
        assert!(!source.exists());
        assert_eq!(fs::read(&stored).unwrap(), b"jpeg");
    }

    #[test]
    fn commit_reports_missing_source() {
        let assets = tempfile::tempdir().unwrap();
        let store = FsAssetStore::new(assets.path()).unwrap();

        let err = store
            .commit(&assets.path().join("nope").join("ghost.jpg"))
            .unwrap_err();
        assert!(matches!(err, AssetError::SourceMissing(_)));
    }

    #[test]
    fn commit_refuses_to_overwrite_existing_asset() {
        let capture = tempfile::tempdir().unwrap();
        let assets = tempfile::tempdir().unwrap();
        let store = FsAssetStore::new(assets.path()).unwrap();
        fs::write(assets.path().join("same.jpg"), b"old").unwrap();
        let source = capture.path().join("same.jpg");
        fs::write(&source, b"new").unwrap();

        let err = store.commit(&source).unwrap_err();
        assert!(matches!(err, AssetError::AlreadyExists(_)));
        assert!(source.exists());
        assert_eq!(fs::read(assets.path().join("same.jpg")).unwrap(), b"old");
    }

    #[test]
    fn remove_deletes_committed_file_and_rejects_foreign_paths() {
        let capture = tempfile::tempdir().unwrap();
        let assets = tempfile::tempdir().unwrap();
        let store = FsAssetStore::new(assets.path()).unwrap();
        let source = capture.path().join("a.jpg");
        fs::write(&source, b"x").unwrap();
        let stored = store.commit(&source).unwrap();

        store.remove(&stored).unwrap();
        assert!(!stored.exists());

        let err = store.remove(&stored).unwrap_err();
        assert!(matches!(err, AssetError::Io { op: "remove", .. }));

        let foreign = capture.path().join("b.jpg");
        fs::write(&foreign, b"y").unwrap();
        let err = store.remove(&foreign).unwrap_err();
        assert!(matches!(err, AssetError::OutsideRoot(_)));
        assert!(foreign.exists());
    }

    #[test]
    fn remove_rejects_parent_dir_escape_from_root() {
        let base = tempfile::tempdir().unwrap();
        let store = FsAssetStore::new(base.path().join("assets")).unwrap();
        let victim = base.path().join("victim.txt");
        fs::write(&victim, b"keep me").unwrap();

        let escaping = store.root().join("..").join("victim.txt");
        let err = store.remove(&escaping).unwrap_err();

        assert!(matches!(err, AssetError::OutsideRoot(_)));
        assert!(victim.exists());
    }

    #[test]
    fn root_is_resolved_to_an_absolute_canonical_path() {
        let base = tempfile::tempdir().unwrap();
        let indirect = base.path().join("sub").join("..").join("assets");
        fs::create_dir_all(base.path().join("sub")).unwrap();

        let store = FsAssetStore::new(&indirect).unwrap();
        let expected = fs::canonicalize(base.path().join("assets")).unwrap();
        assert_eq!(store.root(), expected);

        let cwd_store = FsAssetStore::new(".").unwrap();
        assert!(cwd_store.root().is_absolute());
        assert_eq!(
            cwd_store.root(),
            fs::canonicalize(std::env::current_dir().unwrap()).unwrap()
        );
    }

    #[cfg(unix)]
    #[test]
    fn committed_path_from_relative_root_is_absolute() {
        let capture = tempfile::tempdir().unwrap();
        let base = tempfile::tempdir().unwrap();
        let cwd = fs::canonicalize(std::env::current_dir().unwrap()).unwrap();
        let target = fs::canonicalize(base.path()).unwrap();
        // `../..` up to the filesystem root, then down into the temp dir.
        let mut relative = PathBuf::new();
        for _ in cwd.components().skip(1) {
            relative.push("..");
        }
        relative.push(target.strip_prefix("/").unwrap());
        let source = capture.path().join("x.jpg");
        fs::write(&source, b"jpeg").unwrap();

        let store = FsAssetStore::new(relative.join("assets")).unwrap();
        let stored = store.commit(&source).unwrap();

        assert!(stored.is_absolute());
        assert_eq!(stored, target.join("assets").join("x.jpg"));
        assert!(stored.is_file());
    }
}
