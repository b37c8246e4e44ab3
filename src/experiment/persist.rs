//! All-or-nothing JSON file persistence.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Error, Result};

/// Serialize `value` and replace `path` with it.
///
/// The bytes go to a hidden temp file in the destination directory, which is
/// synced and then renamed over `path`. Readers see either the old file, the
/// new file, or no file; never a partial one.
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value).map_err(|e| Error::json(path, e))?;

    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        fs::create_dir_all(parent).map_err(|e| Error::file(parent, e))?;
    }

    let base = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::file(path, std::io::Error::other("path has no file name")))?;
    let tmp_name = format!(".{base}.tmp-{}", std::process::id());
    let tmp_path = parent.map_or_else(|| Path::new(&tmp_name).to_path_buf(), |p| p.join(&tmp_name));

    let written = File::create(&tmp_path).and_then(|mut file| {
        file.write_all(&bytes)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::file(&tmp_path, e));
    }

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::file(path, e));
    }
    Ok(())
}

/// Read and decode a JSON file.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| Error::file(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| Error::json(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_creates_parent_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gemm").join("gemm_pso_0.json");

        write_json_atomic(&path, &vec![1, 2, 3]).unwrap();

        let back: Vec<i32> = read_json(&path).unwrap();
        assert_eq!(back, vec![1, 2, 3]);

        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_write_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");

        write_json_atomic(&path, "old").unwrap();
        write_json_atomic(&path, "new").unwrap();

        let back: String = read_json(&path).unwrap();
        assert_eq!(back, "new");
    }

    #[test]
    fn test_read_missing_is_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_json::<Vec<i32>>(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::File { .. }));
    }
}
