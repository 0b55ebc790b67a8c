//! Atomic JSON snapshots
//!
//! A snapshot is written to a temporary file beside the target, flushed and
//! synced, then renamed over the target. Readers see either the previous file or
//! the new one, never a partial write.

use crate::{HarvestError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Reads a JSON document, returning `T::default()` when the file does not exist
pub fn load_json<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_slice(&content).map_err(|source| HarvestError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Atomically replaces `path` with the pretty-printed JSON form of `value`
pub fn save_json<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    save_json_with_hook(path, value, |_| Ok(()))
}

/// Like [`save_json`], running `pre_rename_hook` after the temporary file is
/// complete and before it replaces the target
///
/// A hook error aborts the write: the temporary file is removed and the target
/// is left exactly as it was.
pub fn save_json_with_hook<T, F>(path: &Path, value: &T, pre_rename_hook: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(&Path) -> io::Result<()>,
{
    let persist_err = |source: io::Error| HarvestError::Persist {
        path: path.to_path_buf(),
        source,
    };

    let body = serde_json::to_vec_pretty(value).map_err(|source| HarvestError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(persist_err)?;

    let mut temp = NamedTempFile::new_in(dir).map_err(persist_err)?;
    temp.write_all(&body).map_err(persist_err)?;
    temp.flush().map_err(persist_err)?;
    temp.as_file_mut().sync_all().map_err(persist_err)?;

    let temp_path = temp.into_temp_path();
    pre_rename_hook(temp_path.as_ref()).map_err(persist_err)?;
    temp_path.persist(path).map_err(|e| persist_err(e.error))?;

    Ok(())
}
