// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Whole-file JSON documents on disk.
//!
//! Every write lands in a sibling temp file first and is renamed into place,
//! so readers never observe a half-written document.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::CourierError;

/// Reads `path` as JSON, returning `T::default()` when the file does not exist.
pub async fn read_json_or_default<T>(path: &Path) -> Result<T, CourierError>
where
    T: DeserializeOwned + Default,
{
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(T::default()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

/// Reads `path` as JSON; a missing file is [`CourierError::NotFound`].
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CourierError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(CourierError::NotFound(path.display().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Serializes `value` as pretty JSON and atomically replaces `path`.
///
/// Parent directories are created as needed.
pub async fn write_json_atomic<T>(path: &Path, value: &T) -> Result<(), CourierError>
where
    T: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes).await
}

/// Atomically replaces `path` with `bytes`.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CourierError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CourierError::Internal(format!("not a file path: {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
