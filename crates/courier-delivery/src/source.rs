// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Where a distribution run gets its recipient batches from.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use courier_core::persist;
use courier_core::{CourierError, RecipientBatch};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Supplies the ordered recipient batches for one run.
///
/// A load failure aborts the run before any send.
#[async_trait]
pub trait BatchSource: Send + Sync {
    async fn load(&self) -> Result<Vec<RecipientBatch>, CourierError>;
}

#[async_trait]
impl BatchSource for Vec<RecipientBatch> {
    async fn load(&self) -> Result<Vec<RecipientBatch>, CourierError> {
        Ok(self.clone())
    }
}

/// On-disk manifest document.
///
/// ```json
/// { "batches": [ { "recipient": { "id": "adv-1", "name": "Asha", "contact": "9198..." },
///                  "messages": [ { "type": "text", "body": "Good morning" } ] } ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub batches: Vec<RecipientBatch>,
}

/// Reads a [`Manifest`] from a JSON file at load time.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    path: PathBuf,
}

impl ManifestSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl BatchSource for ManifestSource {
    async fn load(&self) -> Result<Vec<RecipientBatch>, CourierError> {
        let manifest: Manifest = persist::read_json(&self.path).await.map_err(|e| match e {
            CourierError::NotFound(_) => {
                CourierError::NotFound(format!("manifest {}", self.path.display()))
            }
            other => other,
        })?;
        info!(
            path = %self.path.display(),
            batches = manifest.batches.len(),
            "manifest loaded"
        );
        Ok(manifest.batches)
    }
}
