//! # Store
//!
//! Durable copy of the ledger. One JSON file, replaced whole on every accepted vote.
//!
//! ## Writes
//! - Serialize the full ledger to `<path>.tmp`
//! - Flush and fsync the temp file
//! - Rename over the canonical path, readers see either the old or the new document
//!
//! ## Loads
//! - Missing file: seed a fresh ledger and write it immediately
//! - Not JSON, or not a JSON object: log, seed, overwrite
//! - Otherwise keep every usable field and vote, see [`Ledger::from_document`]
//! - Any other IO failure (permissions, etc.) is returned to the caller
//!
//! Single writer process is assumed, there is no cross-process locking.
use std::{
    ffi::OsString,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use serde_json::Value;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::models::Ledger;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO failure: {0}")]
    Io(#[from] io::Error),

    #[error("Encoding failure: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    temp_path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let mut temp_name = OsString::from(path.as_os_str());
        temp_name.push(".tmp");

        Self {
            path,
            temp_path: PathBuf::from(temp_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Ledger, StoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No ledger at {}, seeding a new one", self.path.display());

                return self.reseed().await;
            }
            Err(e) => return Err(e.into()),
        };

        let ledger = match serde_json::from_slice::<Value>(&bytes) {
            Ok(document) => Ledger::from_document(document),
            Err(e) => {
                warn!("Failed to parse ledger at {}: {e}", self.path.display());
                None
            }
        };

        let Some(ledger) = ledger else {
            warn!("Ledger at {} is unusable, recreating", self.path.display());

            return self.reseed().await;
        };

        info!(
            "Loaded ledger from {}: {} options, {} votes",
            self.path.display(),
            ledger.options.len(),
            ledger.votes.len()
        );

        Ok(ledger)
    }

    pub async fn save(&self, ledger: &Ledger) -> Result<(), StoreError> {
        let payload = serde_json::to_vec_pretty(ledger)?;

        let mut file = fs::File::create(&self.temp_path).await?;
        file.write_all(&payload).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&self.temp_path, &self.path).await?;

        debug!("Persisted ledger ({} bytes)", payload.len());
        Ok(())
    }

    async fn reseed(&self) -> Result<Ledger, StoreError> {
        let ledger = Ledger::seeded();
        self.save(&ledger).await?;

        Ok(ledger)
    }
}
