// Atomic on-disk persistence of compatibility records

use memcompat_scanner::CompatibilityRecord;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("'{0}' cannot be used as a file name")]
    InvalidName(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Writes one JSON document per motherboard at
/// `{root}/Memory/{manufacturer}/{model}.json`.
#[derive(Debug, Clone)]
pub struct RecordStore {
    root: PathBuf,
}

/// A record fully written to a private temp file next to its target, not yet
/// visible to readers. Dropping it discards the temp file.
pub struct StagedRecord {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedRecord {
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Atomically renames the temp file over the target.
    pub fn commit(self) -> Result<PathBuf> {
        let StagedRecord { temp, target } = self;
        let temp_path = temp.path().to_path_buf();
        temp.persist(&target).map_err(|e| StoreError::Io(e.error))?;
        info!("renamed {} to {}", temp_path.display(), target.display());
        Ok(target)
    }
}

fn checked_component(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\', '\0'])
    {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(name)
}

impl RecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn manufacturer_dir(&self, manufacturer: &str) -> Result<PathBuf> {
        Ok(self.root.join("Memory").join(checked_component(manufacturer)?))
    }

    pub fn path_for(&self, manufacturer: &str, model: &str) -> Result<PathBuf> {
        let file_name = format!("{}.json", checked_component(model)?);
        Ok(self.manufacturer_dir(manufacturer)?.join(file_name))
    }

    /// Serializes `record` into a temp file in the target directory, flushed
    /// and synced to disk.
    pub fn stage(&self, record: &CompatibilityRecord) -> Result<StagedRecord> {
        let target = self.path_for(&record.manufacturer, &record.motherboard_model)?;
        let dir = self.manufacturer_dir(&record.manufacturer)?;
        fs::create_dir_all(&dir)?;

        let mut temp = tempfile::Builder::new()
            .prefix("memcompat-item-")
            .suffix(".json")
            .tempfile_in(&dir)?;

        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, record)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        debug!("saved as {}", temp.path().display());

        Ok(StagedRecord { temp, target })
    }

    pub fn write(&self, record: &CompatibilityRecord) -> Result<PathBuf> {
        self.stage(record)?.commit()
    }

    pub fn read(&self, manufacturer: &str, model: &str) -> Result<CompatibilityRecord> {
        let file = File::open(self.path_for(manufacturer, model)?)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}
