// Compressed distance-matrix snapshots
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ncdx_core::{ComputeStats, DistanceMatrix};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const SNAPSHOT_EXTENSION: &str = "snapshot";

/// Snapshot description for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDescription {
    pub name: String,
    pub creation_time: Option<String>,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// Matrix snapshot payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixSnapshot {
    pub name: String,
    pub compressor: String,
    pub matrix: DistanceMatrix,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ComputeStats>,
    pub created_at: u64,
}

impl MatrixSnapshot {
    pub fn new(name: impl Into<String>, compressor: impl Into<String>, matrix: DistanceMatrix) -> Self {
        Self {
            name: name.into(),
            compressor: compressor.into(),
            matrix,
            stats: None,
            created_at: Utc::now().timestamp().max(0) as u64,
        }
    }

    #[must_use]
    pub fn with_stats(mut self, stats: ComputeStats) -> Self {
        self.stats = Some(stats);
        self
    }
}

pub struct SnapshotManager {
    snapshot_dir: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_dir: P) -> Result<Self> {
        let snapshot_dir = snapshot_dir.as_ref().to_path_buf();
        fs::create_dir_all(&snapshot_dir)?;
        Ok(Self { snapshot_dir })
    }

    /// Generate snapshot filename with timestamp
    fn generate_snapshot_name(name: &str) -> String {
        let now: DateTime<Utc> = Utc::now();
        format!(
            "{}-{}.{}",
            name,
            now.format("%Y-%m-%d-%H-%M-%S"),
            SNAPSHOT_EXTENSION
        )
    }

    /// Write a gzip-compressed JSON snapshot
    pub fn create(&self, snapshot: &MatrixSnapshot) -> Result<SnapshotDescription> {
        let snapshot_name = Self::generate_snapshot_name(&snapshot.name);
        let snapshot_path = self.snapshot_dir.join(&snapshot_name);

        let json_data = serde_json::to_vec(snapshot)?;
        let file = File::create(&snapshot_path)?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        encoder.write_all(&json_data)?;
        encoder.finish()?.flush()?;

        Self::describe(&snapshot_path, snapshot_name)
    }

    /// List snapshots, newest name first
    pub fn list(&self) -> Result<Vec<SnapshotDescription>> {
        let mut snapshots = Vec::new();
        for entry in fs::read_dir(&self.snapshot_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some(SNAPSHOT_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                snapshots.push(Self::describe(&path, name.to_string())?);
            }
        }

        snapshots.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(snapshots)
    }

    /// Load a snapshot by file name
    pub fn load(&self, snapshot_name: &str) -> Result<MatrixSnapshot> {
        let path = self
            .snapshot_path(snapshot_name)
            .ok_or_else(|| anyhow!("Snapshot '{}' not found", snapshot_name))?;
        Self::load_from_path(&path)
    }

    /// Load a snapshot from any path
    pub fn load_from_path(path: &Path) -> Result<MatrixSnapshot> {
        let file = File::open(path)?;
        let mut decoder = GzDecoder::new(BufReader::new(file));
        let mut json_data = Vec::new();
        decoder.read_to_end(&mut json_data)?;

        Ok(serde_json::from_slice(&json_data)?)
    }

    pub fn delete(&self, snapshot_name: &str) -> Result<bool> {
        match self.snapshot_path(snapshot_name) {
            Some(path) => {
                fs::remove_file(path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn snapshot_path(&self, snapshot_name: &str) -> Option<PathBuf> {
        let path = self.snapshot_dir.join(snapshot_name);
        path.exists().then_some(path)
    }

    fn describe(path: &Path, name: String) -> Result<SnapshotDescription> {
        let file_data = fs::read(path)?;
        let checksum = format!("{:x}", Sha256::digest(&file_data));

        let metadata = fs::metadata(path)?;
        let creation_time = metadata
            .created()
            .or_else(|_| metadata.modified())
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .and_then(|d| DateTime::from_timestamp(d.as_secs() as i64, 0))
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string());

        Ok(SnapshotDescription {
            name,
            creation_time,
            size: metadata.len(),
            checksum: Some(checksum),
        })
    }
}
