//! Periodic and final persistence of run state.
//!
//! A snapshot is a directory holding `config.json`, `metadata.json`,
//! `logbook.json`, `lineages.json` and `hof.json`. Directories are staged
//! under a hidden `.partial` name and renamed into place once every file has
//! been written. An existing directory is moved to a hidden `.backup` name
//! first and only deleted after the new one is in place, so a completed
//! snapshot is never left half-overwritten.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::schema::{
    AnimatRecord, ExperimentConfig, Genome, LogRecord, RunConfig, SnapshotMetadata,
};

const CONFIG_FILE: &str = "config.json";
const METADATA_FILE: &str = "metadata.json";
const LOGBOOK_FILE: &str = "logbook.json";
const LINEAGES_FILE: &str = "lineages.json";
const HOF_FILE: &str = "hof.json";

/// Name of the directory written when the run terminates.
pub const FINAL_SNAPSHOT_DIR: &str = "final";

/// Everything persisted in one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotData {
    pub config: ExperimentConfig,
    pub metadata: SnapshotMetadata,
    pub logbook: Vec<LogRecord>,
    /// Sampled lineages, each newest first.
    pub lineages: Vec<Vec<AnimatRecord>>,
    pub hall_of_fame: Vec<AnimatRecord>,
}

impl SnapshotData {
    /// Write every file into `dir`, replacing any existing directory atomically.
    pub fn write_to<P: AsRef<Path>>(&self, dir: P) -> Result<(), SnapshotError> {
        let dir = dir.as_ref();
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string());
        let parent = dir.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|e| SnapshotError::io(parent, e))?;

        let staging = parent.join(format!(".{name}.partial"));
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| SnapshotError::io(&staging, e))?;
        }
        fs::create_dir_all(&staging).map_err(|e| SnapshotError::io(&staging, e))?;

        write_json(&staging.join(CONFIG_FILE), &self.config)?;
        write_json(&staging.join(METADATA_FILE), &self.metadata)?;
        write_json(&staging.join(LOGBOOK_FILE), &self.logbook)?;
        write_json(&staging.join(LINEAGES_FILE), &self.lineages)?;
        write_json(&staging.join(HOF_FILE), &self.hall_of_fame)?;

        swap_into_place(&staging, dir, &parent.join(format!(".{name}.backup")))
    }

    /// Read a snapshot directory written by [`write_to`](Self::write_to).
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, SnapshotError> {
        let dir = dir.as_ref();
        Ok(Self {
            config: read_json(&dir.join(CONFIG_FILE))?,
            metadata: read_json(&dir.join(METADATA_FILE))?,
            logbook: read_json(&dir.join(LOGBOOK_FILE))?,
            lineages: read_json(&dir.join(LINEAGES_FILE))?,
            hall_of_fame: read_json(&dir.join(HOF_FILE))?,
        })
    }
}

/// Replace `dir` with `staging`. The previous `dir` is parked at `backup`
/// until the rename succeeds and restored if it fails.
fn swap_into_place(staging: &Path, dir: &Path, backup: &Path) -> Result<(), SnapshotError> {
    if backup.exists() {
        fs::remove_dir_all(backup).map_err(|e| SnapshotError::io(backup, e))?;
    }

    let had_previous = dir.exists();
    if had_previous {
        fs::rename(dir, backup).map_err(|e| SnapshotError::io(dir, e))?;
    }

    if let Err(e) = fs::rename(staging, dir) {
        if had_previous && let Err(restore) = fs::rename(backup, dir) {
            log::error!(
                "Could not restore {} from {}: {restore}",
                dir.display(),
                backup.display()
            );
        }
        return Err(SnapshotError::io(dir, e));
    }

    if had_previous && let Err(e) = fs::remove_dir_all(backup) {
        log::warn!("Could not remove snapshot backup {}: {e}", backup.display());
    }
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SnapshotError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| SnapshotError::json(path, e))?;
    fs::write(path, json).map_err(|e| SnapshotError::io(path, e))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SnapshotError> {
    let content = fs::read_to_string(path).map_err(|e| SnapshotError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| SnapshotError::json(path, e))
}

/// Most recent genome of the first lineage in a `lineages.json` file, or in
/// the `lineages.json` of a snapshot directory.
pub fn load_initial_genome<P: AsRef<Path>>(path: P) -> Result<Genome, SnapshotError> {
    let path = path.as_ref();
    let file = if path.is_dir() {
        path.join(LINEAGES_FILE)
    } else {
        path.to_path_buf()
    };
    let lineages: Vec<Vec<AnimatRecord>> = read_json(&file)?;
    lineages
        .into_iter()
        .next()
        .and_then(|lineage| lineage.into_iter().next())
        .map(|record| record.genome)
        .ok_or(SnapshotError::EmptyLineage(file))
}

/// When periodic snapshots are due.
#[derive(Debug, Clone)]
pub struct SnapshotSchedule {
    time_interval: Option<Duration>,
    generation_interval: Option<u64>,
    last: Instant,
}

impl SnapshotSchedule {
    pub fn new(
        time_interval: Option<Duration>,
        generation_interval: Option<u64>,
        now: Instant,
    ) -> Self {
        Self {
            time_interval,
            generation_interval,
            last: now,
        }
    }

    pub fn from_config(run: &RunConfig, now: Instant) -> Self {
        Self::new(
            run.snapshot_time_interval(),
            run.snapshot_generation_interval(),
            now,
        )
    }

    /// Whether a snapshot is due after `generation` completed at `now`.
    pub fn due(&self, now: Instant, generation: u64) -> bool {
        let by_time = self
            .time_interval
            .is_some_and(|interval| now.saturating_duration_since(self.last) >= interval);
        let by_generation = self
            .generation_interval
            .is_some_and(|interval| generation % interval == 0);
        by_time || by_generation
    }

    /// Restart the wall-clock interval.
    pub fn mark(&mut self, now: Instant) {
        self.last = now;
    }
}

/// Writes snapshots under an output directory.
#[derive(Debug)]
pub struct SnapshotManager {
    output_dir: PathBuf,
    schedule: SnapshotSchedule,
    written: u32,
}

impl SnapshotManager {
    pub fn new<P: Into<PathBuf>>(output_dir: P, schedule: SnapshotSchedule) -> Self {
        Self {
            output_dir: output_dir.into(),
            schedule,
            written: 0,
        }
    }

    /// Manager scheduled from `run`, with the clock starting now.
    pub fn from_config<P: Into<PathBuf>>(output_dir: P, run: &RunConfig) -> Self {
        Self::new(output_dir, SnapshotSchedule::from_config(run, Instant::now()))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn due(&self, now: Instant, generation: u64) -> bool {
        self.schedule.due(now, generation)
    }

    /// Number the next periodic snapshot will get.
    pub fn next_number(&self) -> u32 {
        self.written + 1
    }

    /// Periodic snapshots written so far.
    pub fn snapshots_written(&self) -> u32 {
        self.written
    }

    /// Persist `data` if a snapshot is due. `data` is only built when needed
    /// and receives the snapshot number.
    pub fn maybe_snapshot<F>(
        &mut self,
        now: Instant,
        generation: u64,
        data: F,
    ) -> Result<Option<PathBuf>, SnapshotError>
    where
        F: FnOnce(u32) -> SnapshotData,
    {
        if !self.due(now, generation) {
            return Ok(None);
        }

        let number = self.next_number();
        let dir = self
            .output_dir
            .join(format!("snapshot-{number}-gen-{generation}"));
        log::info!("Recording snapshot {number} at generation {generation}");
        data(number).write_to(&dir)?;

        self.written = number;
        self.schedule.mark(Instant::now());
        Ok(Some(dir))
    }

    /// Write the terminal persist to `output_dir/final`.
    pub fn finalize(&self, data: &SnapshotData) -> Result<PathBuf, SnapshotError> {
        let dir = self.output_dir.join(FINAL_SNAPSHOT_DIR);
        data.write_to(&dir)?;
        log::info!("Wrote final results to {}", dir.display());
        Ok(dir)
    }
}

/// Snapshot persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("No lineage found in {0}")]
    EmptyLineage(PathBuf),
}

impl SnapshotError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}
