//! Checkpoint persistence
//!
//! Per-chunk checkpoints (`checkpoint_{start}_{end}.csv`) hold one row per
//! successfully analyzed track, keyed by the original row index. The final
//! artifact is the left join of every input row with its features, in input
//! order.
//!
//! Every artifact is written to a hidden temporary sibling and renamed into
//! place, so a crash mid-write never leaves a truncated checkpoint and
//! rewriting identical input yields an identical file.

use crate::analysis::result::TrackFeatures;
use crate::error::BatchError;
use crate::io::dataset::{dataset_columns, TrackRow};
use csv::StringRecord;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the row-key column in checkpoint artifacts
pub const INDEX_COLUMN: &str = "index";

const CHECKPOINT_PREFIX: &str = "checkpoint_";
const CHECKPOINT_SUFFIX: &str = ".csv";

/// Reads and writes checkpoint and final artifacts in one directory
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
    final_filename: String,
}

impl CheckpointStore {
    /// Store rooted at `dir`, writing the final artifact as `final_filename`
    pub fn new(dir: impl Into<PathBuf>, final_filename: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            final_filename: final_filename.into(),
        }
    }

    /// Directory holding all artifacts
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the checkpoint for chunk `[start, end)`
    pub fn checkpoint_path(&self, start: usize, end: usize) -> PathBuf {
        self.dir
            .join(format!("{}{}_{}{}", CHECKPOINT_PREFIX, start, end, CHECKPOINT_SUFFIX))
    }

    /// Path of the final joined artifact
    pub fn final_path(&self) -> PathBuf {
        self.dir.join(&self.final_filename)
    }

    /// Persist one chunk's successful rows, sorted by index
    ///
    /// Overwrites any existing checkpoint for the same offsets.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::Persistence` if the file cannot be written.
    pub fn write_chunk(
        &self,
        start: usize,
        end: usize,
        rows: &[(usize, TrackFeatures)],
    ) -> Result<PathBuf, BatchError> {
        let path = self.checkpoint_path(start, end);

        let mut sorted: Vec<&(usize, TrackFeatures)> = rows.iter().collect();
        sorted.sort_by_key(|(index, _)| *index);

        let mut header = vec![INDEX_COLUMN.to_string()];
        header.extend(TrackFeatures::COLUMNS.iter().map(|c| c.to_string()));

        let records = sorted.into_iter().map(|(index, features)| {
            let mut record = vec![index.to_string()];
            record.extend(features.to_record());
            record
        });

        write_atomic(&path, &header, records)?;
        log::debug!("Wrote checkpoint {} ({} rows)", path.display(), rows.len());
        Ok(path)
    }

    /// Persist the left join of `rows` with `results`, in input order
    ///
    /// Columns are the dataset columns in first-seen order followed by the
    /// feature columns. Rows without a result have empty feature cells. A
    /// dataset column whose name clashes with a feature column is written as
    /// `<name>_source`.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::Persistence` if the file cannot be written.
    pub fn write_final(
        &self,
        rows: &[TrackRow],
        results: &BTreeMap<usize, TrackFeatures>,
    ) -> Result<PathBuf, BatchError> {
        let path = self.final_path();
        let columns = dataset_columns(rows);

        let mut header: Vec<String> = columns
            .iter()
            .map(|c| {
                if TrackFeatures::COLUMNS.contains(&c.as_str()) {
                    format!("{}_source", c)
                } else {
                    c.clone()
                }
            })
            .collect();
        header.extend(TrackFeatures::COLUMNS.iter().map(|c| c.to_string()));

        let empty_features = vec![String::new(); TrackFeatures::COLUMNS.len()];
        let records = rows.iter().map(|row| {
            let mut record: Vec<String> = columns.iter().map(|c| row.cell(c)).collect();
            match results.get(&row.index) {
                Some(features) => record.extend(features.to_record()),
                None => record.extend(empty_features.iter().cloned()),
            }
            record
        });

        write_atomic(&path, &header, records)?;
        log::info!(
            "Wrote final dataset {} ({} rows, {} with features)",
            path.display(),
            rows.len(),
            results.len()
        );
        Ok(path)
    }

    /// Read back the rows of the checkpoint for `[start, end)`
    ///
    /// # Errors
    ///
    /// Returns `BatchError::Persistence` if the file is missing or malformed.
    pub fn read_chunk(&self, start: usize, end: usize) -> Result<Vec<(usize, TrackFeatures)>, BatchError> {
        let path = self.checkpoint_path(start, end);
        let mut reader =
            csv::Reader::from_path(&path).map_err(|e| BatchError::persistence(&path, e))?;

        let headers = reader
            .headers()
            .map_err(|e| BatchError::persistence(&path, e))?
            .clone();
        if headers.get(0) != Some(INDEX_COLUMN) {
            return Err(BatchError::persistence(
                &path,
                format!("first column must be '{}'", INDEX_COLUMN),
            ));
        }
        let feature_headers: StringRecord = headers.iter().skip(1).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| BatchError::persistence(&path, e))?;
            let index: usize = record
                .get(0)
                .unwrap_or_default()
                .parse()
                .map_err(|e| BatchError::persistence(&path, format!("bad index: {}", e)))?;
            let feature_record: StringRecord = record.iter().skip(1).collect();
            let features: TrackFeatures = feature_record
                .deserialize(Some(&feature_headers))
                .map_err(|e| BatchError::persistence(&path, e))?;
            rows.push((index, features));
        }

        Ok(rows)
    }

    /// Offsets of every checkpoint present in the directory, sorted by start
    ///
    /// A missing directory yields an empty list.
    pub fn completed_chunks(&self) -> Result<Vec<(usize, usize)>, BatchError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BatchError::persistence(&self.dir, e)),
        };

        let mut chunks: Vec<(usize, usize)> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| parse_checkpoint_name(&entry.file_name().to_string_lossy()))
            .collect();
        chunks.sort_unstable();
        Ok(chunks)
    }
}

/// Parse `checkpoint_{start}_{end}.csv` into its offsets
pub fn parse_checkpoint_name(name: &str) -> Option<(usize, usize)> {
    let inner = name
        .strip_prefix(CHECKPOINT_PREFIX)?
        .strip_suffix(CHECKPOINT_SUFFIX)?;
    let (start, end) = inner.split_once('_')?;
    let start = start.parse().ok()?;
    let end = end.parse().ok()?;
    (start < end).then_some((start, end))
}

/// Write a header and records to `path` via a temporary file and rename
fn write_atomic<I>(path: &Path, header: &[String], records: I) -> Result<(), BatchError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| BatchError::persistence(dir, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = dir.join(format!(".{}.tmp", file_name));

    {
        let mut writer =
            csv::Writer::from_path(&tmp_path).map_err(|e| BatchError::persistence(&tmp_path, e))?;
        writer
            .write_record(header)
            .map_err(|e| BatchError::persistence(&tmp_path, e))?;
        for record in records {
            writer
                .write_record(&record)
                .map_err(|e| BatchError::persistence(&tmp_path, e))?;
        }
        writer
            .flush()
            .map_err(|e| BatchError::persistence(&tmp_path, e))?;
    }

    fs::rename(&tmp_path, path).map_err(|e| BatchError::persistence(path, e))?;
    Ok(())
}
