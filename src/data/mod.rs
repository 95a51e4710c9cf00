// Data loading module
// Merges the raw synopsis and metadata CSVs into one processed dataset

#[cfg(test)]
mod tests;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::AnirecError;

/// Placeholder text MyAnimeList inserts for entries without a real synopsis
const SYNOPSIS_PLACEHOLDER: &str = "No synopsis information has been added";

/// Row of the synopsis CSV. The source dataset misspells the synopsis
/// column as "sypnopsis"; both spellings are accepted.
#[derive(Debug, Clone, Deserialize)]
struct SynopsisRow {
    #[serde(rename = "MAL_ID")]
    mal_id: u32,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "sypnopsis", alias = "synopsis", default)]
    synopsis: String,
}

/// Row of the metadata CSV. Extra columns in the source file are ignored.
#[derive(Debug, Clone, Deserialize)]
struct MetadataRow {
    #[serde(rename = "MAL_ID")]
    mal_id: u32,
    #[serde(rename = "Score", default)]
    score: String,
    #[serde(rename = "Genres", default)]
    genres: String,
    #[serde(rename = "Type", default)]
    media_type: String,
    #[serde(rename = "Episodes", default)]
    episodes: String,
    #[serde(rename = "Members", default)]
    members: String,
}

/// One merged, cleaned row of the processed dataset.
///
/// Guarantees: title and synopsis are non-empty and whitespace-normalized;
/// titles are unique (case-insensitive) across the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub mal_id: u32,
    pub title: String,
    pub synopsis: String,
    pub genres: String,
    pub media_type: String,
    pub episodes: Option<u32>,
    pub score: Option<f32>,
    pub members: Option<u64>,
}

/// Merge the two source CSVs into one processed dataset file.
///
/// Rows are fully assembled and validated in memory before the output file
/// is opened, so a failure never leaves a partial file on disk. Any existing
/// file at `output_path` is overwritten.
#[inline]
pub fn load_and_process(
    synopsis_path: &Path,
    metadata_path: &Path,
    output_path: &Path,
) -> Result<PathBuf, AnirecError> {
    let records = merge_sources(synopsis_path, metadata_path)?;

    info!(
        "Writing {} processed records to {}",
        records.len(),
        output_path.display()
    );

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                AnirecError::Data(format!("Failed to create output directory: {}", e))
            })?;
        }
    }

    let mut writer = csv::Writer::from_path(output_path)
        .map_err(|e| AnirecError::Data(format!("Failed to open output file: {}", e)))?;

    for record in &records {
        writer
            .serialize(record)
            .map_err(|e| AnirecError::Data(format!("Failed to write record: {}", e)))?;
    }

    writer
        .flush()
        .map_err(|e| AnirecError::Data(format!("Failed to flush output file: {}", e)))?;

    Ok(output_path.to_path_buf())
}

/// Read a processed dataset file back into memory
#[inline]
pub fn read_processed(path: &Path) -> Result<Vec<ProcessedRecord>, AnirecError> {
    if !path.exists() {
        return Err(AnirecError::Data(format!(
            "Processed dataset not found: {}",
            path.display()
        )));
    }

    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| AnirecError::Data(format!("Failed to open processed dataset: {}", e)))?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: ProcessedRecord =
            row.map_err(|e| AnirecError::Data(format!("Malformed processed row: {}", e)))?;
        records.push(record);
    }

    Ok(records)
}

fn merge_sources(
    synopsis_path: &Path,
    metadata_path: &Path,
) -> Result<Vec<ProcessedRecord>, AnirecError> {
    if !synopsis_path.exists() {
        return Err(AnirecError::Data(format!(
            "Synopsis file not found: {}",
            synopsis_path.display()
        )));
    }
    if !metadata_path.exists() {
        return Err(AnirecError::Data(format!(
            "Metadata file not found: {}",
            metadata_path.display()
        )));
    }

    let metadata = read_metadata(metadata_path)?;
    let synopses = read_synopses(synopsis_path)?;

    info!(
        "Merging {} synopsis rows against {} metadata rows",
        synopses.len(),
        metadata.len()
    );

    let mut dropped = 0usize;
    let records: Vec<ProcessedRecord> = synopses
        .into_iter()
        .filter_map(|row| {
            let Some(meta) = metadata.get(&row.mal_id) else {
                dropped += 1;
                return None;
            };

            let title = normalize_whitespace(&row.name);
            let synopsis = normalize_whitespace(&row.synopsis);

            if title.is_empty() || synopsis.is_empty() || synopsis.contains(SYNOPSIS_PLACEHOLDER) {
                dropped += 1;
                return None;
            }

            Some(ProcessedRecord {
                mal_id: row.mal_id,
                title,
                synopsis,
                genres: normalize_whitespace(&meta.genres),
                media_type: meta.media_type.trim().to_string(),
                episodes: meta.episodes.trim().parse().ok(),
                score: meta.score.trim().parse().ok(),
                members: meta.members.trim().parse().ok(),
            })
        })
        .unique_by(|record| record.title.to_lowercase())
        .collect();

    if dropped > 0 {
        warn!("Dropped {} rows during merge (unjoined or empty)", dropped);
    }

    if records.is_empty() {
        return Err(AnirecError::Data(
            "Join produced zero rows; do the source files share MAL ids?".to_string(),
        ));
    }

    debug!("Merged dataset has {} records", records.len());
    Ok(records)
}

fn read_synopses(path: &Path) -> Result<Vec<SynopsisRow>, AnirecError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| AnirecError::Data(format!("Failed to open synopsis file: {}", e)))?;

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        let row: SynopsisRow =
            row.map_err(|e| AnirecError::Data(format!("Malformed synopsis row: {}", e)))?;
        rows.push(row);
    }

    Ok(rows)
}

fn read_metadata(path: &Path) -> Result<HashMap<u32, MetadataRow>, AnirecError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| AnirecError::Data(format!("Failed to open metadata file: {}", e)))?;

    let mut rows = HashMap::new();
    for row in reader.deserialize() {
        let row: MetadataRow =
            row.map_err(|e| AnirecError::Data(format!("Malformed metadata row: {}", e)))?;
        rows.insert(row.mal_id, row);
    }

    Ok(rows)
}

/// Collapse all runs of whitespace (including newlines) to single spaces
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().join(" ")
}
