//! Playlist dataset loading
//!
//! Flattens a playlist JSON export into one [`TrackRow`] per track:
//!
//! 1. Each playlist object holds its tracks under the key `"0"`; every other
//!    key is playlist metadata.
//! 2. Each track is merged with its playlist's metadata (playlist fields win on
//!    name clashes).
//! 3. Playlist fields are prefixed (`name` → `playlist_name`, ...).
//! 4. Rows are de-duplicated on `(artist_name, track_name)`, keeping the first
//!    occurrence and its flattened position as the row index.

use crate::error::BatchError;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;

/// Key under which a playlist object stores its track list
pub const TRACKS_KEY: &str = "0";

/// Playlist fields renamed with a `playlist_` prefix after flattening
pub const PLAYLIST_FIELDS: [&str; 7] = [
    "name",
    "pid",
    "num_tracks",
    "num_albums",
    "num_artists",
    "num_followers",
    "collaborative",
];

/// One input record
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRow {
    /// Position in the flattened dataset; unique, used as the join key
    pub index: usize,

    /// Artist name (empty if absent from the source)
    pub artist_name: String,

    /// Track name (empty if absent from the source)
    pub track_name: String,

    /// All columns of the row, in source order (includes `artist_name` and `track_name`)
    pub fields: Map<String, Value>,
}

impl TrackRow {
    /// Build a row from a JSON object, reading the identifying fields from it
    pub fn new(index: usize, fields: Map<String, Value>) -> Self {
        let artist_name = text_field(&fields, "artist_name");
        let track_name = text_field(&fields, "track_name");
        Self {
            index,
            artist_name,
            track_name,
            fields,
        }
    }

    /// Column value rendered for tabular output
    ///
    /// Strings are written as-is, `null`/missing as empty, nested values as JSON.
    pub fn cell(&self, column: &str) -> String {
        match self.fields.get(column) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => other.to_string(),
        }
    }
}

fn text_field(fields: &Map<String, Value>, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Load and flatten a playlist JSON file
///
/// # Errors
///
/// Returns `BatchError::Dataset` if the file cannot be read or is not a JSON
/// array of playlist objects.
pub fn load_playlists(path: &Path) -> Result<Vec<TrackRow>, BatchError> {
    log::info!("Loading playlist dataset from {}", path.display());
    let text = std::fs::read_to_string(path)
        .map_err(|e| BatchError::Dataset(format!("{}: {}", path.display(), e)))?;
    let value: Value = serde_json::from_str(&text)?;
    let rows = flatten_playlists(&value)?;
    log::info!("Loaded {} unique tracks", rows.len());
    Ok(rows)
}

/// Flatten parsed playlist JSON into de-duplicated track rows
pub fn flatten_playlists(value: &Value) -> Result<Vec<TrackRow>, BatchError> {
    let playlists = value
        .as_array()
        .ok_or_else(|| BatchError::Dataset("Expected a JSON array of playlists".to_string()))?;

    let mut flattened: Vec<Map<String, Value>> = Vec::new();

    for (p_idx, playlist) in playlists.iter().enumerate() {
        let playlist = playlist.as_object().ok_or_else(|| {
            BatchError::Dataset(format!("Playlist {} is not a JSON object", p_idx))
        })?;

        let metadata: Map<String, Value> = playlist
            .iter()
            .filter(|(k, _)| k.as_str() != TRACKS_KEY)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let tracks = match playlist.get(TRACKS_KEY) {
            Some(Value::Array(tracks)) => tracks.as_slice(),
            Some(Value::Null) | None => &[],
            Some(_) => {
                return Err(BatchError::Dataset(format!(
                    "Playlist {} has a non-array track list",
                    p_idx
                )))
            }
        };

        for track in tracks {
            let mut combined = match track {
                Value::Object(obj) => obj.clone(),
                _ => {
                    log::warn!("Skipping non-object track entry in playlist {}", p_idx);
                    continue;
                }
            };
            for (k, v) in &metadata {
                combined.insert(k.clone(), v.clone());
            }
            flattened.push(rename_playlist_fields(combined));
        }
    }

    let total = flattened.len();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let rows: Vec<TrackRow> = flattened
        .into_iter()
        .enumerate()
        .map(|(index, fields)| TrackRow::new(index, fields))
        .filter(|row| seen.insert((row.artist_name.clone(), row.track_name.clone())))
        .collect();

    log::debug!(
        "Flattened {} playlists into {} tracks, {} after de-duplication",
        playlists.len(),
        total,
        rows.len()
    );

    Ok(rows)
}

fn rename_playlist_fields(fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(k, v)| {
            if PLAYLIST_FIELDS.contains(&k.as_str()) {
                (format!("playlist_{}", k), v)
            } else {
                (k, v)
            }
        })
        .collect()
}

/// Ordered union of all columns across rows, in first-seen order
pub fn dataset_columns(rows: &[TrackRow]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for row in rows {
        for key in row.fields.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!([
            {
                "name": "Road Trip",
                "pid": 1,
                "num_followers": 3,
                "0": [
                    {"artist_name": "A", "track_name": "One", "pos": 0},
                    {"artist_name": "B", "track_name": "Two", "pos": 1}
                ]
            },
            {
                "name": "Chill",
                "pid": 2,
                "0": [
                    {"artist_name": "A", "track_name": "One", "pos": 0},
                    {"artist_name": "C", "track_name": "Three", "pos": 1}
                ]
            }
        ])
    }

    #[test]
    fn test_flatten_merges_and_renames() {
        let rows = flatten_playlists(&sample()).unwrap();
        assert_eq!(rows.len(), 3);
        let first = &rows[0];
        assert_eq!(first.artist_name, "A");
        assert_eq!(first.cell("playlist_name"), "Road Trip");
        assert_eq!(first.cell("playlist_pid"), "1");
        assert_eq!(first.cell("playlist_num_followers"), "3");
        assert!(first.fields.get("name").is_none());
        assert!(first.fields.get(TRACKS_KEY).is_none());
    }

    #[test]
    fn test_dedup_keeps_first_index() {
        let rows = flatten_playlists(&sample()).unwrap();
        let indices: Vec<usize> = rows.iter().map(|r| r.index).collect();
        // Flattened positions 0,1,2,3; position 2 duplicates position 0
        assert_eq!(indices, vec![0, 1, 3]);
        assert_eq!(rows[2].track_name, "Three");
        assert_eq!(rows[2].cell("playlist_name"), "Chill");
    }

    #[test]
    fn test_missing_identifiers_become_empty() {
        let rows = flatten_playlists(&json!([{"0": [{"track_name": "Solo"}]}])).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].artist_name, "");
        assert_eq!(rows[0].track_name, "Solo");
    }

    #[test]
    fn test_rejects_non_array() {
        assert!(matches!(
            flatten_playlists(&json!({"0": []})),
            Err(BatchError::Dataset(_))
        ));
    }

    #[test]
    fn test_dataset_columns_first_seen_order() {
        let rows = flatten_playlists(&sample()).unwrap();
        let columns = dataset_columns(&rows);
        assert_eq!(&columns[..3], &["artist_name", "track_name", "pos"]);
        assert!(columns.contains(&"playlist_num_followers".to_string()));
    }

    #[test]
    fn test_cell_rendering() {
        let mut fields = Map::new();
        fields.insert("artist_name".into(), json!("X"));
        fields.insert("flag".into(), json!(true));
        fields.insert("missing".into(), Value::Null);
        fields.insert("tags".into(), json!(["a", "b"]));
        let row = TrackRow::new(0, fields);
        assert_eq!(row.cell("flag"), "true");
        assert_eq!(row.cell("missing"), "");
        assert_eq!(row.cell("absent"), "");
        assert_eq!(row.cell("tags"), "[\"a\",\"b\"]");
    }

    #[test]
    fn test_load_playlists_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playlists.json");
        std::fs::write(&path, sample().to_string()).unwrap();
        let rows = load_playlists(&path).unwrap();
        assert_eq!(rows.len(), 3);

        assert!(load_playlists(&dir.path().join("missing.json")).is_err());
    }
}
