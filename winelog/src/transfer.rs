//! Export and import
//!
//! - [`export_json`] and [`export_csv`] serialize any selection of entries,
//!   either the whole collection or a filtered view
//! - [`export_public`] builds the public snapshot: public entries only, with
//!   photos downscaled for hosting
//! - [`parse_import`] and [`merge_import`] bring a json export back in,
//!   replacing entries with the same id and appending the rest

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use chrono::SecondsFormat;
use serde_json::Value;
use snafu::prelude::*;
use tracing::{debug, warn};

use crate::{
    Result,
    entry::{Entry, decode_entry, migrate_value},
    error::{ImportSnafu, IoSnafu, SerializationSnafu, WinelogError},
    photo::{ShrinkOptions, shrink_data_url},
};

/// File name of the public snapshot, relative to its hosting base url
pub const PUBLIC_SNAPSHOT_FILE: &str = "public.json";

/// CSV header, in column order
pub const CSV_COLUMNS: [&str; 21] = [
    "id",
    "type",
    "date",
    "name",
    "appearance_clarity",
    "hue_density",
    "hue",
    "smell_intensity",
    "smell_fruit",
    "smell_other",
    "sweetness",
    "sourness",
    "bitterness",
    "astringency",
    "palate_fruit",
    "palate_other",
    "body",
    "texture",
    "balance",
    "finish",
    "notes",
];

/// Separator for list values inside one csv cell
const LIST_SEPARATOR: &str = ";";

/// Pretty-printed json array of the entries
pub fn export_json<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Result<String> {
    let entries: Vec<&Entry> = entries.into_iter().collect();
    serde_json::to_string_pretty(&entries).context(SerializationSnafu)
}

/// CSV with a header row and one row per entry, `\n` line endings.
pub fn export_csv<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> String {
    let mut out = CSV_COLUMNS.join(",");
    out.push('\n');
    for entry in entries {
        let row: Vec<String> = csv_record(entry).iter().map(|v| csv_field(v)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

fn csv_record(entry: &Entry) -> [String; 21] {
    let list = |values: Vec<&str>| values.join(LIST_SEPARATOR);
    [
        entry.id.clone(),
        entry.kind.to_string(),
        entry.date.to_rfc3339_opts(SecondsFormat::Millis, true),
        entry.name.clone(),
        entry.appearance_clarity.clone(),
        entry.hue_density.clone(),
        entry.hue.clone(),
        entry.smell_intensity.clone(),
        list(entry.nose_fruit().iter().map(String::as_str).collect()),
        list(entry.nose_other()),
        entry.sweetness.clone(),
        entry.sourness.clone(),
        entry.bitterness.clone(),
        entry.astringency.clone(),
        list(entry.palate_fruit().iter().map(String::as_str).collect()),
        list(entry.palate_other()),
        entry.body.clone(),
        entry.texture.clone(),
        entry.balance.clone(),
        entry.finish.clone(),
        entry.notes.clone(),
    ]
}

/// Quotes a value containing a separator, quote or line break
fn csv_field(value: &str) -> String {
    if value.contains([',', ';', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Public entries with their photos downscaled, as a json array.
pub fn export_public<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Result<String> {
    let opts = ShrinkOptions::public();
    let public: Vec<Entry> = entries
        .into_iter()
        .filter(|e| e.public)
        .map(|e| {
            let mut e = e.clone();
            if e.photo().is_some() {
                e.photo = shrink_data_url(&e.photo, &opts);
            }
            e
        })
        .collect();
    debug!(count = public.len(), "public snapshot");
    serde_json::to_string_pretty(&public).context(SerializationSnafu)
}

/// Writes the public snapshot as `public.json` inside `dir`
pub fn write_public<'a>(
    dir: impl AsRef<Path>,
    entries: impl IntoIterator<Item = &'a Entry>,
) -> Result<PathBuf> {
    let path = dir.as_ref().join(PUBLIC_SNAPSHOT_FILE);
    let data = export_public(entries)?;
    fs::write(&path, data).context(IoSnafu { path: &path })?;
    Ok(path)
}

/// Parses an exported json array.
///
/// Elements are migrated like stored records, so older exports and records
/// without an id are accepted. Non-object elements are skipped. Any other
/// element that cannot be decoded fails the whole import.
pub fn parse_import(text: &str) -> Result<Vec<Entry>> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    let value: Value = serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
        WinelogError::Import {
            message: format!("invalid json at {}: {}", err.path(), err.inner()),
        }
    })?;
    let Value::Array(items) = value else {
        return ImportSnafu {
            message: "expected a json array of entries",
        }
        .fail();
    };

    let mut entries = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        let Some(item) = migrate_value(item) else {
            warn!(index = idx, "import: skipping element that is not an object");
            continue;
        };
        let entry = decode_entry(item).map_err(|err| WinelogError::Import {
            message: format!("element [{idx}]: {err}"),
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Counts from [`merge_import`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MergeReport {
    /// Entries with a new id, appended
    pub added: usize,
    /// Entries that replaced an existing entry with the same id
    pub replaced: usize,
}

/// Merges imported entries into `collection`. An imported entry replaces the
/// existing entry with the same id entirely, in place; others are appended
/// in import order. Later duplicates in `imported` win.
pub fn merge_import(collection: &mut Vec<Entry>, imported: Vec<Entry>) -> MergeReport {
    let mut index: HashMap<String, usize> = collection
        .iter()
        .enumerate()
        .map(|(idx, e)| (e.id.clone(), idx))
        .collect();
    let existing = collection.len();
    let mut replaced = HashSet::new();
    let mut added = 0;

    for entry in imported {
        match index.get(&entry.id) {
            Some(&idx) => {
                if idx < existing {
                    replaced.insert(idx);
                }
                collection[idx] = entry;
            }
            None => {
                index.insert(entry.id.clone(), collection.len());
                collection.push(entry);
                added += 1;
            }
        }
    }
    MergeReport {
        added,
        replaced: replaced.len(),
    }
}
