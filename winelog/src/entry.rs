//! Tasting entries
//!
//! An [`Entry`] is one tasting record. The serialized field names match the
//! stored json format, so records written by older versions load unchanged.
//! Fields added over time (`likes`, `liked`, `public`) are optional on the
//! wire and backfilled by [`migrate_values`].
//!
//! The nose and palate each have one fruit list whose key depends on the wine
//! type: `smell_fresh`/`palate_fresh` for white, `smell_fruit_red`/
//! `palate_fruit_red` for red. Exactly one of each pair is present.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{Result, error::WinelogError};

/// Wine type discriminant
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum WineType {
    #[default]
    White,
    Red,
}

impl WineType {
    /// Upper-case label used in list rows and headings
    pub fn label(self) -> &'static str {
        match self {
            Self::White => "WHITE",
            Self::Red => "RED",
        }
    }

    /// Form field name of the nose fruit list
    pub fn nose_fruit_key(self) -> &'static str {
        match self {
            Self::White => "smell_fresh",
            Self::Red => "smell_fruit_red",
        }
    }

    /// Form field name of the palate fruit list
    pub fn palate_fruit_key(self) -> &'static str {
        match self {
            Self::White => "palate_fresh",
            Self::Red => "palate_fruit_red",
        }
    }
}

/// Names of the single-select descriptor fields, in form order.
pub const SINGLE_SELECT_FIELDS: [&str; 12] = [
    "appearance_clarity",
    "hue_density",
    "hue",
    "smell_intensity",
    "sweetness",
    "sourness",
    "bitterness",
    "astringency",
    "body",
    "texture",
    "balance",
    "finish",
];

const LIST_FIELDS: [&str; 6] = [
    "smell_fresh",
    "smell_fruit_red",
    "smell_other",
    "palate_fresh",
    "palate_fruit_red",
    "palate_other",
];

const TEXT_FIELDS: [&str; 5] = [
    "name",
    "notes",
    "smell_other_text",
    "palate_other_text",
    "photo",
];

/// One tasting record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Opaque unique id, assigned at creation
    pub id: String,

    #[serde(rename = "type")]
    pub kind: WineType,

    /// Creation time
    pub date: DateTime<Utc>,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub notes: String,

    // appearance
    #[serde(default)]
    pub appearance_clarity: String,
    #[serde(default)]
    pub hue_density: String,
    #[serde(default)]
    pub hue: String,

    // nose
    #[serde(default)]
    pub smell_intensity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smell_fresh: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smell_fruit_red: Option<Vec<String>>,
    #[serde(default)]
    pub smell_other: Vec<String>,
    #[serde(default)]
    pub smell_other_text: String,

    // palate
    #[serde(default)]
    pub sweetness: String,
    #[serde(default)]
    pub sourness: String,
    #[serde(default)]
    pub bitterness: String,
    #[serde(default)]
    pub astringency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palate_fresh: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palate_fruit_red: Option<Vec<String>>,
    #[serde(default)]
    pub palate_other: Vec<String>,
    #[serde(default)]
    pub palate_other_text: String,

    // structure
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub texture: String,
    #[serde(default)]
    pub balance: String,
    #[serde(default)]
    pub finish: String,

    /// Embedded photo as a data url. Empty when there is no photo.
    #[serde(default)]
    pub photo: String,

    #[serde(default)]
    pub likes: u32,

    /// Whether the viewer liked this entry
    #[serde(default)]
    pub liked: bool,

    /// Included in the public snapshot
    #[serde(default)]
    pub public: bool,

    /// Fields this version does not know about. Kept so they survive a save.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Generates a new opaque entry id
pub fn new_entry_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

impl Entry {
    /// Creates an empty entry of the given type with a fresh id and the current time.
    pub fn new(kind: WineType) -> Self {
        let mut entry = Self {
            id: new_entry_id(),
            kind,
            date: Utc::now(),
            name: String::new(),
            notes: String::new(),
            appearance_clarity: String::new(),
            hue_density: String::new(),
            hue: String::new(),
            smell_intensity: String::new(),
            smell_fresh: None,
            smell_fruit_red: None,
            smell_other: Vec::new(),
            smell_other_text: String::new(),
            sweetness: String::new(),
            sourness: String::new(),
            bitterness: String::new(),
            astringency: String::new(),
            palate_fresh: None,
            palate_fruit_red: None,
            palate_other: Vec::new(),
            palate_other_text: String::new(),
            body: String::new(),
            texture: String::new(),
            balance: String::new(),
            finish: String::new(),
            photo: String::new(),
            likes: 0,
            liked: false,
            public: false,
            extra: Map::new(),
        };
        entry.normalize();
        entry
    }

    /// Enforces the fruit-list invariant: the list matching `kind` is present
    /// (possibly empty) and the other one is absent.
    pub fn normalize(&mut self) {
        match self.kind {
            WineType::White => {
                self.smell_fresh.get_or_insert_with(Vec::new);
                self.palate_fresh.get_or_insert_with(Vec::new);
                self.smell_fruit_red = None;
                self.palate_fruit_red = None;
            }
            WineType::Red => {
                self.smell_fruit_red.get_or_insert_with(Vec::new);
                self.palate_fruit_red.get_or_insert_with(Vec::new);
                self.smell_fresh = None;
                self.palate_fresh = None;
            }
        }
    }

    /// Nose fruit descriptors for this entry's type
    pub fn nose_fruit(&self) -> &[String] {
        let list = match self.kind {
            WineType::White => &self.smell_fresh,
            WineType::Red => &self.smell_fruit_red,
        };
        list.as_deref().unwrap_or_default()
    }

    /// Palate fruit descriptors for this entry's type
    pub fn palate_fruit(&self) -> &[String] {
        let list = match self.kind {
            WineType::White => &self.palate_fresh,
            WineType::Red => &self.palate_fruit_red,
        };
        list.as_deref().unwrap_or_default()
    }

    pub fn set_nose_fruit(&mut self, values: Vec<String>) {
        match self.kind {
            WineType::White => self.smell_fresh = Some(values),
            WineType::Red => self.smell_fruit_red = Some(values),
        }
    }

    pub fn set_palate_fruit(&mut self, values: Vec<String>) {
        match self.kind {
            WineType::White => self.palate_fresh = Some(values),
            WineType::Red => self.palate_fruit_red = Some(values),
        }
    }

    /// "Other" nose descriptors followed by the free text, if any
    pub fn nose_other(&self) -> Vec<&str> {
        with_text(&self.smell_other, &self.smell_other_text)
    }

    /// "Other" palate descriptors followed by the free text, if any
    pub fn palate_other(&self) -> Vec<&str> {
        with_text(&self.palate_other, &self.palate_other_text)
    }

    /// All nose descriptors: fruit, other, free text
    pub fn nose_descriptors(&self) -> Vec<&str> {
        let mut all: Vec<&str> = self.nose_fruit().iter().map(String::as_str).collect();
        all.extend(self.nose_other());
        all
    }

    /// All palate descriptors: fruit, other, free text
    pub fn palate_descriptors(&self) -> Vec<&str> {
        let mut all: Vec<&str> = self.palate_fruit().iter().map(String::as_str).collect();
        all.extend(self.palate_other());
        all
    }

    pub fn photo(&self) -> Option<&str> {
        (!self.photo.is_empty()).then_some(self.photo.as_str())
    }

    /// Value of a single-select descriptor by form field name
    pub fn single_select(&self, field: &str) -> Option<&str> {
        let value = match field {
            "appearance_clarity" => &self.appearance_clarity,
            "hue_density" => &self.hue_density,
            "hue" => &self.hue,
            "smell_intensity" => &self.smell_intensity,
            "sweetness" => &self.sweetness,
            "sourness" => &self.sourness,
            "bitterness" => &self.bitterness,
            "astringency" => &self.astringency,
            "body" => &self.body,
            "texture" => &self.texture,
            "balance" => &self.balance,
            "finish" => &self.finish,
            _ => return None,
        };
        Some(value.as_str())
    }

    pub(crate) fn single_select_mut(&mut self, field: &str) -> Option<&mut String> {
        let value = match field {
            "appearance_clarity" => &mut self.appearance_clarity,
            "hue_density" => &mut self.hue_density,
            "hue" => &mut self.hue,
            "smell_intensity" => &mut self.smell_intensity,
            "sweetness" => &mut self.sweetness,
            "sourness" => &mut self.sourness,
            "bitterness" => &mut self.bitterness,
            "astringency" => &mut self.astringency,
            "body" => &mut self.body,
            "texture" => &mut self.texture,
            "balance" => &mut self.balance,
            "finish" => &mut self.finish,
            _ => return None,
        };
        Some(value)
    }

    /// Flips the liked flag and adjusts the count. The count floors at zero.
    pub fn toggle_like(&mut self) {
        if self.liked {
            self.liked = false;
            self.likes = self.likes.saturating_sub(1);
        } else {
            self.liked = true;
            self.likes = self.likes.saturating_add(1);
        }
    }

    pub fn toggle_public(&mut self) {
        self.public = !self.public;
    }
}

fn with_text<'a>(values: &'a [String], text: &'a str) -> Vec<&'a str> {
    let mut all: Vec<&str> = values
        .iter()
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .collect();
    if !text.trim().is_empty() {
        all.push(text);
    }
    all
}

// ============================================================================
// Migration
// ============================================================================

/// Backfills fields missing from records written by older versions, and
/// repairs values of the wrong shape. Returns `None` for non-object values.
///
/// Unknown keys are left in place.
pub fn migrate_value(value: Value) -> Option<Value> {
    let Value::Object(mut map) = value else {
        return None;
    };

    match map.get("id") {
        Some(Value::String(id)) if !id.is_empty() => {}
        Some(Value::Number(num)) => {
            let id = num.to_string();
            map.insert("id".into(), Value::String(id));
        }
        _ => {
            map.insert("id".into(), Value::String(new_entry_id()));
        }
    }

    let kind_ok = map
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| t.parse::<WineType>().is_ok());
    if kind_ok {
        if let Some(Value::String(t)) = map.get_mut("type") {
            *t = t.to_ascii_lowercase();
        }
    } else {
        map.insert("type".into(), Value::String(WineType::White.to_string()));
    }

    if !has_valid_date(&map) {
        map.insert("date".into(), Value::String(Utc::now().to_rfc3339()));
    }

    let likes = match map.get("likes") {
        Some(Value::Number(num)) => num
            .as_u64()
            .or_else(|| num.as_f64().filter(|f| *f > 0.0).map(|f| f.floor() as u64))
            .unwrap_or(0),
        _ => 0,
    };
    map.insert(
        "likes".into(),
        Value::from(u32::try_from(likes).unwrap_or(u32::MAX)),
    );

    for flag in ["liked", "public"] {
        if !map.get(flag).is_some_and(Value::is_boolean) {
            map.insert(flag.into(), Value::Bool(false));
        }
    }

    for field in SINGLE_SELECT_FIELDS.iter().chain(TEXT_FIELDS.iter()) {
        match map.get(*field) {
            None | Some(Value::String(_)) => {}
            Some(Value::Null) => {
                map.remove(*field);
            }
            Some(other) => {
                let text = other.to_string();
                map.insert((*field).into(), Value::String(text));
            }
        }
    }

    for field in LIST_FIELDS {
        match map.get(field) {
            None => {}
            Some(Value::Array(items)) => {
                let strings: Vec<Value> = items
                    .iter()
                    .filter_map(|item| item.as_str().map(|s| Value::String(s.to_string())))
                    .collect();
                map.insert(field.into(), Value::Array(strings));
            }
            Some(_) => {
                map.remove(field);
            }
        }
    }

    Some(Value::Object(map))
}

fn has_valid_date(map: &Map<String, Value>) -> bool {
    map.get("date")
        .and_then(Value::as_str)
        .is_some_and(|d| DateTime::parse_from_rfc3339(d).is_ok())
}

/// True when migrating `value` would generate a fresh id or date for it.
/// Such records must be written back, or they get new ones on every load.
pub fn needs_identity_backfill(value: &Value) -> bool {
    let Value::Object(map) = value else {
        return false;
    };
    let id_ok = match map.get("id") {
        Some(Value::String(id)) => !id.is_empty(),
        Some(Value::Number(_)) => true,
        _ => false,
    };
    !id_ok || !has_valid_date(map)
}

/// Decodes a single (already migrated) value into an entry, reporting the
/// json path of any failure.
pub fn decode_entry(value: Value) -> Result<Entry> {
    match serde_path_to_error::deserialize::<_, Entry>(value) {
        Ok(mut entry) => {
            entry.normalize();
            Ok(entry)
        }
        Err(err) => Err(WinelogError::Deserialization {
            path: err.path().to_string(),
            source: err.into_inner(),
        }),
    }
}

/// Migrates and decodes stored values. Values that cannot be repaired are
/// skipped with a warning.
pub fn migrate_values(values: Vec<Value>) -> Vec<Entry> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| {
            let Some(value) = migrate_value(value) else {
                warn!(index = idx, "skipping stored entry that is not an object");
                return None;
            };
            match decode_entry(value) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(index = idx, "skipping stored entry: {err}");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_entry_has_type_specific_lists() {
        let white = Entry::new(WineType::White);
        assert_eq!(white.smell_fresh, Some(vec![]));
        assert!(white.smell_fruit_red.is_none());

        let red = Entry::new(WineType::Red);
        assert_eq!(red.palate_fruit_red, Some(vec![]));
        assert!(red.palate_fresh.is_none());
        assert_eq!(red.likes, 0);
        assert!(!red.liked && !red.public);
    }

    #[test]
    fn serialized_red_entry_omits_white_lists() {
        let entry = Entry::new(WineType::Red);
        let value = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(value["type"], "red");
        assert!(value.get("smell_fresh").is_none());
        assert!(value.get("smell_fruit_red").is_some());
    }

    #[test]
    fn like_toggle_never_goes_negative() {
        let mut entry = Entry::new(WineType::White);
        entry.liked = true;
        entry.likes = 0;
        entry.toggle_like();
        assert_eq!(entry.likes, 0);
        assert!(!entry.liked);

        entry.toggle_like();
        entry.toggle_like();
        assert_eq!(entry.likes, 0);
        assert!(!entry.liked);
    }

    #[test]
    fn migration_backfills_new_fields_and_keeps_unknown() {
        let stored = json!({
            "id": "abc",
            "type": "red",
            "date": "2024-03-01T18:30:00.000Z",
            "name": "Barolo",
            "smell_fruit_red": ["cherry"],
            "vintage": 2016
        });
        let entries = migrate_values(vec![stored]);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.likes, 0);
        assert!(!entry.liked);
        assert!(!entry.public);
        assert_eq!(entry.nose_fruit(), ["cherry".to_string()]);
        assert_eq!(entry.extra.get("vintage"), Some(&json!(2016)));

        let saved = serde_json::to_value(entry).expect("serialize");
        assert_eq!(saved["vintage"], json!(2016));
    }

    #[test]
    fn migration_repairs_bad_shapes() {
        let stored = json!({
            "type": "ROSE",
            "likes": -3,
            "liked": "yes",
            "hue": null,
            "smell_other": "floral",
            "palate_other": ["mineral", 4]
        });
        let entries = migrate_values(vec![stored, json!("not an entry")]);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert!(!entry.id.is_empty());
        assert_eq!(entry.kind, WineType::White);
        assert_eq!(entry.likes, 0);
        assert!(!entry.liked);
        assert_eq!(entry.hue, "");
        assert!(entry.smell_other.is_empty());
        assert_eq!(entry.palate_other, vec!["mineral".to_string()]);
    }

    #[test]
    fn descriptors_include_other_text() {
        let mut entry = Entry::new(WineType::White);
        entry.set_nose_fruit(vec!["citrus".into()]);
        entry.smell_other = vec!["flint".into()];
        entry.smell_other_text = "wet stone".into();
        assert_eq!(entry.nose_descriptors(), vec!["citrus", "flint", "wet stone"]);
        assert!(entry.palate_descriptors().is_empty());
    }

    #[test]
    fn wine_type_parses_case_insensitively() {
        assert_eq!("Red".parse::<WineType>().ok(), Some(WineType::Red));
        assert_eq!(WineType::White.to_string(), "white");
        assert!("rose".parse::<WineType>().is_err());
    }
}
