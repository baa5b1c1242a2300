//! Persistent key-value storage
//!
//! [`Storage`] is a small string key-value interface. [`FileStorage`] keeps
//! all keys in one json object file and enforces a byte quota;
//! [`MemoryStorage`] is used in tests and for throwaway sessions.
//!
//! [`EntryStore`] layers the entry collection and the user preferences on top
//! of any `Storage`:
//!
//! - `load()` never fails. Missing or malformed data is an empty collection.
//!   `load_repaired()` also persists ids and dates generated by migration.
//! - `save()` rewrites the whole collection. There is no partial write.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde_json::Value;
use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    Result,
    constants::{ENTRIES_KEY, LAST_NEW_TYPE_KEY, LAST_TAB_KEY, THEME_KEY},
    entry::{Entry, WineType, migrate_values, needs_identity_backfill},
    error::{IoSnafu, SerializationSnafu},
};

/// String key-value storage
pub trait Storage {
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`. Fails without changing anything when the
    /// write cannot be completed.
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;

    fn remove_item(&mut self, key: &str) -> Result<()>;
}

fn check_quota(key: &str, needed: u64, quota: u64) -> Result<()> {
    ensure!(
        quota == 0 || needed <= quota,
        crate::error::StorageFullSnafu {
            key: key.to_string(),
            needed,
            quota,
        }
    );
    Ok(())
}

/// In-memory storage with an optional quota (sum of key and value lengths)
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: BTreeMap<String, String>,
    quota: u64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes once keys and values exceed `quota` bytes
    pub fn with_quota(quota: u64) -> Self {
        Self {
            items: BTreeMap::new(),
            quota,
        }
    }

    fn used_without(&self, key: &str) -> u64 {
        self.items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        let needed = self.used_without(key) + (key.len() + value.len()) as u64;
        check_quota(key, needed, self.quota)?;
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.items.remove(key);
        Ok(())
    }
}

/// Storage backed by a single json file of `key -> string`.
///
/// The file is read once at open. Each write serializes the whole map to a
/// temporary file next to the target and renames it into place.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
    quota: u64,
    items: BTreeMap<String, String>,
}

impl FileStorage {
    /// Opens the storage file. A missing file is empty storage; an unreadable
    /// or malformed file is logged and treated as empty.
    pub fn open(path: impl AsRef<Path>, quota: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let items = match fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|err| {
                warn!(path = %path.display(), "storage file is malformed, starting empty: {err}");
                BTreeMap::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                warn!(path = %path.display(), "storage file unreadable, starting empty: {err}");
                BTreeMap::new()
            }
        };
        debug!(path = %path.display(), keys = items.len(), "opened storage");
        Ok(Self { path, quota, items })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_items(&self, key: &str, items: &BTreeMap<String, String>) -> Result<()> {
        let data = serde_json::to_string(items).context(SerializationSnafu)?;
        check_quota(key, data.len() as u64, self.quota)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context(IoSnafu { path: parent })?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data).context(IoSnafu { path: &tmp })?;
        fs::rename(&tmp, &self.path).context(IoSnafu { path: &self.path })?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        let mut next = self.items.clone();
        next.insert(key.to_string(), value.to_string());
        self.write_items(key, &next)?;
        self.items = next;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        if !self.items.contains_key(key) {
            return Ok(());
        }
        let mut next = self.items.clone();
        next.remove(key);
        self.write_items(key, &next)?;
        self.items = next;
        Ok(())
    }
}

/// Color theme preference
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Top-level views. The string forms are the stored tab ids.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString,
)]
pub enum Tab {
    #[default]
    #[strum(serialize = "whiteForm")]
    WhiteForm,
    #[strum(serialize = "redForm")]
    RedForm,
    #[strum(serialize = "logsView")]
    Logs,
    #[strum(serialize = "publicView")]
    Public,
    #[strum(serialize = "chatView")]
    Chat,
}

impl Tab {
    /// Form tab for a wine type
    pub fn form_for(kind: WineType) -> Self {
        match kind {
            WineType::White => Self::WhiteForm,
            WineType::Red => Self::RedForm,
        }
    }
}

/// Stored user preferences
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Preferences {
    pub theme: Theme,
    pub last_tab: Tab,
    pub last_new_type: WineType,
}

/// Entry collection and preferences on top of a [`Storage`]
#[derive(Debug, Clone)]
pub struct EntryStore<S> {
    storage: S,
}

impl<S: Storage> EntryStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    /// Loads the collection, migrating records written by older versions.
    /// Never fails: unreadable or malformed data is an empty collection.
    pub fn load(&self) -> Vec<Entry> {
        self.load_migrated().0
    }

    /// Like [`load`](Self::load), and writes the collection back when
    /// migration generated an id or date, so those stay the same on the next
    /// load. A failed write is logged and the loaded entries are returned.
    pub fn load_repaired(&mut self) -> Vec<Entry> {
        let (entries, backfilled) = self.load_migrated();
        if backfilled {
            match self.save(&entries) {
                Ok(()) => info!(count = entries.len(), "saved backfilled entry ids"),
                Err(err) => warn!("saving backfilled entries failed: {err}"),
            }
        }
        entries
    }

    fn load_migrated(&self) -> (Vec<Entry>, bool) {
        let raw = match self.storage.get_item(ENTRIES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return (Vec::new(), false),
            Err(err) => {
                warn!("reading entries failed, starting empty: {err}");
                return (Vec::new(), false);
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(values)) => {
                let backfilled = values.iter().any(needs_identity_backfill);
                (migrate_values(values), backfilled)
            }
            Ok(_) => {
                warn!("stored entries are not an array, starting empty");
                (Vec::new(), false)
            }
            Err(err) => {
                warn!("stored entries are malformed, starting empty: {err}");
                (Vec::new(), false)
            }
        }
    }

    /// Serializes and overwrites the whole collection.
    pub fn save(&mut self, entries: &[Entry]) -> Result<()> {
        let data = serde_json::to_string(entries).context(SerializationSnafu)?;
        self.storage.set_item(ENTRIES_KEY, &data)?;
        debug!(count = entries.len(), bytes = data.len(), "saved entries");
        Ok(())
    }

    pub fn preferences(&self) -> Preferences {
        Preferences {
            theme: self.read_parsed(THEME_KEY).unwrap_or_default(),
            last_tab: self.read_parsed(LAST_TAB_KEY).unwrap_or_default(),
            last_new_type: self.read_parsed(LAST_NEW_TYPE_KEY).unwrap_or_default(),
        }
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.storage.set_item(THEME_KEY, &theme.to_string())
    }

    pub fn set_last_tab(&mut self, tab: Tab) -> Result<()> {
        self.storage.set_item(LAST_TAB_KEY, &tab.to_string())
    }

    pub fn set_last_new_type(&mut self, kind: WineType) -> Result<()> {
        self.storage.set_item(LAST_NEW_TYPE_KEY, &kind.to_string())
    }

    fn read_parsed<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.storage
            .get_item(key)
            .ok()
            .flatten()
            .and_then(|value| value.parse().ok())
    }
}
