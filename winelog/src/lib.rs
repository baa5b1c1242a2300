/*
 * winelog - personal wine tasting log
 *
 * SPDX-FileCopyrightText: 2025-2026 Steve Schoettler
 * SPDX-License-Identifier: Apache-2.0
 */
//! # winelog
//!
//! Library for a personal wine tasting log.
//!
//! ## Features
//!
//! - structured tasting entries for white and red wines
//! - local key-value storage with load-time migration
//! - form collection with photo downscaling
//! - searchable, filterable list and detail views
//! - JSON and CSV export, JSON import with merge by id
//! - public snapshot export and loading
//! - chat assist backed by a remote text-generation endpoint
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use winelog::prelude::*;
//! # fn example() -> Result<(), WinelogError> {
//!
//! let config = Config::default();
//! let storage = FileStorage::open(&config.storage_path, config.storage_quota)?;
//! let mut app = App::new(storage);
//!
//! let mut form = FormData::new();
//! form.set("name", "Chablis").set("hue", "pale straw");
//! form.append("smell_fresh", "citrus");
//! app.dispatch(Event::Submit {
//!     kind: WineType::White,
//!     form,
//!     photo: PhotoInput::Keep,
//! })?;
//!
//! for row in app.rows() {
//!     println!("{} {}", row.title, row.meta);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Structure
//!
//! All mutation goes through [`App::dispatch`](app::App::dispatch) with an
//! [`Event`](app::Event). A mutation is computed on a copy of the collection,
//! persisted, and only then committed, so a failed write never leaves the
//! in-memory collection ahead of storage.
//!
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]
#![warn(clippy::default_trait_access)]
#![warn(clippy::doc_markdown)]
#![warn(clippy::explicit_iter_loop)]
#![warn(clippy::future_not_send)]
#![warn(clippy::implicit_clone)]
#![warn(clippy::match_same_arms)]
#![warn(clippy::option_if_let_else)]
#![warn(clippy::redundant_clone)]
#![warn(clippy::ref_option)]
#![warn(clippy::redundant_closure)]
#![warn(clippy::uninlined_format_args)]
#![warn(clippy::unnecessary_wraps)]
#![warn(clippy::unused_async)]

pub mod app;
pub mod chat;
pub mod config;
pub mod entry;
pub mod error;
pub mod form;
mod http_client;
pub mod photo;
pub mod snapshot;
pub mod store;
pub mod transfer;
pub mod view;

/// Result type alias using `WinelogError` as the default error.
pub type Result<T, E = crate::error::WinelogError> = std::result::Result<T, E>;

/// Prelude module - import the commonly used types with `use winelog::prelude::*;`
pub mod prelude {
    pub use crate::error::*;
    pub use crate::{
        // Application state and dispatch
        app::{App, Event, Outcome, ViewState},
        // Chat assist
        chat::{ChatClient, ChatRequest, ChatRole, ChatSession, ChatState, ChatTurn},
        // Configuration
        config::{ChatConfig, Config},
        // Entries
        entry::{Entry, WineType, migrate_values, new_entry_id},
        // Forms
        form::{FormData, PhotoInput, PhotoUpload, apply_edit, collect, fill_form},
        // Photos
        photo::{ShrinkOptions, data_url_from_bytes, shrink_data_url},
        // Public snapshot
        snapshot::{PublicSnapshot, PublicSnapshotClient},
        // Storage
        store::{
            EntryStore, FileStorage, MemoryStorage, Preferences, Storage, Tab, Theme,
        },
        // Export / import
        transfer::{
            CSV_COLUMNS, MergeReport, PUBLIC_SNAPSHOT_FILE, export_csv, export_json,
            export_public, merge_import, parse_import,
        },
        // Views
        view::{Counts, Field, ListFilter, SummaryRow, short_meta, visible},
    };
}

// ============================================================================
// CONSTANTS
// ============================================================================

pub(crate) mod constants {
    /// Key holding the JSON array of entries
    pub const ENTRIES_KEY: &str = "wineLog.entries.v1";

    /// Key holding the theme preference (`light` or `dark`)
    pub const THEME_KEY: &str = "wineLog.theme";

    /// Key holding the last type chosen for a new entry
    pub const LAST_NEW_TYPE_KEY: &str = "wineLog.lastNewType";

    /// Key holding the last active tab
    pub const LAST_TAB_KEY: &str = "wineLog.lastTab";

    /// Environment variable overriding the data directory
    pub const DATA_DIR_ENV: &str = "WINELOG_DATA_DIR";

    /// Environment variable for the chat endpoint url
    pub const CHAT_URL_ENV: &str = "WINELOG_CHAT_URL";

    /// Environment variable for the chat api key
    pub const CHAT_KEY_ENV: &str = "WINELOG_CHAT_KEY";

    /// Environment variable for the public snapshot base url
    pub const PUBLIC_URL_ENV: &str = "WINELOG_PUBLIC_URL";

    /// Default chat proxy endpoint
    pub const DEFAULT_CHAT_URL: &str = "http://127.0.0.1:8787/api/chat";

    /// Default base url for the public snapshot (static hosting)
    pub const DEFAULT_PUBLIC_URL: &str = "http://127.0.0.1:8080";

    /// Storage capacity, matching the common 5 MiB browser quota.
    pub const DEFAULT_STORAGE_QUOTA: u64 = 5 * 1024 * 1024;

    /// Number of most recent transcript turns forwarded to the chat endpoint
    pub const DEFAULT_HISTORY_TURNS: usize = 12;
}
