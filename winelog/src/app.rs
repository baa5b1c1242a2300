//! # Application state and dispatch
//!
//! [`App`] owns the storage, the in-memory collection and the view state.
//! Every user action is an [`Event`] passed to [`App::dispatch`].
//!
//! Mutations of the collection are computed on a copy, saved, and committed
//! only when the save succeeds. A failed save (for example a full storage)
//! leaves both storage and memory as they were.
//!
//! Preference writes that follow a committed mutation (the tab a submit
//! switches to, the type of a quick-added entry) are best-effort: a failure
//! is logged and the mutation's outcome is still returned.
//!
//! Destructive events carry a `confirmed` flag. Unconfirmed, they return
//! [`Outcome::ConfirmationRequired`] with the prompt to show, and change
//! nothing.

use std::collections::HashSet;

use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    Result,
    entry::{Entry, WineType},
    error::{NotFoundSnafu, ValidationSnafu},
    form::{FormData, PhotoInput, apply_edit, collect, fill_form},
    store::{EntryStore, Preferences, Storage, Tab, Theme},
    transfer::{MergeReport, merge_import, parse_import},
    view::{Counts, ListFilter, SummaryRow, rows, title, visible},
};

/// Message for a quick-add without a name
pub const QUICK_ADD_NAME_REQUIRED: &str = "Please enter a name";

/// Transient ui state. Only the active tab and theme are persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    /// Logs search text
    pub query: String,
    /// Type chip
    pub type_filter: Option<WineType>,
    /// Ids of rows showing their inline preview
    pub expanded: HashSet<String>,
    pub active_tab: Tab,
    /// Id of the entry loaded into a form for editing. Only the form of that
    /// entry's type is in edit mode.
    pub editing: Option<String>,
    /// Id of the entry shown in the detail view
    pub detail: Option<String>,
    pub theme: Theme,
}

impl ViewState {
    pub fn filter(&self) -> ListFilter {
        ListFilter::new(self.query.clone(), self.type_filter)
    }

    fn forget(&mut self, id: &str) {
        self.expanded.remove(id);
        if self.editing.as_deref() == Some(id) {
            self.editing = None;
        }
        if self.detail.as_deref() == Some(id) {
            self.detail = None;
        }
    }
}

/// User actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Submit a tasting form. Updates the entry being edited when it has the
    /// same type as the form, otherwise creates a new entry.
    Submit {
        kind: WineType,
        form: FormData,
        photo: PhotoInput,
    },
    /// Create an entry with only a name, type and optional photo, then open
    /// it for editing
    QuickAdd {
        name: String,
        kind: WineType,
        photo: PhotoInput,
    },
    /// Open an empty form. `None` uses the last chosen type; `Some` also
    /// remembers the choice.
    NewEntry(Option<WineType>),
    /// Load an entry into its form
    Edit(String),
    CancelEdit,
    /// Show the detail view of an entry
    Open(String),
    CloseDetail,
    Delete {
        id: String,
        confirmed: bool,
    },
    /// Delete the entry shown in the detail view
    DeleteOpen {
        confirmed: bool,
    },
    ClearAll {
        confirmed: bool,
    },
    ToggleLike(String),
    TogglePublish(String),
    /// Show or hide the inline preview of a row
    ToggleExpand(String),
    SetQuery(String),
    /// Set the logs query and switch to the logs tab
    GlobalSearch(String),
    SetTypeFilter(Option<WineType>),
    SwitchTab(Tab),
    ToggleTheme,
    /// Merge an exported json array into the collection
    Import {
        text: String,
    },
}

/// Result of a dispatched event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// State changed; re-render
    Updated,
    /// New entry with this id
    Created(String),
    /// Existing entry updated from a form
    Saved(String),
    /// A form should be shown with these values. `id` is set when editing.
    FormLoaded {
        id: Option<String>,
        kind: WineType,
        form: FormData,
    },
    /// Number of entries removed
    Deleted(usize),
    /// Nothing changed. Ask the user, then re-send with `confirmed: true`.
    ConfirmationRequired(String),
    Imported(MergeReport),
}

/// Application state
#[derive(Debug)]
pub struct App<S> {
    store: EntryStore<S>,
    entries: Vec<Entry>,
    prefs: Preferences,
    view: ViewState,
}

impl<S: Storage> App<S> {
    /// Loads the collection and preferences from `storage`
    pub fn new(storage: S) -> Self {
        let mut store = EntryStore::new(storage);
        let entries = store.load_repaired();
        let prefs = store.preferences();
        debug!(count = entries.len(), ?prefs, "app loaded");
        let view = ViewState {
            active_tab: prefs.last_tab,
            theme: prefs.theme,
            ..ViewState::default()
        };
        Self {
            store,
            entries,
            prefs,
            view,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn preferences(&self) -> Preferences {
        self.prefs
    }

    pub fn storage(&self) -> &S {
        self.store.storage()
    }

    /// Entries matching the current query and type chip, newest first
    pub fn visible(&self) -> Vec<&Entry> {
        visible(&self.entries, &self.view.filter())
    }

    /// Summary rows for [`visible`](Self::visible)
    pub fn rows(&self) -> Vec<SummaryRow> {
        rows(&self.entries, &self.view.filter())
    }

    pub fn counts(&self) -> Counts {
        Counts::of(&self.entries)
    }

    /// Entry shown in the detail view
    pub fn detail(&self) -> Option<&Entry> {
        self.view.detail.as_deref().and_then(|id| self.get(id))
    }

    /// Entry loaded into a form for editing
    pub fn editing(&self) -> Option<&Entry> {
        self.view.editing.as_deref().and_then(|id| self.get(id))
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.view.expanded.contains(id)
    }

    pub fn dispatch(&mut self, event: Event) -> Result<Outcome> {
        debug!(?event, "dispatch");
        match event {
            Event::Submit { kind, form, photo } => self.submit(kind, &form, &photo),
            Event::QuickAdd { name, kind, photo } => self.quick_add(&name, kind, &photo),
            Event::NewEntry(kind) => self.new_entry(kind),
            Event::Edit(id) => self.edit(&id),
            Event::CancelEdit => {
                self.view.editing = None;
                Ok(Outcome::Updated)
            }
            Event::Open(id) => {
                self.require(&id)?;
                self.view.detail = Some(id);
                Ok(Outcome::Updated)
            }
            Event::CloseDetail => {
                self.view.detail = None;
                Ok(Outcome::Updated)
            }
            Event::Delete { id, confirmed } => self.delete(&id, confirmed),
            Event::DeleteOpen { confirmed } => {
                let id = self.view.detail.clone().context(ValidationSnafu {
                    message: "no entry is open",
                })?;
                self.delete(&id, confirmed)
            }
            Event::ClearAll { confirmed } => self.clear_all(confirmed),
            Event::ToggleLike(id) => self.update(&id, Entry::toggle_like),
            Event::TogglePublish(id) => self.update(&id, Entry::toggle_public),
            Event::ToggleExpand(id) => {
                if !self.view.expanded.remove(&id) {
                    self.view.expanded.insert(id);
                }
                Ok(Outcome::Updated)
            }
            Event::SetQuery(query) => {
                self.view.query = query;
                Ok(Outcome::Updated)
            }
            Event::GlobalSearch(query) => {
                self.switch_tab(Tab::Logs)?;
                self.view.query = query;
                Ok(Outcome::Updated)
            }
            Event::SetTypeFilter(kind) => {
                self.view.type_filter = kind;
                Ok(Outcome::Updated)
            }
            Event::SwitchTab(tab) => {
                self.switch_tab(tab)?;
                Ok(Outcome::Updated)
            }
            Event::ToggleTheme => {
                let theme = self.view.theme.toggled();
                self.store.set_theme(theme)?;
                self.prefs.theme = theme;
                self.view.theme = theme;
                Ok(Outcome::Updated)
            }
            Event::Import { text } => self.import(&text),
        }
    }

    /// Saves `next` and, if that succeeds, makes it the collection
    fn commit(&mut self, next: Vec<Entry>) -> Result<()> {
        self.store.save(&next)?;
        self.entries = next;
        Ok(())
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.id == id)
            .context(NotFoundSnafu { id })
    }

    fn require(&self, id: &str) -> Result<&Entry> {
        self.get(id).context(NotFoundSnafu { id })
    }

    fn switch_tab(&mut self, tab: Tab) -> Result<()> {
        if self.view.active_tab != tab {
            self.store.set_last_tab(tab)?;
            self.prefs.last_tab = tab;
            self.view.active_tab = tab;
        }
        Ok(())
    }

    /// Switches tab after a committed mutation. A failed preference write
    /// does not undo the mutation, so it is only logged.
    fn switch_tab_after_commit(&mut self, tab: Tab) {
        if let Err(err) = self.switch_tab(tab) {
            warn!(?tab, "saving last tab failed: {err}");
            self.view.active_tab = tab;
        }
    }

    fn submit(&mut self, kind: WineType, form: &FormData, photo: &PhotoInput) -> Result<Outcome> {
        let mut next = self.entries.clone();
        let editing = match self.view.editing.as_deref() {
            Some(id) => {
                let idx = self.position(id)?;
                (self.entries[idx].kind == kind).then_some(idx)
            }
            None => None,
        };
        let outcome = if let Some(idx) = editing {
            let existing = &next[idx];
            let collected = collect(form, kind, photo);
            let merged = apply_edit(existing, collected, photo);
            let id = merged.id.clone();
            next[idx] = merged;
            Outcome::Saved(id)
        } else {
            let entry = collect(form, kind, photo);
            let id = entry.id.clone();
            next.push(entry);
            Outcome::Created(id)
        };
        self.commit(next)?;
        if editing.is_some() {
            self.view.editing = None;
        }
        self.switch_tab_after_commit(Tab::Logs);
        info!(?outcome, "entry submitted");
        Ok(outcome)
    }

    fn quick_add(&mut self, name: &str, kind: WineType, photo: &PhotoInput) -> Result<Outcome> {
        let name = name.trim();
        ensure!(
            !name.is_empty(),
            ValidationSnafu {
                message: QUICK_ADD_NAME_REQUIRED,
            }
        );
        let mut form = FormData::new();
        form.set("name", name);
        let entry = collect(&form, kind, photo);
        let id = entry.id.clone();

        let mut next = self.entries.clone();
        next.push(entry);
        self.commit(next)?;
        info!(id, "quick-add");
        if let Err(err) = self.store.set_last_new_type(kind) {
            warn!(?kind, "saving last new type failed: {err}");
        }
        self.prefs.last_new_type = kind;
        self.switch_tab_after_commit(Tab::form_for(kind));
        self.open_form(&id)
    }

    fn new_entry(&mut self, kind: Option<WineType>) -> Result<Outcome> {
        let kind = match kind {
            Some(kind) => {
                self.store.set_last_new_type(kind)?;
                self.prefs.last_new_type = kind;
                kind
            }
            None => self.prefs.last_new_type,
        };
        self.switch_tab(Tab::form_for(kind))?;
        self.view.editing = None;
        Ok(Outcome::FormLoaded {
            id: None,
            kind,
            form: FormData::new(),
        })
    }

    fn edit(&mut self, id: &str) -> Result<Outcome> {
        let kind = self.require(id)?.kind;
        self.switch_tab(Tab::form_for(kind))?;
        self.open_form(id)
    }

    /// Loads an entry into its form and marks it as being edited
    fn open_form(&mut self, id: &str) -> Result<Outcome> {
        let entry = self.require(id)?;
        let kind = entry.kind;
        let form = fill_form(entry);
        self.view.editing = Some(id.to_string());
        self.view.detail = None;
        Ok(Outcome::FormLoaded {
            id: Some(id.to_string()),
            kind,
            form,
        })
    }

    fn delete(&mut self, id: &str, confirmed: bool) -> Result<Outcome> {
        let idx = self.position(id)?;
        if !confirmed {
            let prompt = format!("Delete \"{}\"?", title(&self.entries[idx]));
            return Ok(Outcome::ConfirmationRequired(prompt));
        }
        let mut next = self.entries.clone();
        next.remove(idx);
        self.commit(next)?;
        self.view.forget(id);
        info!(id, "entry deleted");
        Ok(Outcome::Deleted(1))
    }

    fn clear_all(&mut self, confirmed: bool) -> Result<Outcome> {
        let count = self.entries.len();
        if !confirmed {
            return Ok(Outcome::ConfirmationRequired(format!(
                "Delete all {count} entries? This cannot be undone."
            )));
        }
        self.commit(Vec::new())?;
        self.view.expanded.clear();
        self.view.editing = None;
        self.view.detail = None;
        info!(count, "all entries deleted");
        Ok(Outcome::Deleted(count))
    }

    fn update(&mut self, id: &str, change: impl FnOnce(&mut Entry)) -> Result<Outcome> {
        let idx = self.position(id)?;
        let mut next = self.entries.clone();
        change(&mut next[idx]);
        self.commit(next)?;
        Ok(Outcome::Updated)
    }

    fn import(&mut self, text: &str) -> Result<Outcome> {
        let imported = parse_import(text)?;
        let mut next = self.entries.clone();
        let report = merge_import(&mut next, imported);
        self.commit(next)?;
        info!(added = report.added, replaced = report.replaced, "import merged");
        Ok(Outcome::Imported(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::WinelogError, store::MemoryStorage};

    fn app() -> App<MemoryStorage> {
        App::new(MemoryStorage::new())
    }

    fn created(outcome: Outcome) -> String {
        match outcome {
            Outcome::Created(id) => id,
            other => panic!("expected Created, got {other:?}"),
        }
    }

    fn add(app: &mut App<MemoryStorage>, name: &str, kind: WineType) -> String {
        let mut form = FormData::new();
        form.set("name", name);
        created(
            app.dispatch(Event::Submit {
                kind,
                form,
                photo: PhotoInput::Keep,
            })
            .expect("submit"),
        )
    }

    #[test]
    fn submit_creates_and_switches_to_logs() {
        let mut app = app();
        let id = add(&mut app, "Chablis", WineType::White);
        assert_eq!(app.entries().len(), 1);
        assert_eq!(app.view().active_tab, Tab::Logs);
        assert_eq!(app.preferences().last_tab, Tab::Logs);
        assert!(app.get(&id).is_some());
    }

    #[test]
    fn quick_add_requires_name_and_opens_editor() {
        let mut app = app();
        let err = app
            .dispatch(Event::QuickAdd {
                name: "  ".into(),
                kind: WineType::Red,
                photo: PhotoInput::Keep,
            })
            .expect_err("empty name");
        assert!(matches!(err, WinelogError::Validation { ref message } if message == QUICK_ADD_NAME_REQUIRED));
        assert!(app.entries().is_empty());

        let outcome = app
            .dispatch(Event::QuickAdd {
                name: "Barolo".into(),
                kind: WineType::Red,
                photo: PhotoInput::Keep,
            })
            .expect("quick add");
        let Outcome::FormLoaded { id, kind, form } = outcome else {
            panic!("expected FormLoaded");
        };
        assert_eq!(kind, WineType::Red);
        assert_eq!(form.get("name"), Some("Barolo"));
        assert_eq!(app.view().editing, id);
        assert_eq!(app.view().active_tab, Tab::RedForm);
    }

    #[test]
    fn edit_then_submit_updates_in_place() {
        let mut app = app();
        let id = add(&mut app, "Sancerre", WineType::White);
        app.dispatch(Event::ToggleLike(id.clone())).expect("like");
        app.dispatch(Event::Edit(id.clone())).expect("edit");

        let mut form = FormData::new();
        form.set("name", "Sancerre 2022").set("finish", "long");
        let outcome = app
            .dispatch(Event::Submit {
                kind: WineType::White,
                form,
                photo: PhotoInput::Keep,
            })
            .expect("submit");
        assert_eq!(outcome, Outcome::Saved(id.clone()));
        assert_eq!(app.entries().len(), 1);
        let entry = app.get(&id).expect("entry");
        assert_eq!(entry.name, "Sancerre 2022");
        assert_eq!(entry.likes, 1);
        assert!(entry.liked);
        assert!(app.view().editing.is_none());
    }

    #[test]
    fn other_form_submit_creates_new_entry_while_editing() {
        let mut app = app();
        let mut form = FormData::new();
        form.set("name", "Soave").set("hue", "straw");
        let soave = created(
            app.dispatch(Event::Submit {
                kind: WineType::White,
                form,
                photo: PhotoInput::Keep,
            })
            .expect("submit white"),
        );
        app.dispatch(Event::Edit(soave.clone())).expect("edit");
        app.dispatch(Event::SwitchTab(Tab::RedForm)).expect("tab");

        let mut form = FormData::new();
        form.set("name", "Barolo").set("smell_fruit_red", "cherry");
        let barolo = created(
            app.dispatch(Event::Submit {
                kind: WineType::Red,
                form,
                photo: PhotoInput::Keep,
            })
            .expect("submit red"),
        );
        assert_eq!(app.entries().len(), 2);
        let white = app.get(&soave).expect("white");
        assert_eq!(white.name, "Soave");
        assert_eq!(white.hue, "straw");
        let red = app.get(&barolo).expect("red");
        assert_eq!(red.kind, WineType::Red);
        assert_eq!(red.smell_fruit_red.as_deref(), Some(&["cherry".to_string()][..]));
        assert_eq!(app.view().editing.as_deref(), Some(soave.as_str()));
    }

    /// Memory storage whose preference keys are always full
    #[derive(Debug, Clone, Default)]
    struct FullPrefs(MemoryStorage);

    impl Storage for FullPrefs {
        fn get_item(&self, key: &str) -> Result<Option<String>> {
            self.0.get_item(key)
        }

        fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
            if key == crate::constants::ENTRIES_KEY {
                self.0.set_item(key, value)
            } else {
                Err(WinelogError::StorageFull {
                    key: key.to_string(),
                    needed: (key.len() + value.len()) as u64,
                    quota: 0,
                })
            }
        }

        fn remove_item(&mut self, key: &str) -> Result<()> {
            self.0.remove_item(key)
        }
    }

    #[test]
    fn saved_entry_survives_failed_preference_write() {
        let mut app = App::new(FullPrefs::default());
        let mut form = FormData::new();
        form.set("name", "Muscadet");
        let outcome = app
            .dispatch(Event::Submit {
                kind: WineType::White,
                form,
                photo: PhotoInput::Keep,
            })
            .expect("entry saved despite full preferences");
        assert!(matches!(outcome, Outcome::Created(_)));
        assert_eq!(app.entries().len(), 1);
        assert_eq!(app.view().active_tab, Tab::Logs);
        assert!(app.view().editing.is_none());
        assert_eq!(App::new(app.storage().clone()).entries().len(), 1);

        let outcome = app
            .dispatch(Event::QuickAdd {
                name: "Barbera".into(),
                kind: WineType::Red,
                photo: PhotoInput::Keep,
            })
            .expect("quick add");
        assert!(matches!(outcome, Outcome::FormLoaded { kind: WineType::Red, .. }));
        assert_eq!(app.entries().len(), 2);
        assert!(app.editing().is_some());
    }

    #[test]
    fn quick_add_remembers_type() {
        let mut app = app();
        app.dispatch(Event::QuickAdd {
            name: "Barolo".into(),
            kind: WineType::Red,
            photo: PhotoInput::Keep,
        })
        .expect("quick add");
        assert_eq!(app.preferences().last_new_type, WineType::Red);

        let mut reloaded = App::new(app.storage().clone());
        let outcome = reloaded.dispatch(Event::NewEntry(None)).expect("new");
        assert!(matches!(outcome, Outcome::FormLoaded { kind: WineType::Red, .. }));
    }

    #[test]
    fn loading_twice_keeps_backfilled_ids() {
        let mut storage = MemoryStorage::new();
        storage
            .set_item(crate::constants::ENTRIES_KEY, r#"[{"type":"red","name":"Old"}]"#)
            .expect("seed");
        let first = App::new(storage);
        let id = first.entries()[0].id.clone();
        let second = App::new(first.storage().clone());
        assert_eq!(second.entries()[0].id, id);
        assert!(App::new(second.storage().clone()).get(&id).is_some());
    }

    #[test]
    fn delete_requires_confirmation() {
        let mut app = app();
        let id = add(&mut app, "Rioja", WineType::Red);
        let outcome = app
            .dispatch(Event::Delete {
                id: id.clone(),
                confirmed: false,
            })
            .expect("delete");
        assert_eq!(outcome, Outcome::ConfirmationRequired("Delete \"Rioja\"?".into()));
        assert_eq!(app.entries().len(), 1);

        app.dispatch(Event::Open(id.clone())).expect("open");
        let outcome = app
            .dispatch(Event::DeleteOpen { confirmed: true })
            .expect("delete open");
        assert_eq!(outcome, Outcome::Deleted(1));
        assert!(app.entries().is_empty());
        assert!(app.view().detail.is_none());
    }

    #[test]
    fn missing_id_is_not_found() {
        let mut app = app();
        assert!(matches!(
            app.dispatch(Event::ToggleLike("nope".into())),
            Err(WinelogError::NotFound { .. })
        ));
    }

    #[test]
    fn new_entry_uses_and_remembers_last_type() {
        let mut app = app();
        let outcome = app.dispatch(Event::NewEntry(None)).expect("new");
        assert!(matches!(outcome, Outcome::FormLoaded { kind: WineType::White, .. }));

        app.dispatch(Event::NewEntry(Some(WineType::Red))).expect("new red");
        assert_eq!(app.preferences().last_new_type, WineType::Red);
        let outcome = app.dispatch(Event::NewEntry(None)).expect("new");
        assert!(matches!(outcome, Outcome::FormLoaded { kind: WineType::Red, .. }));
        assert_eq!(app.view().active_tab, Tab::RedForm);
    }

    #[test]
    fn global_search_switches_to_logs() {
        let mut app = app();
        app.dispatch(Event::GlobalSearch("chab".into())).expect("search");
        assert_eq!(app.view().query, "chab");
        assert_eq!(app.view().active_tab, Tab::Logs);
    }

    #[test]
    fn theme_toggle_is_persisted() {
        let mut app = app();
        app.dispatch(Event::ToggleTheme).expect("toggle");
        let reloaded = App::new(app.storage().clone());
        assert_eq!(reloaded.view().theme, Theme::Dark);
    }

    #[test]
    fn expand_toggles() {
        let mut app = app();
        let id = add(&mut app, "Vouvray", WineType::White);
        app.dispatch(Event::ToggleExpand(id.clone())).expect("expand");
        assert!(app.is_expanded(&id));
        app.dispatch(Event::ToggleExpand(id.clone())).expect("collapse");
        assert!(!app.is_expanded(&id));
    }
}
