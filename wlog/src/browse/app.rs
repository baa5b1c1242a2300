use std::io;
use std::path::Path;

use anyhow::Result;
use crossterm::{
    event::{self, Event as TermEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend, widgets::TableState};
use tokio::runtime::Handle;
use tracing::{debug, warn};
use winelog::{form::parse_pair, prelude::*};

use super::keys::{KeyAction, map_key_with_input_mode};
use super::ui;

/// Tabs in display order. `1`..`5` jump to them.
pub const TABS: [Tab; 5] = [Tab::WhiteForm, Tab::RedForm, Tab::Logs, Tab::Public, Tab::Chat];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    None,
    Search,
    QuickAdd,
    Field,
    Import,
    Export,
    Chat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Info(String),
    Error(String),
}

/// Form being filled in on a form tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    /// Set when editing an existing entry
    pub id: Option<String>,
    pub kind: WineType,
    pub form: FormData,
    pub photo: PhotoInput,
}

impl FormState {
    fn new(id: Option<String>, kind: WineType, form: FormData) -> Self {
        Self {
            id,
            kind,
            form,
            photo: PhotoInput::Keep,
        }
    }

    /// Applies `key=value` (replace), `key+=value` (append), or `photo=PATH`.
    /// An empty value clears the field; an empty photo path removes the photo.
    fn apply(&mut self, input: &str) -> Result<()> {
        let (key, value) = parse_pair(input)?;
        if let Some(key) = key.strip_suffix('+') {
            self.form.append(key.trim(), value);
            return Ok(());
        }
        if key == "photo" {
            let path = value.trim();
            self.photo = if path.is_empty() {
                PhotoInput::Remove
            } else {
                PhotoInput::Upload(PhotoUpload::from_path(path)?)
            };
            return Ok(());
        }
        let mut next = FormData::new();
        for (k, v) in self.form.iter().filter(|(k, _)| *k != key) {
            next.append(k, v);
        }
        next.append(key, value);
        self.form = next;
        Ok(())
    }
}

/// Network access for the public and chat tabs
pub struct Remote {
    pub runtime: Handle,
    pub chat: ChatClient,
    pub public: PublicSnapshotClient,
}

pub struct Browser<S> {
    pub app: App<S>,
    pub table_state: TableState,
    pub should_quit: bool,
    pub show_help: bool,
    pub input_mode: InputMode,
    pub input_buffer: String,
    /// Byte offset of the cursor within `input_buffer`.
    pub input_cursor: usize,
    pub status: Option<Status>,
    /// Destructive event waiting for `y`
    pub pending: Option<Event>,
    pub form: Option<FormState>,
    pub public: Option<PublicSnapshot>,
    pub chat: ChatSession,
    remote: Option<Remote>,
}

impl<S: Storage> Browser<S> {
    pub fn new(app: App<S>, remote: Option<Remote>, history_turns: usize) -> Self {
        let mut browser = Self {
            app,
            table_state: TableState::default(),
            should_quit: false,
            show_help: false,
            input_mode: InputMode::None,
            input_buffer: String::new(),
            input_cursor: 0,
            status: None,
            pending: None,
            form: None,
            public: None,
            chat: ChatSession::new(history_turns),
            remote,
        };
        browser.clamp_selection();
        browser.enter_tab(browser.tab());
        browser
    }

    pub fn run(mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            original_hook(info);
        }));

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|frame| ui::draw(frame, self))?;

            if event::poll(std::time::Duration::from_millis(250))?
                && let TermEvent::Key(key) = event::read()?
            {
                let action = map_key_with_input_mode(key, self.input_mode != InputMode::None);
                self.handle_action(action);
            }

            if self.should_quit {
                return Ok(());
            }
        }
    }

    pub fn tab(&self) -> Tab {
        self.app.view().active_tab
    }

    /// Summary rows of the logs tab
    pub fn rows(&self) -> Vec<SummaryRow> {
        self.app.rows()
    }

    pub fn selected_id(&self) -> Option<String> {
        let rows = self.rows();
        self.table_state
            .selected()
            .and_then(|idx| rows.get(idx))
            .map(|row| row.id.clone())
    }

    pub(crate) fn handle_action(&mut self, action: KeyAction) {
        if self.input_mode != InputMode::None {
            self.handle_input_action(action);
            return;
        }

        if let Some(event) = self.pending.take() {
            if action == KeyAction::Confirm {
                self.dispatch(event);
            } else {
                self.info("cancelled");
            }
            return;
        }

        if self.show_help {
            match action {
                KeyAction::ToggleHelp | KeyAction::Dismiss => self.show_help = false,
                KeyAction::Quit => {
                    self.show_help = false;
                    self.should_quit = true;
                }
                _ => {}
            }
            return;
        }

        match action {
            KeyAction::Quit => self.should_quit = true,
            KeyAction::ToggleHelp => self.show_help = true,
            KeyAction::StartSearch => {
                let query = self.app.view().query.clone();
                self.start_input(InputMode::Search, query);
            }
            KeyAction::QuickAdd => self.start_input(InputMode::QuickAdd, String::new()),
            KeyAction::Import => self.start_input(InputMode::Import, String::new()),
            KeyAction::Export => self.start_input(InputMode::Export, "winelog.json".into()),
            KeyAction::CycleType => {
                let next = match self.app.view().type_filter {
                    None => Some(WineType::White),
                    Some(WineType::White) => Some(WineType::Red),
                    Some(WineType::Red) => None,
                };
                self.dispatch(Event::SetTypeFilter(next));
            }
            KeyAction::ToggleTheme => {
                self.dispatch(Event::ToggleTheme);
            }
            KeyAction::ClearAll => self.confirm(Event::ClearAll { confirmed: false }),
            KeyAction::NewEntry => self.new_entry(None),
            KeyAction::NewWhite => self.new_entry(Some(WineType::White)),
            KeyAction::NewRed => self.new_entry(Some(WineType::Red)),
            KeyAction::NextTab => self.step_tab(1),
            KeyAction::PrevTab => self.step_tab(TABS.len() - 1),
            KeyAction::JumpTab(n) => {
                if let Some(tab) = n.checked_sub(1).and_then(|idx| TABS.get(idx)) {
                    self.switch_tab(*tab);
                }
            }
            _ => match self.tab() {
                Tab::WhiteForm | Tab::RedForm => self.handle_form_action(action),
                Tab::Logs => self.handle_logs_action(action),
                Tab::Public => self.handle_public_action(action),
                Tab::Chat => self.handle_chat_action(action),
            },
        }
    }

    fn handle_logs_action(&mut self, action: KeyAction) {
        let detail = self.app.view().detail.clone();
        if let Some(id) = detail {
            match action {
                KeyAction::Dismiss | KeyAction::Activate => {
                    self.dispatch(Event::CloseDetail);
                }
                KeyAction::Edit => self.edit(id),
                KeyAction::Delete => self.confirm(Event::DeleteOpen { confirmed: false }),
                KeyAction::Like => {
                    self.dispatch(Event::ToggleLike(id));
                }
                KeyAction::Publish => {
                    self.dispatch(Event::TogglePublish(id));
                }
                _ => {}
            }
            return;
        }

        match action {
            KeyAction::MoveDown => self.move_selection(1, true),
            KeyAction::MoveUp => self.move_selection(1, false),
            KeyAction::PageDown => self.move_selection(10, true),
            KeyAction::PageUp => self.move_selection(10, false),
            KeyAction::JumpFirst => self.table_state.select(Some(0)),
            KeyAction::JumpLast => {
                let len = self.rows().len();
                self.table_state.select(len.checked_sub(1));
            }
            KeyAction::Dismiss => {
                let view = self.app.view();
                if !view.query.is_empty() || view.type_filter.is_some() {
                    self.dispatch(Event::SetQuery(String::new()));
                    self.dispatch(Event::SetTypeFilter(None));
                }
            }
            _ => {
                let Some(id) = self.selected_id() else {
                    return;
                };
                match action {
                    KeyAction::Activate => {
                        self.dispatch(Event::Open(id));
                    }
                    KeyAction::ToggleExpand => {
                        self.dispatch(Event::ToggleExpand(id));
                    }
                    KeyAction::Like => {
                        self.dispatch(Event::ToggleLike(id));
                    }
                    KeyAction::Publish => {
                        self.dispatch(Event::TogglePublish(id));
                    }
                    KeyAction::Edit => self.edit(id),
                    KeyAction::Delete => self.confirm(Event::Delete {
                        id,
                        confirmed: false,
                    }),
                    _ => {}
                }
            }
        }
    }

    fn handle_form_action(&mut self, action: KeyAction) {
        match action {
            KeyAction::AddField | KeyAction::Activate => {
                self.start_input(InputMode::Field, String::new());
            }
            KeyAction::Submit => self.submit_form(),
            KeyAction::Dismiss => {
                self.form = None;
                self.dispatch(Event::CancelEdit);
                self.switch_tab(Tab::Logs);
            }
            _ => {}
        }
    }

    fn handle_public_action(&mut self, action: KeyAction) {
        if action == KeyAction::Reload {
            self.load_public();
        }
    }

    fn handle_chat_action(&mut self, action: KeyAction) {
        match action {
            KeyAction::Activate => self.start_input(InputMode::Chat, String::new()),
            KeyAction::Delete => {
                self.chat.clear();
                self.info("chat cleared");
            }
            _ => {}
        }
    }

    fn handle_input_action(&mut self, action: KeyAction) {
        match action {
            KeyAction::Dismiss => self.end_input(),
            KeyAction::Backspace => {
                if self.input_cursor > 0 {
                    let prev = self.input_buffer[..self.input_cursor]
                        .char_indices()
                        .next_back()
                        .map_or(0, |(i, _)| i);
                    self.input_buffer.drain(prev..self.input_cursor);
                    self.input_cursor = prev;
                }
            }
            KeyAction::InputChar(c) => {
                self.input_buffer.insert(self.input_cursor, c);
                self.input_cursor += c.len_utf8();
            }
            KeyAction::CursorLeft => {
                if self.input_cursor > 0 {
                    self.input_cursor = self.input_buffer[..self.input_cursor]
                        .char_indices()
                        .next_back()
                        .map_or(0, |(i, _)| i);
                }
            }
            KeyAction::CursorRight => {
                if self.input_cursor < self.input_buffer.len() {
                    self.input_cursor += self.input_buffer[self.input_cursor..]
                        .chars()
                        .next()
                        .map_or(0, char::len_utf8);
                }
            }
            KeyAction::CursorStart => self.input_cursor = 0,
            KeyAction::CursorEnd => self.input_cursor = self.input_buffer.len(),
            KeyAction::KillToEnd => self.input_buffer.truncate(self.input_cursor),
            KeyAction::Activate => {
                let mode = self.input_mode;
                let value = std::mem::take(&mut self.input_buffer);
                self.end_input();
                self.apply_input(mode, &value);
            }
            _ => {}
        }
    }

    fn apply_input(&mut self, mode: InputMode, value: &str) {
        match mode {
            InputMode::Search => {
                self.dispatch(Event::GlobalSearch(value.trim().to_string()));
            }
            InputMode::QuickAdd => {
                let kind = self.app.preferences().last_new_type;
                self.dispatch(Event::QuickAdd {
                    name: value.to_string(),
                    kind,
                    photo: PhotoInput::Keep,
                });
            }
            InputMode::Field => {
                let result = match self.form.as_mut() {
                    Some(form) => form.apply(value),
                    None => Ok(()),
                };
                if let Err(err) = result {
                    self.error(err.to_string());
                }
            }
            InputMode::Import => self.import(value.trim()),
            InputMode::Export => self.export(value.trim()),
            InputMode::Chat => self.send_chat(value),
            InputMode::None => {}
        }
    }

    fn start_input(&mut self, mode: InputMode, initial: String) {
        self.input_mode = mode;
        self.input_cursor = initial.len();
        self.input_buffer = initial;
    }

    fn end_input(&mut self) {
        self.input_mode = InputMode::None;
        self.input_buffer.clear();
        self.input_cursor = 0;
    }

    /// Dispatches an event, showing failures in the status line
    fn dispatch(&mut self, event: Event) -> Option<Outcome> {
        let result = self.app.dispatch(event);
        self.clamp_selection();
        match result {
            Ok(outcome) => {
                debug!(?outcome, "browse outcome");
                self.show_outcome(&outcome);
                Some(outcome)
            }
            Err(err) => {
                warn!(%err, "action failed");
                self.error(err.to_string());
                None
            }
        }
    }

    fn show_outcome(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Created(id) => {
                self.form = None;
                self.info(format!("created {id}"));
            }
            Outcome::Saved(id) => {
                self.form = None;
                self.info(format!("saved {id}"));
            }
            Outcome::FormLoaded { id, kind, form } => {
                self.form = Some(FormState::new(id.clone(), *kind, form.clone()));
                self.status = None;
            }
            Outcome::Deleted(count) => self.info(format!("deleted {count}")),
            Outcome::Imported(report) => self.info(format!(
                "imported: {} added, {} replaced",
                report.added, report.replaced
            )),
            Outcome::ConfirmationRequired(_) | Outcome::Updated => {}
        }
    }

    /// Sends a destructive event unconfirmed; a prompt makes `y` send it confirmed
    fn confirm(&mut self, event: Event) {
        let confirmed = match &event {
            Event::Delete { id, .. } => Event::Delete {
                id: id.clone(),
                confirmed: true,
            },
            Event::DeleteOpen { .. } => Event::DeleteOpen { confirmed: true },
            Event::ClearAll { .. } => Event::ClearAll { confirmed: true },
            _ => event.clone(),
        };
        if let Some(Outcome::ConfirmationRequired(prompt)) = self.dispatch(event) {
            self.pending = Some(confirmed);
            self.info(format!("{prompt} (y/n)"));
        }
    }

    fn new_entry(&mut self, kind: Option<WineType>) {
        self.dispatch(Event::NewEntry(kind));
    }

    fn edit(&mut self, id: String) {
        self.dispatch(Event::Edit(id));
    }

    fn submit_form(&mut self) {
        let Some(state) = self.form.clone() else {
            return;
        };
        self.dispatch(Event::Submit {
            kind: state.kind,
            form: state.form,
            photo: state.photo,
        });
    }

    fn step_tab(&mut self, step: usize) {
        let idx = TABS.iter().position(|t| *t == self.tab()).unwrap_or(0);
        self.switch_tab(TABS[(idx + step) % TABS.len()]);
    }

    fn switch_tab(&mut self, tab: Tab) {
        if self.dispatch(Event::SwitchTab(tab)).is_some() {
            self.enter_tab(tab);
        }
    }

    /// Prepares tab content: a blank form on form tabs, the snapshot on the public tab
    fn enter_tab(&mut self, tab: Tab) {
        match tab {
            Tab::WhiteForm | Tab::RedForm => {
                let kind = if tab == Tab::WhiteForm {
                    WineType::White
                } else {
                    WineType::Red
                };
                if self.form.as_ref().is_none_or(|f| f.kind != kind) {
                    // a blank form replaces any edit of this type
                    if self.app.editing().is_some_and(|e| e.kind == kind) {
                        self.dispatch(Event::CancelEdit);
                    }
                    self.form = Some(FormState::new(None, kind, FormData::new()));
                }
            }
            Tab::Public if self.public.is_none() => self.load_public(),
            _ => {}
        }
    }

    fn load_public(&mut self) {
        let snapshot = match &self.remote {
            Some(remote) => remote.runtime.block_on(remote.public.load()),
            None => PublicSnapshot::Unavailable("offline".into()),
        };
        self.public = Some(snapshot);
    }

    fn send_chat(&mut self, text: &str) {
        let Some(remote) = &self.remote else {
            self.error("chat is not available");
            return;
        };
        let result = remote.runtime.block_on(self.chat.ask(&remote.chat, text));
        if let Err(err) = result {
            self.error(err.to_string());
        }
    }

    fn import(&mut self, path: &str) {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                self.dispatch(Event::Import { text });
            }
            Err(err) => self.error(format!("read {path}: {err}")),
        }
    }

    /// Writes the visible list; a `.csv` path selects csv
    fn export(&mut self, path: &str) {
        let entries = self.app.visible();
        let count = entries.len();
        let data = if Path::new(path)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        {
            Ok(export_csv(entries))
        } else {
            export_json(entries)
        };
        let result = data
            .map_err(anyhow::Error::from)
            .and_then(|data| std::fs::write(path, data).map_err(anyhow::Error::from));
        match result {
            Ok(()) => self.info(format!("exported {count} entries to {path}")),
            Err(err) => self.error(format!("export {path}: {err}")),
        }
    }

    fn move_selection(&mut self, amount: usize, down: bool) {
        let len = self.rows().len();
        if len == 0 {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0);
        let next = if down {
            (current + amount).min(len - 1)
        } else {
            current.saturating_sub(amount)
        };
        self.table_state.select(Some(next));
    }

    fn clamp_selection(&mut self) {
        let len = self.rows().len();
        let selected = match (self.table_state.selected(), len) {
            (_, 0) => None,
            (Some(idx), _) => Some(idx.min(len - 1)),
            (None, _) => Some(0),
        };
        self.table_state.select(selected);
    }

    fn info(&mut self, message: impl Into<String>) {
        self.status = Some(Status::Info(message.into()));
    }

    fn error(&mut self, message: impl Into<String>) {
        self.status = Some(Status::Error(message.into()));
    }
}
