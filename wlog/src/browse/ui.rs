use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap},
};
use winelog::{
    entry::SINGLE_SELECT_FIELDS,
    prelude::*,
    view::{detail_fields, detail_heading, preview_fields},
};

use super::app::{Browser, InputMode, Status, TABS};

const HELP_TEXT: &[(&str, &str)] = &[
    ("j / Down", "Move down"),
    ("k / Up", "Move up"),
    ("g / G", "Jump to first / last"),
    ("Tab / ]", "Next tab"),
    ("BackTab / [", "Prev tab"),
    ("1..5", "Jump to tab"),
    ("/", "Search logs"),
    ("f", "Cycle type filter"),
    ("Enter", "Open entry / add field / chat"),
    ("Space", "Expand preview"),
    ("l / p", "Like / publish"),
    ("e", "Edit entry"),
    ("d", "Delete entry (chat: clear)"),
    ("D", "Delete all entries"),
    ("n / W / R", "New entry: last / white / red"),
    ("a", "Quick add by name"),
    ("Ctrl-s", "Save form"),
    ("i / x", "Import / export file"),
    ("r", "Reload public snapshot"),
    ("t", "Toggle theme"),
    ("Esc", "Clear filters / close / cancel"),
    ("?", "Toggle help"),
    ("q", "Quit"),
];

/// Colors for the active theme
struct Palette {
    accent: Color,
    label: Color,
    muted: Color,
    bar_bg: Color,
    bar_fg: Color,
}

impl Palette {
    fn of(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                accent: Color::Blue,
                label: Color::Magenta,
                muted: Color::Gray,
                bar_bg: Color::Gray,
                bar_fg: Color::Black,
            },
            Theme::Dark => Self {
                accent: Color::Cyan,
                label: Color::Yellow,
                muted: Color::DarkGray,
                bar_bg: Color::DarkGray,
                bar_fg: Color::White,
            },
        }
    }
}

pub fn draw<S: Storage>(frame: &mut Frame, browser: &mut Browser<S>) {
    let palette = Palette::of(browser.app.view().theme);
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_status_bar(frame, browser, &palette, outer[0]);
    draw_tabs(frame, browser, &palette, outer[1]);
    match browser.tab() {
        Tab::WhiteForm | Tab::RedForm => draw_form(frame, browser, &palette, outer[2]),
        Tab::Logs => draw_logs(frame, browser, &palette, outer[2]),
        Tab::Public => draw_public(frame, browser, &palette, outer[2]),
        Tab::Chat => draw_chat(frame, browser, &palette, outer[2]),
    }
    draw_footer(frame, browser, &palette, outer[3]);

    if browser.tab() == Tab::Logs
        && let Some(entry) = browser.app.detail()
    {
        draw_detail_overlay(frame, entry, &palette, frame.area());
    }
    if browser.show_help {
        draw_help_overlay(frame, &palette, frame.area());
    }
}

fn draw_status_bar<S: Storage>(frame: &mut Frame, browser: &Browser<S>, palette: &Palette, area: Rect) {
    let view = browser.app.view();
    let counts = browser.app.counts();
    let mut filter_parts = Vec::new();
    if !view.query.is_empty() {
        filter_parts.push(format!("search=\"{}\"", view.query));
    }
    if let Some(kind) = view.type_filter {
        filter_parts.push(format!("type={kind}"));
    }
    let filters = if filter_parts.is_empty() {
        "no filters".to_string()
    } else {
        filter_parts.join(" | ")
    };
    let status = format!(
        " wlog | {} entries ({} white, {} red) | {} | {}",
        counts.total, counts.white, counts.red, filters, view.theme,
    );
    let bar = Paragraph::new(status).style(
        Style::default()
            .bg(palette.bar_bg)
            .fg(palette.bar_fg)
            .add_modifier(Modifier::BOLD),
    );
    frame.render_widget(bar, area);
}

fn tab_title(tab: Tab, counts: Counts) -> String {
    match tab {
        Tab::WhiteForm => format!("White ({})", counts.white),
        Tab::RedForm => format!("Red ({})", counts.red),
        Tab::Logs => format!("Logs ({})", counts.total),
        Tab::Public => "Public".to_string(),
        Tab::Chat => "Chat".to_string(),
    }
}

fn draw_tabs<S: Storage>(frame: &mut Frame, browser: &Browser<S>, palette: &Palette, area: Rect) {
    let counts = browser.app.counts();
    let titles: Vec<String> = TABS.iter().map(|tab| tab_title(*tab, counts)).collect();
    let selected = TABS.iter().position(|t| *t == browser.tab()).unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(palette.muted))
        .highlight_style(
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

fn header_style(palette: &Palette) -> Style {
    Style::default()
        .fg(palette.label)
        .add_modifier(Modifier::BOLD)
}

fn summary_table<'a>(rows: &'a [SummaryRow], title: String, palette: &Palette) -> Table<'a> {
    let header = Row::new(["Name", "Likes", "Summary"])
        .style(header_style(palette))
        .height(1);
    let body: Vec<Row> = rows
        .iter()
        .map(|row| {
            let heart = if row.liked { "♥" } else { " " };
            let public = if row.public { " ⇡" } else { "" };
            Row::new([
                Cell::from(format!("{}{public}", row.title)),
                Cell::from(format!("{heart} {}", row.likes)),
                Cell::from(row.meta.as_str()),
            ])
        })
        .collect();
    Table::new(
        body,
        [
            Constraint::Percentage(30),
            Constraint::Length(6),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(palette.accent)),
    )
    .row_highlight_style(
        Style::default()
            .bg(palette.bar_bg)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ")
}

fn draw_logs<S: Storage>(frame: &mut Frame, browser: &mut Browser<S>, palette: &Palette, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let rows = browser.rows();
    let total = browser.app.entries().len();
    let title = if rows.len() == total {
        format!(" Logs ({total}) ")
    } else {
        format!(" Search Results ({}/{total}) ", rows.len())
    };
    if rows.is_empty() {
        let message = if total == 0 {
            "No tastings yet. Press n to add one, or a for quick add."
        } else {
            "No entries match the current filters."
        };
        let empty = Paragraph::new(message).block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(palette.accent)),
        );
        frame.render_widget(empty, columns[0]);
    } else {
        let table = summary_table(&rows, title, palette);
        frame.render_stateful_widget(table, columns[0], &mut browser.table_state);
    }

    let selected = browser
        .selected_id()
        .and_then(|id| browser.app.get(&id).cloned());
    let text = selected.map_or_else(
        || Text::from("No entry selected"),
        |entry| {
            if browser.app.is_expanded(&entry.id) {
                fields_text(&preview_fields(&entry), palette)
            } else {
                Text::from(vec![
                    Line::from(Span::styled(
                        detail_heading(&entry),
                        Style::default()
                            .fg(palette.accent)
                            .add_modifier(Modifier::BOLD),
                    )),
                    Line::from(""),
                    Line::from(short_meta(&entry)),
                    Line::from(""),
                    Line::from(Span::styled(
                        "Space: preview  Enter: details",
                        Style::default().fg(palette.muted),
                    )),
                ])
            }
        },
    );
    let preview = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Preview ")
                .border_style(Style::default().fg(palette.muted)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(preview, columns[1]);
}

fn fields_text(fields: &[Field], palette: &Palette) -> Text<'static> {
    let lines: Vec<Line> = fields
        .iter()
        .map(|field| {
            let value = if field.value.is_empty() {
                winelog::view::EMPTY_VALUE.to_string()
            } else {
                field.value.clone()
            };
            Line::from(vec![
                Span::styled(format!("{}: ", field.label), header_style(palette)),
                Span::raw(value),
            ])
        })
        .collect();
    Text::from(lines)
}

fn draw_form<S: Storage>(frame: &mut Frame, browser: &Browser<S>, palette: &Palette, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let (title, lines) = match &browser.form {
        Some(state) => {
            let title = match &state.id {
                Some(id) => format!(" Edit {} entry {id} ", state.kind),
                None => format!(" New {} entry ", state.kind),
            };
            let mut lines: Vec<Line> = state
                .form
                .iter()
                .map(|(key, value)| {
                    Line::from(vec![
                        Span::styled(format!("{key:<20}"), header_style(palette)),
                        Span::raw(value.to_string()),
                    ])
                })
                .collect();
            if lines.is_empty() {
                lines.push(Line::from("(empty form)"));
            }
            let photo = match &state.photo {
                PhotoInput::Keep => "keep",
                PhotoInput::Remove => "remove",
                PhotoInput::Upload(_) => "new upload",
            };
            lines.push(Line::from(""));
            lines.push(Line::from(format!("photo: {photo}")));
            (title, lines)
        }
        None => (" Form ".to_string(), vec![Line::from("No form open")]),
    };
    let form = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(palette.accent)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(form, columns[0]);

    let kind = browser.form.as_ref().map_or(WineType::White, |f| f.kind);
    let mut names: Vec<Line> = vec![Line::from("name"), Line::from("notes")];
    names.extend(SINGLE_SELECT_FIELDS.iter().map(|f| Line::from(*f)));
    for list in [
        kind.nose_fruit_key(),
        "smell_other",
        "smell_other_text",
        kind.palate_fruit_key(),
        "palate_other",
        "palate_other_text",
        "photo",
    ] {
        names.push(Line::from(list));
    }
    let fields = Paragraph::new(Text::from(names)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Fields ")
            .border_style(Style::default().fg(palette.muted)),
    );
    frame.render_widget(fields, columns[1]);
}

fn draw_public<S: Storage>(frame: &mut Frame, browser: &Browser<S>, palette: &Palette, area: Rect) {
    let title = " Public tastings ".to_string();
    match &browser.public {
        Some(snapshot) if snapshot.empty_state().is_none() => {
            let table = summary_table(snapshot.rows(), title, palette);
            frame.render_widget(table, area);
        }
        other => {
            let message = other
                .as_ref()
                .and_then(PublicSnapshot::empty_state)
                .unwrap_or("Loading...");
            let empty = Paragraph::new(message).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .border_style(Style::default().fg(palette.accent)),
            );
            frame.render_widget(empty, area);
        }
    }
}

fn draw_chat<S: Storage>(frame: &mut Frame, browser: &Browser<S>, palette: &Palette, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();
    for turn in browser.chat.transcript() {
        let (who, color) = match turn.role {
            ChatRole::User => ("you", palette.label),
            ChatRole::Model => ("wine", palette.accent),
        };
        lines.push(Line::from(Span::styled(
            format!("{who}:"),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        lines.extend(turn.text.lines().map(|l| Line::from(l.to_string())));
        lines.push(Line::from(""));
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "Ask about pairings, regions, or your notes. Press Enter to type.",
            Style::default().fg(palette.muted),
        )));
    }
    if browser.chat.state() == ChatState::Sending {
        lines.push(Line::from("..."));
    }

    // keep the newest turns in view
    #[allow(clippy::cast_possible_truncation)]
    let scroll = (lines.len() as u16).saturating_sub(area.height.saturating_sub(2));
    let chat = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Chat ")
                .border_style(Style::default().fg(palette.accent)),
        )
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(chat, area);
}

fn footer_hint(tab: Tab) -> &'static str {
    match tab {
        Tab::WhiteForm | Tab::RedForm => {
            " Enter/+:set field (key=value, key+=value, photo=PATH)  Ctrl-s:save  Esc:cancel  ?:help"
        }
        Tab::Logs => {
            " j/k:move  Enter:open  Space:preview  l:like  p:publish  e:edit  d:delete  /:search  f:type  a:quick add  ?:help  q:quit"
        }
        Tab::Public => " r:reload  Tab:next tab  ?:help  q:quit",
        Tab::Chat => " Enter:message  d:clear  Tab:next tab  ?:help  q:quit",
    }
}

fn draw_footer<S: Storage>(frame: &mut Frame, browser: &Browser<S>, palette: &Palette, area: Rect) {
    let prefix = match browser.input_mode {
        InputMode::Search => "Search: ",
        InputMode::QuickAdd => "Quick add name: ",
        InputMode::Field => "Field: ",
        InputMode::Import => "Import from: ",
        InputMode::Export => "Export to: ",
        InputMode::Chat => "Message: ",
        InputMode::None => "",
    };

    let (text, style) = if browser.input_mode == InputMode::None {
        match &browser.status {
            Some(Status::Info(message)) => (
                format!(" {message}"),
                Style::default().fg(palette.label),
            ),
            Some(Status::Error(message)) => (
                format!(" {message}"),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            None => (
                footer_hint(browser.tab()).to_string(),
                Style::default().fg(palette.muted),
            ),
        }
    } else {
        (
            format!("{prefix}{}", browser.input_buffer),
            Style::default().fg(palette.label),
        )
    };

    frame.render_widget(Paragraph::new(text).style(style), area);

    if browser.input_mode != InputMode::None {
        let chars_before_cursor = browser.input_buffer[..browser.input_cursor]
            .chars()
            .count();
        #[allow(clippy::cast_possible_truncation)]
        let cursor_x = area.x + (prefix.len() + chars_before_cursor) as u16;
        if cursor_x < area.x + area.width {
            frame.set_cursor_position((cursor_x, area.y));
        }
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[allow(clippy::cast_possible_truncation)]
fn draw_detail_overlay(frame: &mut Frame, entry: &Entry, palette: &Palette, area: Rect) {
    let fields = detail_fields(entry);
    let popup_area = centered(area, 80, fields.len() as u16 + 7);
    frame.render_widget(Clear, popup_area);

    let mut text = fields_text(&fields, palette);
    text.lines.push(Line::from(""));
    text.lines.push(Line::from(format!(
        "{}  likes {}  {}{}",
        entry.date.format("%Y-%m-%d %H:%M"),
        entry.likes,
        if entry.public { "public" } else { "private" },
        if entry.photo().is_some() { "  photo" } else { "" },
    )));
    text.lines.push(Line::from(Span::styled(
        "e:edit  d:delete  l:like  p:publish  Esc:close",
        Style::default().fg(palette.muted),
    )));
    let detail = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", detail_heading(entry)))
                .border_style(Style::default().fg(palette.accent)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(detail, popup_area);
}

#[allow(clippy::cast_possible_truncation)]
fn draw_help_overlay(frame: &mut Frame, palette: &Palette, area: Rect) {
    let popup_area = centered(area, 56, HELP_TEXT.len() as u16 + 4);
    frame.render_widget(Clear, popup_area);

    let lines: Vec<Line> = HELP_TEXT
        .iter()
        .map(|(key, desc)| {
            Line::from(vec![
                Span::styled(
                    format!("  {key:<14}"),
                    Style::default()
                        .fg(palette.accent)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(*desc),
            ])
        })
        .collect();

    let help = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Keybindings ")
            .border_style(Style::default().fg(palette.accent)),
    );
    frame.render_widget(help, popup_area);
}
