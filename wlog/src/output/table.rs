use winelog::{prelude::*, view::EMPTY_VALUE};

pub trait TableRow {
    fn headers() -> &'static [&'static str];
    fn row(&self) -> Vec<String>;
}

pub fn render_table<T: TableRow>(items: &[T]) -> String {
    let headers = T::headers();
    let rows: Vec<Vec<String>> = items.iter().map(TableRow::row).collect();
    let widths = column_widths(headers, &rows);

    let mut out = String::new();
    out.push_str(&format_row(
        &headers.iter().map(ToString::to_string).collect::<Vec<_>>(),
        &widths,
    ));
    out.push('\n');
    out.push_str(&format_separator(&widths));

    for row in rows {
        out.push('\n');
        out.push_str(&format_row(&row, &widths));
    }

    out
}

// widths count chars: meta lines contain multi-byte bullets
fn column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            if idx >= widths.len() {
                widths.push(len);
            } else {
                widths[idx] = widths[idx].max(len);
            }
        }
    }
    widths
}

fn format_row(row: &[String], widths: &[usize]) -> String {
    use std::fmt::Write as _;
    let mut out = String::new();
    for (idx, cell) in row.iter().enumerate() {
        if idx > 0 {
            out.push_str("  ");
        }
        let width = widths.get(idx).copied().unwrap_or(0);
        let _ = write!(out, "{cell:<width$}");
    }
    out.trim_end().to_string()
}

fn format_separator(widths: &[usize]) -> String {
    let mut out = String::new();
    for (idx, width) in widths.iter().enumerate() {
        if idx > 0 {
            out.push_str("  ");
        }
        out.push_str(&"-".repeat(*width));
    }
    out
}

fn flag(value: bool, text: &str) -> String {
    if value { text.to_string() } else { String::new() }
}

impl TableRow for SummaryRow {
    fn headers() -> &'static [&'static str] {
        &["id", "name", "likes", "flags", "meta"]
    }

    fn row(&self) -> Vec<String> {
        let flags = [
            flag(self.liked, "liked"),
            flag(self.public, "public"),
            flag(self.has_photo, "photo"),
        ]
        .into_iter()
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(",");
        vec![
            self.id.clone(),
            self.title.clone(),
            self.likes.to_string(),
            flags,
            self.meta.clone(),
        ]
    }
}

impl TableRow for Field {
    fn headers() -> &'static [&'static str] {
        &["field", "value"]
    }

    fn row(&self) -> Vec<String> {
        let value = if self.value.is_empty() {
            EMPTY_VALUE.to_string()
        } else {
            self.value.clone()
        };
        vec![self.label.to_string(), value]
    }
}

impl TableRow for ChatTurn {
    fn headers() -> &'static [&'static str] {
        &["role", "text"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.role.to_string(), self.text.replace('\n', " ")]
    }
}
