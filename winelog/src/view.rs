//! List and detail views
//!
//! Pure functions from the entry collection to what is displayed: the
//! filtered and sorted list, one summary row per entry, the inline preview
//! and the full detail. Nothing here is stored; order and counts are
//! recomputed on every render.

use chrono::Local;
use serde::Serialize;

use crate::entry::{Entry, WineType};

/// Placeholder for an empty descriptor
pub const EMPTY_VALUE: &str = "-";

/// Title used when an entry has no name
pub const NO_NAME: &str = "(no name)";

/// Active list query and type chip
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub query: String,
    pub kind: Option<WineType>,
}

impl ListFilter {
    pub fn new(query: impl Into<String>, kind: Option<WineType>) -> Self {
        Self {
            query: query.into(),
            kind,
        }
    }

    /// True when the (trimmed) query is empty or a case-insensitive substring
    /// of the name or notes, and the type chip is unset or equal to the type.
    pub fn matches(&self, entry: &Entry) -> bool {
        let query = self.query.trim().to_lowercase();
        let match_query = query.is_empty()
            || entry.name.to_lowercase().contains(&query)
            || entry.notes.to_lowercase().contains(&query);
        let match_kind = self.kind.is_none_or(|kind| entry.kind == kind);
        match_query && match_kind
    }

    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty() && self.kind.is_none()
    }
}

/// Entries matching `filter`, newest first. Entries with equal timestamps
/// keep their collection order.
pub fn visible<'a>(entries: &'a [Entry], filter: &ListFilter) -> Vec<&'a Entry> {
    let mut list: Vec<&Entry> = entries.iter().filter(|e| filter.matches(e)).collect();
    // sort_by is stable
    list.sort_by(|a, b| b.date.cmp(&a.date));
    list
}

fn or_placeholder(value: &str) -> &str {
    if value.trim().is_empty() {
        EMPTY_VALUE
    } else {
        value
    }
}

fn joined_or_placeholder(values: &[&str]) -> String {
    if values.is_empty() {
        EMPTY_VALUE.to_string()
    } else {
        values.join(", ")
    }
}

/// One-line summary: hue, nose, palate and finish, `-` for empty parts.
pub fn short_meta(entry: &Entry) -> String {
    format!(
        "{} • {} • {} • {}",
        or_placeholder(&entry.hue),
        joined_or_placeholder(&entry.nose_descriptors()),
        joined_or_placeholder(&entry.palate_descriptors()),
        or_placeholder(&entry.finish),
    )
}

/// List row for one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub id: String,
    pub kind: WineType,
    pub title: String,
    pub meta: String,
    pub likes: u32,
    pub liked: bool,
    pub public: bool,
    pub has_photo: bool,
}

impl SummaryRow {
    pub fn new(entry: &Entry) -> Self {
        let date = entry.date.with_timezone(&Local).format("%Y-%m-%d %H:%M");
        Self {
            id: entry.id.clone(),
            kind: entry.kind,
            title: title(entry),
            meta: format!("{} • {} • {date}", entry.kind.label(), short_meta(entry)),
            likes: entry.likes,
            liked: entry.liked,
            public: entry.public,
            has_photo: entry.photo().is_some(),
        }
    }
}

pub fn title(entry: &Entry) -> String {
    if entry.name.trim().is_empty() {
        NO_NAME.to_string()
    } else {
        entry.name.clone()
    }
}

/// Summary rows for the entries matching `filter`, newest first
pub fn rows(entries: &[Entry], filter: &ListFilter) -> Vec<SummaryRow> {
    visible(entries, filter)
        .into_iter()
        .map(SummaryRow::new)
        .collect()
}

/// A labeled value in a preview or detail view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
}

impl Field {
    fn text(label: &'static str, value: &str) -> Self {
        Self {
            label,
            value: value.to_string(),
        }
    }

    fn list<S: AsRef<str>>(label: &'static str, values: &[S]) -> Self {
        let values: Vec<&str> = values.iter().map(AsRef::as_ref).collect();
        Self {
            label,
            value: values.join(", "),
        }
    }
}

struct Labels {
    nose_fruit_white: &'static str,
    nose_fruit_red: &'static str,
    nose_other: &'static str,
    notes: &'static str,
}

const PREVIEW_LABELS: Labels = Labels {
    nose_fruit_white: "Nose fresh fruit",
    nose_fruit_red: "Nose fruit",
    nose_other: "Nose (other)",
    notes: "Notes",
};

const DETAIL_LABELS: Labels = Labels {
    nose_fruit_white: "Smell descriptors: fresh fruit",
    nose_fruit_red: "Smell descriptors: fruit",
    nose_other: "Smell descriptors (other)",
    notes: "Side notes",
};

fn fields(entry: &Entry, labels: &Labels) -> Vec<Field> {
    let (nose_fruit_label, palate_fruit_label) = match entry.kind {
        WineType::White => (labels.nose_fruit_white, "Palate/finish — fresh fruit"),
        WineType::Red => (labels.nose_fruit_red, "Palate/finish — fruit"),
    };
    vec![
        Field::text("Appearance clarity", &entry.appearance_clarity),
        Field::text("Hue density", &entry.hue_density),
        Field::text("Hue", &entry.hue),
        Field::text("Smell intensity", &entry.smell_intensity),
        Field::list(nose_fruit_label, entry.nose_fruit()),
        Field::list(labels.nose_other, &entry.nose_other()),
        Field::text("Sweetness", &entry.sweetness),
        Field::text("Sourness", &entry.sourness),
        Field::text("Bitterness", &entry.bitterness),
        Field::text("Astringency", &entry.astringency),
        Field::list(palate_fruit_label, entry.palate_fruit()),
        Field::list("Palate/finish (other)", &entry.palate_other()),
        Field::text("Body", &entry.body),
        Field::text("Texture", &entry.texture),
        Field::text("Balance", &entry.balance),
        Field::text("Finish", &entry.finish),
        Field::text(labels.notes, &entry.notes),
    ]
}

/// Fields shown when a row is expanded
pub fn preview_fields(entry: &Entry) -> Vec<Field> {
    fields(entry, &PREVIEW_LABELS)
}

/// Fields shown in the full detail view
pub fn detail_fields(entry: &Entry) -> Vec<Field> {
    fields(entry, &DETAIL_LABELS)
}

/// Heading of the detail view
pub fn detail_heading(entry: &Entry) -> String {
    format!("{} — {}", title(entry), entry.kind.label())
}

/// Renders fields as aligned `label  value` lines
pub fn render_fields(fields: &[Field]) -> String {
    let width = fields
        .iter()
        .map(|f| f.label.chars().count())
        .max()
        .unwrap_or(0);
    fields
        .iter()
        .map(|f| {
            let pad = width - f.label.chars().count();
            format!("{}{}  {}", f.label, " ".repeat(pad), f.value)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Entry counts shown on the tab badges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub total: usize,
    pub white: usize,
    pub red: usize,
}

impl Counts {
    pub fn of(entries: &[Entry]) -> Self {
        let white = entries
            .iter()
            .filter(|e| e.kind == WineType::White)
            .count();
        Self {
            total: entries.len(),
            white,
            red: entries.len() - white,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn entry(name: &str, notes: &str, kind: WineType, minute: i64) -> Entry {
        let mut e = Entry::new(kind);
        e.name = name.into();
        e.notes = notes.into();
        e.date = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("date")
            + Duration::minutes(minute);
        e
    }

    #[test]
    fn filter_is_and_of_query_and_type() {
        let entries = vec![
            entry("Sancerre", "", WineType::White, 0),
            entry("Chinon", "sancerre neighbour", WineType::Red, 1),
            entry("Barolo", "", WineType::Red, 2),
        ];
        let by_query = ListFilter::new("  SANCERRE ", None);
        let names: Vec<_> = visible(&entries, &by_query)
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["Chinon", "Sancerre"]);

        let both = ListFilter::new("sancerre", Some(WineType::Red));
        assert_eq!(visible(&entries, &both).len(), 1);

        for e in &entries {
            let f = ListFilter::new("bar", Some(WineType::Red));
            let expected = e.name.to_lowercase().contains("bar") && e.kind == WineType::Red;
            assert_eq!(f.matches(e), expected);
        }
    }

    #[test]
    fn sort_is_descending_and_stable() {
        let entries = vec![
            entry("t2", "", WineType::White, 2),
            entry("t1", "", WineType::White, 1),
            entry("t3a", "", WineType::Red, 3),
            entry("t3b", "", WineType::Red, 3),
        ];
        let names: Vec<_> = visible(&entries, &ListFilter::default())
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["t3a", "t3b", "t2", "t1"]);
    }

    #[test]
    fn short_meta_uses_placeholders() {
        let mut e = Entry::new(WineType::White);
        e.hue = "pale straw".into();
        e.set_nose_fruit(vec!["citrus".into(), "green apple".into()]);
        assert_eq!(short_meta(&e), "pale straw • citrus, green apple • - • -");
    }

    #[test]
    fn row_title_falls_back() {
        let e = Entry::new(WineType::Red);
        let row = SummaryRow::new(&e);
        assert_eq!(row.title, NO_NAME);
        assert!(row.meta.starts_with("RED • "));
    }

    #[test]
    fn detail_labels_follow_type() {
        let red = Entry::new(WineType::Red);
        let labels: Vec<_> = detail_fields(&red).iter().map(|f| f.label).collect();
        assert!(labels.contains(&"Smell descriptors: fruit"));
        assert!(labels.contains(&"Side notes"));
        let white = Entry::new(WineType::White);
        let labels: Vec<_> = preview_fields(&white).iter().map(|f| f.label).collect();
        assert!(labels.contains(&"Nose fresh fruit"));
        assert!(labels.contains(&"Palate/finish — fresh fruit"));
        assert_eq!(detail_heading(&white), "(no name) — WHITE");
    }

    #[test]
    fn counts_by_type() {
        let entries = vec![
            entry("a", "", WineType::White, 0),
            entry("b", "", WineType::Red, 0),
            entry("c", "", WineType::Red, 0),
        ];
        assert_eq!(
            Counts::of(&entries),
            Counts {
                total: 3,
                white: 1,
                red: 2
            }
        );
    }
}
