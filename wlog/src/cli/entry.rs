use std::path::Path;

use anyhow::{Result, bail};
use serde_json::json;
use winelog::{
    prelude::*,
    view::{detail_fields, detail_heading, preview_fields, render_fields, title},
};

use crate::{
    cli::{AddArgs, AppContext, EditArgs, ListArgs, QuickAddArgs},
    output::{OutputFormat, render_table},
};

pub fn add(ctx: &mut AppContext, args: AddArgs) -> Result<()> {
    let kind = match ctx.dispatch(Event::NewEntry(args.kind.map(WineType::from)))? {
        Outcome::FormLoaded { kind, .. } => kind,
        other => bail!("unexpected outcome {other:?}"),
    };
    let form = FormData::from_pairs(&args.fields)?;
    let photo = photo_input(args.photo.as_deref(), false)?;
    match ctx.dispatch(Event::Submit { kind, form, photo })? {
        Outcome::Created(id) => {
            let text = format!("created {id}");
            ctx.output.emit_status(&json!({"id": id, "type": kind, "status": "created"}), &text)
        }
        other => bail!("unexpected outcome {other:?}"),
    }
}

pub fn quick_add(ctx: &mut AppContext, args: QuickAddArgs) -> Result<()> {
    let photo = photo_input(args.photo.as_deref(), false)?;
    let outcome = ctx.dispatch(Event::QuickAdd {
        name: args.name,
        kind: args.kind.into(),
        photo,
    })?;
    let (id, kind, form) = match outcome {
        Outcome::FormLoaded {
            id: Some(id),
            kind,
            form,
        } => (id, kind, form),
        other => bail!("unexpected outcome {other:?}"),
    };
    let fields: Vec<_> = form.iter().map(|(k, v)| format!("{k}={v}")).collect();
    let text = format!(
        "created {id}\nrefine with: wlog edit {id} {}",
        fields.join(" ")
    );
    ctx.output.emit_status(
        &json!({"id": id, "type": kind, "status": "created", "form": fields}),
        &text,
    )
}

pub fn edit(ctx: &mut AppContext, args: EditArgs) -> Result<()> {
    let (kind, loaded) = match ctx.dispatch(Event::Edit(args.id))? {
        Outcome::FormLoaded { kind, form, .. } => (kind, form),
        other => bail!("unexpected outcome {other:?}"),
    };
    let overrides = FormData::from_pairs(&args.fields)?;
    let form = merge_fields(&loaded, &overrides);
    let photo = photo_input(args.photo.as_deref(), args.remove_photo)?;
    match ctx.dispatch(Event::Submit { kind, form, photo })? {
        Outcome::Saved(id) => {
            let text = format!("saved {id}");
            ctx.output.emit_status(&json!({"id": id, "status": "saved"}), &text)
        }
        other => bail!("unexpected outcome {other:?}"),
    }
}

/// Replaces every field named in `overrides`, keeping the rest of `loaded`
pub(crate) fn merge_fields(loaded: &FormData, overrides: &FormData) -> FormData {
    let mut merged = FormData::new();
    for (key, value) in loaded.iter().filter(|(key, _)| !overrides.contains(key)) {
        merged.append(key, value);
    }
    for (key, value) in overrides.iter() {
        merged.append(key, value);
    }
    merged
}

pub(crate) fn photo_input(path: Option<&Path>, remove: bool) -> Result<PhotoInput> {
    if remove {
        return Ok(PhotoInput::Remove);
    }
    match path {
        Some(path) => Ok(PhotoInput::Upload(PhotoUpload::from_path(path)?)),
        None => Ok(PhotoInput::Keep),
    }
}

pub fn list(ctx: &mut AppContext, args: &ListArgs) -> Result<()> {
    ctx.apply_filter(&args.filter)?;
    let rows = ctx.app.rows();
    if ctx.output.format() != OutputFormat::Table {
        return ctx.output.emit_json(&rows);
    }
    if rows.is_empty() {
        return ctx.output.emit_text("no entries");
    }
    let mut text = render_table(&rows);
    if args.expand {
        for entry in ctx.app.visible() {
            text.push_str(&format!(
                "\n\n{} ({})\n{}",
                title(entry),
                entry.id,
                render_fields(&preview_fields(entry))
            ));
        }
    }
    ctx.output.emit_text(&text)
}

pub fn show(ctx: &mut AppContext, id: String) -> Result<()> {
    ctx.dispatch(Event::Open(id))?;
    let Some(entry) = ctx.app.detail() else {
        bail!("no entry is open");
    };
    if ctx.output.format() != OutputFormat::Table {
        return ctx.output.emit_json(entry);
    }
    let fields = detail_fields(entry);
    let mut text = format!("{}\n{}\n", detail_heading(entry), entry.date.to_rfc3339());
    text.push_str(&render_table(&fields));
    text.push_str(&format!(
        "\nlikes {}{}{}",
        entry.likes,
        if entry.public { ", public" } else { "" },
        if entry.photo().is_some() { ", photo" } else { "" },
    ));
    ctx.output.emit_text(&text)
}

pub fn delete(ctx: &mut AppContext, id: String, confirm: bool) -> Result<()> {
    match ctx.dispatch(Event::Delete {
        id: id.clone(),
        confirmed: confirm,
    })? {
        Outcome::ConfirmationRequired(prompt) => {
            bail!("{prompt} Re-run with --confirm to delete it.")
        }
        Outcome::Deleted(count) => ctx.output.emit_status(
            &json!({"id": id, "deleted": count}),
            &format!("deleted {id}"),
        ),
        other => bail!("unexpected outcome {other:?}"),
    }
}

pub fn clear(ctx: &mut AppContext, confirm: bool) -> Result<()> {
    match ctx.dispatch(Event::ClearAll { confirmed: confirm })? {
        Outcome::ConfirmationRequired(prompt) => {
            bail!("{prompt} Re-run with --confirm to delete them permanently.")
        }
        Outcome::Deleted(count) => ctx.output.emit_status(
            &json!({"deleted": count}),
            &format!("deleted {count} entries"),
        ),
        other => bail!("unexpected outcome {other:?}"),
    }
}

/// Like or publish toggle; prints the new state
pub fn toggle(ctx: &mut AppContext, event: Event) -> Result<()> {
    let id = match &event {
        Event::ToggleLike(id) | Event::TogglePublish(id) => id.clone(),
        other => bail!("not a toggle: {other:?}"),
    };
    ctx.dispatch(event)?;
    let Some(entry) = ctx.app.get(&id) else {
        bail!("entry {id} not found");
    };
    let text = format!(
        "{}: likes {}, {}",
        title(entry),
        entry.likes,
        if entry.public { "public" } else { "private" }
    );
    ctx.output.emit_status(
        &json!({"id": id, "likes": entry.likes, "liked": entry.liked, "public": entry.public}),
        &text,
    )
}

pub fn theme(ctx: &mut AppContext, toggle: bool) -> Result<()> {
    if toggle {
        ctx.dispatch(Event::ToggleTheme)?;
    }
    let theme = ctx.app.view().theme.to_string();
    ctx.output.emit_status(&json!({"theme": theme}), &theme)
}

pub fn stats(ctx: &AppContext) -> Result<()> {
    let counts = ctx.app.counts();
    let text = format!(
        "total {}  white {}  red {}",
        counts.total, counts.white, counts.red
    );
    ctx.output.emit_status(&serde_json::to_value(counts)?, &text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_replaces_named_fields_only() {
        let mut loaded = FormData::new();
        loaded
            .set("name", "Chablis")
            .set("hue", "pale straw")
            .append("smell_fresh", "citrus")
            .append("smell_fresh", "green apple");
        let overrides =
            FormData::from_pairs(["smell_fresh=lemon", "hue=", "finish=long"]).expect("pairs");

        let merged = merge_fields(&loaded, &overrides);
        assert_eq!(merged.get("name"), Some("Chablis"));
        assert_eq!(merged.get("hue"), Some(""));
        assert_eq!(merged.get_all("smell_fresh"), vec!["lemon"]);
        assert_eq!(merged.get("finish"), Some("long"));
    }

    #[test]
    fn remove_wins_over_missing_photo() {
        assert_eq!(photo_input(None, true).expect("input"), PhotoInput::Remove);
        assert_eq!(photo_input(None, false).expect("input"), PhotoInput::Keep);
        assert!(photo_input(Some(Path::new("/no/such/photo.jpg")), false).is_err());
    }
}
