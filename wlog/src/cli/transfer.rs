use std::{
    io::{self, Read},
    path::Path,
};

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;
use winelog::{prelude::*, transfer::write_public};

use crate::{
    cli::{AppContext, ExportArgs, ExportFormat},
    output::OutputFormat,
};

pub fn export(ctx: &mut AppContext, args: &ExportArgs) -> Result<()> {
    let entries: Vec<&Entry> = if args.filtered {
        ctx.apply_filter(&args.filter)?;
        ctx.app.visible()
    } else {
        ctx.app.entries().iter().collect()
    };
    info!(count = entries.len(), format = ?args.format, "export");
    let data = match args.format {
        ExportFormat::Json => export_json(entries)?,
        ExportFormat::Csv => export_csv(entries),
    };
    ctx.output.emit_text(&data)
}

pub fn publish_snapshot(ctx: &AppContext, dir: &Path) -> Result<()> {
    let path = write_public(dir, ctx.app.entries())?;
    let count = ctx.app.entries().iter().filter(|e| e.public).count();
    ctx.output.emit_status(
        &json!({"path": path, "entries": count}),
        &format!("wrote {count} public entries to {}", path.display()),
    )
}

pub fn import(ctx: &mut AppContext, file: &Path) -> Result<()> {
    let text = if file == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("read stdin")?;
        text
    } else {
        std::fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?
    };
    match ctx.dispatch(Event::Import { text })? {
        Outcome::Imported(report) => ctx.output.emit_status(
            &serde_json::to_value(report)?,
            &format!("added {}, replaced {}", report.added, report.replaced),
        ),
        other => anyhow::bail!("unexpected outcome {other:?}"),
    }
}

pub async fn public(ctx: &AppContext) -> Result<()> {
    let client = PublicSnapshotClient::new(ctx.config.public_url.as_str())?;
    let snapshot = client.load().await;
    if ctx.output.format() == OutputFormat::Table
        && let Some(message) = snapshot.empty_state()
    {
        return ctx.output.emit_text(message);
    }
    ctx.output.emit_table(snapshot.rows())
}
