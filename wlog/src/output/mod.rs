//! Command output: json (compact or pretty), aligned tables, or nothing.
//! Everything goes to stdout unless `-o FILE` names a destination.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

mod table;

pub use table::{TableRow, render_table};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Pretty,
    Table,
    Quiet,
}

#[derive(Clone, Debug)]
pub struct Output {
    format: OutputFormat,
    path: Option<PathBuf>,
}

impl Output {
    pub fn new(format: OutputFormat, path: Option<PathBuf>) -> Self {
        Self { format, path }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn emit_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let data = match self.format {
            OutputFormat::Quiet => return Ok(()),
            OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
            OutputFormat::Json | OutputFormat::Table => serde_json::to_string(value)?,
        };
        self.write(data)
    }

    /// Entry lists and field lists: a table in table mode, json otherwise
    pub fn emit_table<T: TableRow + Serialize>(&self, items: &[T]) -> Result<()> {
        match self.format {
            OutputFormat::Table => self.write(render_table(items)),
            OutputFormat::Quiet => Ok(()),
            OutputFormat::Json | OutputFormat::Pretty => self.emit_json(items),
        }
    }

    /// Result of a mutation: one human-readable line in table mode, the json
    /// `value` otherwise
    pub fn emit_status(&self, value: &Value, text: &str) -> Result<()> {
        match self.format {
            OutputFormat::Table => self.write(text.to_string()),
            _ => self.emit_json(value),
        }
    }

    /// Exported documents (json, csv) and chat replies, written as-is
    pub fn emit_text(&self, text: &str) -> Result<()> {
        if self.format == OutputFormat::Quiet {
            return Ok(());
        }
        self.write(text.to_string())
    }

    fn write(&self, mut data: String) -> Result<()> {
        if !data.ends_with('\n') {
            data.push('\n');
        }
        match &self.path {
            Some(path) => {
                fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
            }
            None => print!("{data}"),
        }
        Ok(())
    }
}
