/*
 * wlog - record, search, and share wine tasting notes
 *
 * SPDX-FileCopyrightText: 2025-2026 Steve Schoettler
 * SPDX-License-Identifier: Apache-2.0
 */
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, warn};
use winelog::prelude::*;

use crate::{
    config::CliConfig,
    output::{Output, OutputFormat},
};

pub mod chat;
pub mod config;
pub mod entry;
pub mod transfer;

#[derive(Parser, Debug)]
#[command(name = "wlog")]
#[command(author, version, about = "wlog: record, search, and share wine tasting notes", long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Directory holding storage.json. Default: environment `WINELOG_DATA_DIR`, the config file, or the current directory
    #[arg(short = 'd', long, env = "WINELOG_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Chat endpoint url
    #[arg(long, env = "WINELOG_CHAT_URL", global = true)]
    pub chat_url: Option<String>,

    /// Chat api key, sent as the `key` query parameter
    #[arg(long, env = "WINELOG_CHAT_KEY", hide_env_values = true, global = true)]
    pub chat_key: Option<String>,

    /// Base url hosting public.json
    #[arg(long, env = "WINELOG_PUBLIC_URL", global = true)]
    pub public_url: Option<String>,

    /// Write output to file (default: stdout)
    #[arg(short = 'o', long, value_name = "FILE", global = true)]
    pub output: Option<PathBuf>,

    /// JSON output (default)
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Table output format
    #[arg(short, long, global = true)]
    pub table: bool,

    /// Quiet mode - suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (repeat for more: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global=true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a tasting from FIELD=VALUE pairs
    Add(AddArgs),

    /// Create an entry with just a name, then print its form for editing
    QuickAdd(QuickAddArgs),

    /// Change fields of an entry
    Edit(EditArgs),

    /// List entries, newest first
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show all fields of an entry
    Show {
        id: String,
    },

    /// Delete an entry
    #[command(alias = "rm")]
    Delete {
        id: String,

        /// skip confirmation prompt
        #[arg(long)]
        confirm: bool,
    },

    /// Delete all entries
    Clear {
        /// skip confirmation prompt
        #[arg(long)]
        confirm: bool,
    },

    /// Toggle the like on an entry
    Like {
        id: String,
    },

    /// Toggle whether an entry is included in the public snapshot
    Publish {
        id: String,
    },

    /// Export entries as json or csv
    Export(ExportArgs),

    /// Write public.json with the published entries into a directory
    PublishSnapshot {
        /// Destination directory
        dir: PathBuf,
    },

    /// Merge entries from an exported json file ("-" reads stdin)
    Import {
        file: PathBuf,
    },

    /// List entries from the hosted public snapshot
    Public,

    /// Ask the wine assistant. Without a message, starts an interactive session.
    Chat {
        message: Vec<String>,
    },

    /// Show or toggle the color theme
    Theme {
        #[arg(long)]
        toggle: bool,
    },

    /// Count entries by type
    Stats,

    /// Show or change saved settings
    Config(ConfigArgs),

    /// Browse entries in the terminal
    Browse(BrowseArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum WineTypeArg {
    White,
    Red,
}

impl From<WineTypeArg> for WineType {
    fn from(value: WineTypeArg) -> Self {
        match value {
            WineTypeArg::White => Self::White,
            WineTypeArg::Red => Self::Red,
        }
    }
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Wine type. Default: the last type chosen
    #[arg(long = "type", value_enum)]
    pub kind: Option<WineTypeArg>,

    /// Form fields as FIELD=VALUE. Repeat a list field to check several values.
    #[arg(value_name = "FIELD=VALUE")]
    pub fields: Vec<String>,

    /// Photo file to attach
    #[arg(long, value_name = "FILE")]
    pub photo: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct QuickAddArgs {
    pub name: String,

    #[arg(long = "type", value_enum, default_value = "white")]
    pub kind: WineTypeArg,

    #[arg(long, value_name = "FILE")]
    pub photo: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    pub id: String,

    /// Fields to replace, as FIELD=VALUE. An empty value clears the field.
    #[arg(value_name = "FIELD=VALUE")]
    pub fields: Vec<String>,

    /// Replace the photo
    #[arg(long, value_name = "FILE", conflicts_with = "remove_photo")]
    pub photo: Option<PathBuf>,

    /// Remove the photo
    #[arg(long)]
    pub remove_photo: bool,
}

#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Case-insensitive text to find in name or notes
    #[arg(long)]
    pub query: Option<String>,

    /// Only entries of this type
    #[arg(long = "type", value_enum)]
    pub kind: Option<WineTypeArg>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Include preview fields in table output
    #[arg(long)]
    pub expand: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(long, value_enum, default_value = "json")]
    pub format: ExportFormat,

    /// Export only entries matching --query and --type
    #[arg(long)]
    pub filtered: bool,

    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    Show,
    Set {
        #[arg(value_enum)]
        key: ConfigKeyArg,
        value: String,
    },
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConfigKeyArg {
    DataDir,
    ChatUrl,
    ChatKey,
    PublicUrl,
    StorageQuota,
}

#[derive(Args, Debug)]
pub struct BrowseArgs {
    #[command(flatten)]
    pub filter: FilterArgs,
}

/// Shared state for command handlers
pub struct AppContext {
    pub app: App<FileStorage>,
    pub config: Config,
    pub output: Output,
}

impl AppContext {
    /// Dispatches an event, logging the outcome
    pub fn dispatch(&mut self, event: Event) -> Result<Outcome> {
        let outcome = self.app.dispatch(event)?;
        debug!(?outcome, "outcome");
        Ok(outcome)
    }

    /// Applies `--query` and `--type` to the view
    pub fn apply_filter(&mut self, filter: &FilterArgs) -> Result<()> {
        if let Some(query) = &filter.query {
            self.dispatch(Event::SetQuery(query.clone()))?;
        }
        self.dispatch(Event::SetTypeFilter(filter.kind.map(WineType::from)))?;
        Ok(())
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let output = Output::new(resolve_output_format(&cli), cli.output.clone());

    // config commands must work even when storage can't be opened
    if let Commands::Config(args) = &cli.command {
        return config::handle(args, &output);
    }

    let config = build_config(&cli, &CliConfig::load()?);
    debug!(path = %config.storage_path.display(), "opening storage");
    let storage = FileStorage::open(&config.storage_path, config.storage_quota)?;
    let mut ctx = AppContext {
        app: App::new(storage),
        config,
        output,
    };

    match cli.command {
        Commands::Add(args) => entry::add(&mut ctx, args),
        Commands::QuickAdd(args) => entry::quick_add(&mut ctx, args),
        Commands::Edit(args) => entry::edit(&mut ctx, args),
        Commands::List(args) => entry::list(&mut ctx, &args),
        Commands::Show { id } => entry::show(&mut ctx, id),
        Commands::Delete { id, confirm } => entry::delete(&mut ctx, id, confirm),
        Commands::Clear { confirm } => entry::clear(&mut ctx, confirm),
        Commands::Like { id } => entry::toggle(&mut ctx, Event::ToggleLike(id)),
        Commands::Publish { id } => entry::toggle(&mut ctx, Event::TogglePublish(id)),
        Commands::Theme { toggle } => entry::theme(&mut ctx, toggle),
        Commands::Stats => entry::stats(&ctx),
        Commands::Export(args) => transfer::export(&mut ctx, &args),
        Commands::PublishSnapshot { dir } => transfer::publish_snapshot(&ctx, &dir),
        Commands::Import { file } => transfer::import(&mut ctx, &file),
        Commands::Public => transfer::public(&ctx).await,
        Commands::Chat { message } => chat::handle(&ctx, &message).await,
        Commands::Browse(args) => {
            ctx.apply_filter(&args.filter)?;
            crate::browse::run(ctx).await
        }
        Commands::Config(args) => config::handle(&args, &ctx.output),
    }
}

fn resolve_output_format(cli: &Cli) -> OutputFormat {
    if cli.quiet {
        OutputFormat::Quiet
    } else if cli.pretty {
        if cli.table {
            warn!("--pretty conflicts with --table. Using json pretty format");
        }
        OutputFormat::Pretty
    } else if cli.json {
        if cli.table {
            warn!("--json conflicts with --table. Using json format");
        }
        OutputFormat::Json
    } else if cli.table {
        OutputFormat::Table
    } else {
        OutputFormat::Json
    }
}

/// Flags and environment override the saved config, which overrides defaults.
fn build_config(cli: &Cli, saved: &CliConfig) -> Config {
    let mut config = Config::default();
    if let Some(dir) = cli.data_dir.as_ref().or(saved.data_dir.as_ref()) {
        config = config.data_dir(dir);
    }
    if let Some(quota) = saved.storage_quota {
        config = config.storage_quota(quota);
    }
    if let Some(url) = cli.public_url.as_ref().or(saved.public_url.as_ref()) {
        config = config.public_url(url);
    }
    let mut chat = config.chat.clone();
    if let Some(url) = cli.chat_url.as_ref().or(saved.chat_url.as_ref()) {
        chat = chat.url(url);
    }
    if let Some(key) = cli.chat_key.as_ref().or(saved.chat_key.as_ref()) {
        chat = chat.api_key(Some(key.clone()));
    }
    config.chat(chat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("wlog").chain(args.iter().copied())).expect("parse")
    }

    #[test]
    fn table_flag_selects_table() {
        assert_eq!(resolve_output_format(&parse(&["-t", "stats"])), OutputFormat::Table);
        assert_eq!(resolve_output_format(&parse(&["stats"])), OutputFormat::Json);
        assert_eq!(
            resolve_output_format(&parse(&["--pretty", "-t", "stats"])),
            OutputFormat::Pretty
        );
        assert_eq!(resolve_output_format(&parse(&["-q", "-t", "stats"])), OutputFormat::Quiet);
    }

    #[test]
    fn add_collects_repeated_fields() {
        let cli = parse(&[
            "add",
            "--type",
            "white",
            "name=Chablis",
            "smell_fresh=citrus",
            "smell_fresh=green apple",
        ]);
        let Commands::Add(args) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(args.kind, Some(WineTypeArg::White));
        let form = FormData::from_pairs(&args.fields).expect("pairs");
        assert_eq!(form.get_all("smell_fresh"), vec!["citrus", "green apple"]);
    }

    #[test]
    fn edit_rejects_photo_and_remove_together() {
        let result = Cli::try_parse_from(["wlog", "edit", "x", "--photo", "a.jpg", "--remove-photo"]);
        assert!(result.is_err());
    }

    #[test]
    fn flags_override_saved_config() {
        let saved = CliConfig {
            data_dir: Some(PathBuf::from("/saved")),
            chat_url: Some("http://saved/chat".into()),
            storage_quota: Some(99),
            ..CliConfig::default()
        };
        let cli = parse(&["--data-dir", "/flag", "stats"]);
        let config = build_config(&cli, &saved);
        assert_eq!(config.storage_path, PathBuf::from("/flag/storage.json"));
        assert_eq!(config.storage_quota, 99);
        if std::env::var("WINELOG_CHAT_URL").is_err() {
            assert_eq!(config.chat.url, "http://saved/chat");
        }
    }
}
