use crate::config::CliConfig;
use crate::output::Output;
use anyhow::{Context, Result};

pub fn handle(args: &super::ConfigArgs, output: &Output) -> Result<()> {
    match &args.command {
        super::ConfigCommands::Show => {
            let config = CliConfig::load()?;
            output.emit_json(&config.redacted())
        }
        super::ConfigCommands::Set { key, value } => {
            let mut config = CliConfig::load()?;
            match key {
                super::ConfigKeyArg::DataDir => config.data_dir = Some(value.into()),
                super::ConfigKeyArg::ChatUrl => config.chat_url = Some(value.clone()),
                super::ConfigKeyArg::ChatKey => config.chat_key = Some(value.clone()),
                super::ConfigKeyArg::PublicUrl => config.public_url = Some(value.clone()),
                super::ConfigKeyArg::StorageQuota => {
                    config.storage_quota =
                        Some(value.parse().context("storage-quota must be a byte count")?);
                }
            }
            config.save()?;
            output.emit_json(&config.redacted())
        }
        super::ConfigCommands::Reset => {
            CliConfig::reset()?;
            output.emit_text("Config reset")
        }
    }
}
