mod app;
mod keys;
mod ui;

use anyhow::Result;
use tokio::runtime::Handle;
use winelog::prelude::*;

use crate::cli::AppContext;

/// Runs the terminal browser on a blocking thread; network calls from the
/// public and chat tabs go back through the current runtime.
pub async fn run(ctx: AppContext) -> Result<()> {
    let remote = app::Remote {
        runtime: Handle::current(),
        chat: ChatClient::new(ctx.config.chat.clone())?,
        public: PublicSnapshotClient::new(ctx.config.public_url.as_str())?,
    };
    let browser = app::Browser::new(ctx.app, Some(remote), ctx.config.chat.history_turns);
    tokio::task::spawn_blocking(move || browser.run()).await?
}
