use std::io::{self, BufRead, Write};

use anyhow::Result;
use winelog::prelude::*;

use crate::{cli::AppContext, output::OutputFormat};

/// One-shot question, or an interactive session when `message` is empty.
/// The transcript lives only for the session; `/clear` resets it.
pub async fn handle(ctx: &AppContext, message: &[String]) -> Result<()> {
    let client = ChatClient::new(ctx.config.chat.clone())?;
    let mut session = ChatSession::new(ctx.config.chat.history_turns);

    if !message.is_empty() {
        session.ask(&client, &message.join(" ")).await?;
        return emit_transcript(ctx, session.transcript());
    }

    let stdin = io::stdin();
    loop {
        print!("you> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear();
                continue;
            }
            _ => {}
        }
        let reply = session.ask(&client, line).await?;
        println!("wine> {reply}\n");
    }
    Ok(())
}

fn emit_transcript(ctx: &AppContext, transcript: &[ChatTurn]) -> Result<()> {
    if ctx.output.format() == OutputFormat::Table {
        // last reply only
        let reply = transcript.last().map_or("", |turn| turn.text.as_str());
        return ctx.output.emit_text(reply);
    }
    ctx.output.emit_table(transcript)
}
