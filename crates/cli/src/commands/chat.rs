//! `fieldscribe chat`: Build an interaction draft over several messages.
//!
//! Each line updates the draft in memory. `/save` stores it once every
//! required field is present.

use std::io::Write;

use fieldscribe_core::EntitySnapshot;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{CmdResult, Output, build_service, load_config, today};

enum Command {
    Show,
    Save,
    Reset,
    Exit,
    Message(String),
}

fn parse_line(line: &str) -> Option<Command> {
    let line = line.trim();
    match line {
        "" => None,
        "/show" => Some(Command::Show),
        "/save" => Some(Command::Save),
        "/reset" => Some(Command::Reset),
        "exit" | "quit" | "/exit" => Some(Command::Exit),
        _ => Some(Command::Message(line.to_string())),
    }
}

pub async fn run(output: Output) -> CmdResult {
    let config = load_config()?;
    let service = build_service(&config).await?;

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║     Field Scribe — Conversational Drafting   ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!();
    println!("  Describe the interaction. Commands: /show /save /reset exit");
    println!();

    let mut draft = EntitySnapshot::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let Some(command) = parse_line(&line) else {
            prompt()?;
            continue;
        };

        match command {
            Command::Exit => break,
            Command::Show => show(&draft, output)?,
            Command::Reset => {
                draft = EntitySnapshot::new();
                println!("  Draft cleared.");
            }
            Command::Save => match service.save_draft(&draft).await {
                Ok(record) => {
                    println!("  ✅ Saved interaction #{}", record.id);
                    draft = EntitySnapshot::new();
                }
                Err(e) => eprintln!("  [Not saved] {e}"),
            },
            Command::Message(text) => {
                eprint!("  ...");
                let result = service.converse(&draft, &text, today()).await;
                eprint!("\r     \r");
                match result {
                    Ok(run) => {
                        let changed: Vec<&str> = run.value.changes.keys().map(String::as_str).collect();
                        draft = run.value.snapshot;
                        if changed.is_empty() {
                            println!("  Scribe > nothing new to record");
                        } else {
                            println!("  Scribe > updated {}", changed.join(", "));
                        }
                    }
                    Err(e) => eprintln!("  [Error] {e}"),
                }
            }
        }
        println!();
        prompt()?;
    }

    println!();
    if !draft.is_empty() {
        println!("  Unsaved draft discarded.");
    }
    println!("  Goodbye! 👋");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

fn show(draft: &EntitySnapshot, output: Output) -> CmdResult {
    if output.is_json() {
        return output.json(&draft.fields);
    }
    if draft.is_empty() {
        println!("  Draft is empty.");
        return Ok(());
    }
    for (field, value) in &draft.fields {
        let shown = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        println!("    {field:<22} {shown}");
    }
    Ok(())
}
