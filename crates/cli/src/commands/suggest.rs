//! `fieldscribe suggest`: Next best actions for one HCP.

use super::{CmdResult, Output, build_service, load_config, today};

pub async fn run(name: &str, output: Output) -> CmdResult {
    let config = load_config()?;
    let service = build_service(&config).await?;

    let actions = service.suggest(name, today()).await?.value;

    if output.is_json() {
        return output.json(&actions);
    }

    if actions.is_empty() {
        println!("  No interactions with {name} yet, nothing to suggest.");
        return Ok(());
    }

    println!("  Next actions for {name}:");
    for (rank, action) in actions.iter().enumerate() {
        println!("    {}. {}", rank + 1, action.action);
        println!("       {}", action.rationale);
    }
    Ok(())
}
