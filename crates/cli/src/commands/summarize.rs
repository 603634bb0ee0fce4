//! `fieldscribe summarize`: Relationship briefing for one HCP.

use super::{CmdResult, Output, build_service, load_config, today};

pub async fn run(name: &str, output: Output) -> CmdResult {
    let config = load_config()?;
    let service = build_service(&config).await?;

    let run = service.summarize(name, today()).await?;
    let summary = run.value;

    if output.is_json() {
        return output.json(&summary);
    }

    println!("  Relationship with {name}");
    println!("  {}\n", summary.relationship_status);
    if !summary.key_takeaways.is_empty() {
        println!("  Key takeaways:");
        for takeaway in &summary.key_takeaways {
            println!("    • {takeaway}");
        }
        println!();
    }
    println!("  Suggested focus: {}", summary.suggested_focus);
    Ok(())
}
