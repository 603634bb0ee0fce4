//! `fieldscribe edit`: Change a stored interaction in plain language.

use super::{CmdResult, Output, build_service, load_config, print_record, today};

pub async fn run(id: i64, command: &str, output: Output) -> CmdResult {
    let config = load_config()?;
    let service = build_service(&config).await?;

    let before = service.store().get(id).await?.map(|r| r.version);

    eprint!("  Applying edit...");
    let result = service.edit(id, command, today()).await;
    eprint!("\r                 \r");
    let run = result?;

    if output.is_json() {
        return output.json(&serde_json::json!({
            "invocation_id": run.invocation_id,
            "trail": run.trail,
            "record": run.value,
        }));
    }

    if before == Some(run.value.version) {
        println!("  No changes for interaction #{id}");
    } else {
        println!("  ✅ Updated interaction #{id} (now v{})", run.value.version);
    }
    print_record(&run.value);
    Ok(())
}
