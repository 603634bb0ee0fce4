//! `fieldscribe log`: Log an interaction from one sentence.

use super::{CmdResult, Output, build_service, load_config, print_record, render_trail, today};

pub async fn run(text: &str, output: Output) -> CmdResult {
    let config = load_config()?;
    let service = build_service(&config).await?;

    eprint!("  Extracting...");
    let result = service.log(text, today()).await;
    eprint!("\r              \r");
    let run = result?;

    if output.is_json() {
        return output.json(&serde_json::json!({
            "invocation_id": run.invocation_id,
            "trail": run.trail,
            "record": run.value,
        }));
    }

    println!("  ✅ Logged interaction #{}", run.value.id);
    print_record(&run.value);
    tracing::debug!(trail = %render_trail(&run.trail), "Log finished");
    Ok(())
}
