//! `fieldscribe list`: List stored interactions, most recent first.

use super::{CmdResult, Output, load_config, open_store, print_record};

pub async fn run(limit: usize, offset: usize, output: Output) -> CmdResult {
    let config = load_config()?;
    let store = open_store(&config).await?;

    let records = store.list(offset, limit).await?;
    if output.is_json() {
        return output.json(&records);
    }

    if records.is_empty() {
        println!("  No interactions stored yet.");
        return Ok(());
    }

    let total = store.count().await?;
    println!("  Interactions {}-{} of {total}\n", offset + 1, offset + records.len());
    for record in &records {
        print_record(record);
        println!();
    }
    Ok(())
}
