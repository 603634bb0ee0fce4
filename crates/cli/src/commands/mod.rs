//! Subcommands and the plumbing they share: config loading, store and
//! service construction, output formatting.

pub mod chat;
pub mod edit;
pub mod history;
pub mod list;
pub mod log;
pub mod onboard;
pub mod status;
pub mod suggest;
pub mod summarize;

use std::sync::Arc;

use chrono::NaiveDate;
use fieldscribe_config::AppConfig;
use fieldscribe_core::{InteractionRecord, RecordStore};
use fieldscribe_pipeline::{InteractionService, ModelGateway, Pipeline, Stage};
use fieldscribe_store::{InMemoryStore, SqliteStore};
use serde::Serialize;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Providers that run locally and need no API key.
const KEYLESS_PROVIDERS: &[&str] = &["ollama", "vllm", "llamacpp", "llama.cpp"];

/// Whether results are printed for people or as JSON.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn json<T: Serialize>(&self, value: &T) -> CmdResult {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn RecordStore>, Box<dyn std::error::Error>> {
    match config.store.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryStore::new())),
        _ => {
            let path = config.store.resolved_path();
            let store = SqliteStore::new(&path)
                .await
                .map_err(|e| format!("Failed to open store at {path}: {e}"))?;
            Ok(Arc::new(store))
        }
    }
}

/// Provider, gateway, pipeline and store, wired from config.
pub async fn build_service(config: &AppConfig) -> Result<InteractionService, Box<dyn std::error::Error>> {
    if !config.has_api_key() && !KEYLESS_PROVIDERS.contains(&config.default_provider.as_str()) {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    export GROQ_API_KEY=gsk_...          (default provider)");
        eprintln!("    export OPENAI_API_KEY=sk-...");
        eprintln!("    export FIELDSCRIBE_API_KEY=...       (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let router = fieldscribe_providers::router::build_from_config(config);
    let provider = router.default().ok_or("No default provider configured")?;
    let gateway = ModelGateway::from_config(provider, config);
    let store = open_store(config).await?;

    Ok(InteractionService::from_config(
        Pipeline::new(gateway),
        store,
        &config.pipeline,
    ))
}

/// Today's date in local time. Only the CLI reads the clock.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn print_record(record: &InteractionRecord) {
    let f = &record.fields;
    println!(
        "  #{:<4} {} {}  {:<8} {}  [{}]  (v{})",
        record.id,
        f.date.format("%Y-%m-%d"),
        f.time.format("%H:%M"),
        f.interaction_type.as_str(),
        f.hcp_name,
        f.sentiment,
        record.version
    );
    print_line("Topics", &f.topics_discussed);
    print_list("Attendees", &f.attendees);
    print_list("Materials", &f.materials_shared);
    print_list("Samples", &f.samples_distributed);
    if let Some(summary) = &f.voice_note_summary {
        print_line("Voice note", summary);
    }
    if let Some(outcome) = &f.outcomes {
        print_line("Outcome", outcome);
    }
    print_list("Follow-up", &f.follow_up_actions);
    print_list("AI follow-up", &f.ai_suggested_followups);
}

fn print_line(label: &str, value: &str) {
    if !value.trim().is_empty() {
        println!("         {:<13} {}", format!("{label}:"), value);
    }
}

fn print_list(label: &str, items: &[String]) {
    if !items.is_empty() {
        print_line(label, &items.join(", "));
    }
}

/// `started > ... > merged`, shown with --verbose.
pub fn render_trail(trail: &[Stage]) -> String {
    trail
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" > ")
}
