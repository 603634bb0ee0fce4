//! Field Scribe CLI: the main entry point.
//!
//! Commands:
//! - `onboard`    Write a default config
//! - `status`     Show configuration and store status
//! - `log`        Log an interaction from one sentence
//! - `chat`       Draft an interaction conversationally
//! - `edit`       Change a stored interaction with a plain-language command
//! - `list`       List stored interactions
//! - `history`    Search interactions with one HCP
//! - `summarize`  Relationship briefing for one HCP
//! - `suggest`    Next best actions for one HCP

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "fieldscribe",
    about = "Field Scribe — log HCP interactions in plain language",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Show configuration and store status
    Status,

    /// Log an interaction described in plain language
    Log {
        /// e.g. "Met Dr. Rossi this morning about OncoBoost, she was keen"
        text: String,
    },

    /// Draft an interaction over several messages, then save it
    Chat,

    /// Edit a stored interaction
    Edit {
        id: i64,
        /// e.g. "change the sentiment to Neutral"
        command: String,
    },

    /// List stored interactions, most recent first
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Search the interaction history of one HCP
    History {
        /// Case-insensitive part of the HCP name
        name: String,
        /// Earliest date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Latest date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 10)]
        page_size: usize,
    },

    /// Summarize the relationship with one HCP
    Summarize { name: String },

    /// Suggest next actions for one HCP
    Suggest { name: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let output = commands::Output::new(cli.json);

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Status => commands::status::run().await?,
        Commands::Log { text } => commands::log::run(&text, output).await?,
        Commands::Chat => commands::chat::run(output).await?,
        Commands::Edit { id, command } => commands::edit::run(id, &command, output).await?,
        Commands::List { limit, offset } => commands::list::run(limit, offset, output).await?,
        Commands::History {
            name,
            from,
            to,
            page,
            page_size,
        } => {
            commands::history::run(
                commands::history::Args {
                    name,
                    from,
                    to,
                    page,
                    page_size,
                },
                output,
            )
            .await?
        }
        Commands::Summarize { name } => commands::summarize::run(&name, output).await?,
        Commands::Suggest { name } => commands::suggest::run(&name, output).await?,
    }

    Ok(())
}
