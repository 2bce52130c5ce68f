use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crossquery::cache::QueryCache;
use crossquery::config::AppConfig;
use crossquery::controller::{Planner, QueryAgent, QueryResponse, RequestOptions};
use crossquery::db::{
    AdapterRegistry, DocumentAdapter, GraphAdapter, PostgresConfig, RelationalAdapter,
};
use crossquery::export;
use crossquery::llm::{ChatClient, FilePlanner};
use crossquery::pipeline::PipelineExecutor;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Tsv,
}

/// Answer a question with a multi-stage query across PostgreSQL, Neo4j and MongoDB
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Config file (defaults to <config dir>/crossquery/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the plan in this JSON file instead of asking the language model
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Join the rows of every stage on this field (repeatable)
    #[arg(long = "merge-key")]
    merge_key: Vec<String>,

    /// Describe the results in natural language
    #[arg(long)]
    human_readable: bool,

    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Prompt for the PostgreSQL password when none is configured
    #[arg(long)]
    password: bool,

    /// Write the effective settings (without secrets) to the config file and exit
    #[arg(long)]
    init_config: bool,

    /// Log more (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[arg(required_unless_present = "init_config")]
    question: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; stdout is reserved for results
    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = AppConfig::load(cli.config.as_deref())?;

    if cli.init_config {
        let path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
        config.save(&path)?;
        eprintln!("Wrote {}", path.display());
        return Ok(());
    }
    let Some(question) = cli.question else {
        anyhow::bail!("no question given");
    };

    resolve_password(&mut config.postgres, cli.password, |prompt| {
        rpassword::read_password_from_tty(Some(prompt))
    })?;

    let adapters = AdapterRegistry::new()
        .with(Arc::new(RelationalAdapter::new(config.postgres.clone())))
        .with(Arc::new(GraphAdapter::new(config.graph.clone())?))
        .with(Arc::new(DocumentAdapter::new(config.document.clone())));
    let executor = PipelineExecutor::new(adapters);
    let cache = Arc::new(QueryCache::new(config.engine.cache_ttl()));

    let chat = if cli.plan.is_none() || cli.human_readable {
        Some(Arc::new(
            ChatClient::new(config.llm.clone()).context("Failed to set up the chat client")?,
        ))
    } else {
        None
    };
    let planner: Arc<dyn Planner> = match (&cli.plan, &chat) {
        (Some(path), _) => Arc::new(FilePlanner::new(path)),
        (None, Some(chat)) => chat.clone(),
        (None, None) => anyhow::bail!("no planner available"),
    };

    let mut agent =
        QueryAgent::new(planner, executor, cache).with_max_retries(config.engine.max_retries);
    if let Some(chat) = chat {
        agent = agent.with_summarizer(chat);
    }

    let options = RequestOptions {
        merge_keys: (!cli.merge_key.is_empty()).then_some(cli.merge_key),
        human_readable: cli.human_readable,
    };

    let start = Instant::now();
    let response = agent.process(&question, &options).await?;
    match response {
        QueryResponse::Summary(text) => println!("{}", text),
        QueryResponse::Rows(rows) => {
            let rendered = match cli.format {
                OutputFormat::Json => export::to_json(&rows),
                OutputFormat::Csv => export::to_csv(&rows),
                OutputFormat::Tsv => export::to_tsv(&rows),
            };
            print!("{}", rendered);
            if matches!(cli.format, OutputFormat::Json) {
                println!();
            }
            eprintln!("{} rows", rows.len());
        }
    }
    eprintln!("Completed in {:.2?}", start.elapsed());

    Ok(())
}

/// Prompt for the PostgreSQL password only when `prompt` is set and neither
/// the config nor `PGPASSWORD` supplied one.
fn resolve_password(
    config: &mut PostgresConfig,
    prompt: bool,
    read: impl FnOnce(&str) -> std::io::Result<String>,
) -> Result<()> {
    if !prompt || !config.password.is_empty() {
        return Ok(());
    }
    let message = format!("Password for {}: ", config.display_string());
    config.password = read(&message).context("Failed to read password")?;
    Ok(())
}
