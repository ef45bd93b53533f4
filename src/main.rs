use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use distil::ai::{prompts, BatchSummarizer, DistilOptions, LanguageModel, ModelClient};
use distil::error::{AppError, Result};
use distil::feed::{CollectOptions, Collector};
use distil::services::History;
use distil::web::{self, AppState};
use distil::Config;

#[derive(Debug, Parser)]
#[command(name = "distil", version, about = "Distil recent feeds and videos into a short digest")]
struct Cli {
    /// Show progress logs (INFO instead of WARN)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Collect content and write today's distil
    Run {
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override fetch.days_back
        #[arg(long)]
        days: Option<u32>,
    },
    /// Start the local web UI
    Serve {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 5001)]
        port: u16,
        /// Don't open a browser window
        #[arg(long)]
        no_browser: bool,
    },
    /// Write a starter config file
    Init {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let outcome = match cli.command {
        Command::Run { config, days } => interruptible(run(config, days)).await,
        // The server drains in-flight requests on Ctrl-C itself.
        Command::Serve {
            config,
            port,
            no_browser,
        } => serve(config, port, no_browser).await,
        Command::Init { config } => init(config),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn interruptible(task: impl Future<Output = Result<ExitCode>>) -> Result<ExitCode> {
    tokio::select! {
        outcome = task => outcome,
        _ = tokio::signal::ctrl_c() => {
            println!("\n👋 Interrupted, goodbye!");
            Ok(ExitCode::from(130))
        }
    }
}

async fn run(config_path: Option<PathBuf>, days: Option<u32>) -> Result<ExitCode> {
    let mut config = Config::load(config_path.as_deref())?;
    if let Some(days) = days {
        config.fetch.days_back = days;
    }

    println!(
        "🔍 Collecting content from {} feeds (last {} days)...",
        config.feeds.len(),
        config.fetch.days_back
    );
    let collection = Collector::new()?
        .collect(
            &config.feeds,
            &config.youtube.urls,
            &CollectOptions::from_config(&config),
        )
        .await;

    println!("{}", collection.health);

    if collection.items.is_empty() {
        println!("❌ No items collected. Try a larger --days value or check your feed URLs.");
        return Ok(ExitCode::FAILURE);
    }
    if collection.below_threshold {
        println!(
            "⚠️  Only {} items collected (minimum {}), continuing anyway",
            collection.items.len(),
            config.fetch.min_items
        );
    }

    let model: Arc<dyn LanguageModel> = Arc::new(ModelClient::from_config(&config.llm)?);
    let summarizer = BatchSummarizer::new(model);
    println!(
        "🤖 Generating distil from {} items with {}...",
        collection.items.len(),
        summarizer.model_id()
    );

    let markdown = match summarizer
        .summarize(
            &prompts::system_prompt(&config.domain.focus),
            &collection.items,
            &DistilOptions::from_config(&config),
        )
        .await
    {
        Ok(markdown) => markdown,
        Err(e) => {
            eprintln!("Error generating distil: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let path = History::new(config.output_dir()).save_daily(&markdown).await?;
    println!("✅ Distil saved to {}", path.display());
    Ok(ExitCode::SUCCESS)
}

async fn serve(config_path: Option<PathBuf>, port: u16, no_browser: bool) -> Result<ExitCode> {
    let config = Config::load(config_path.as_deref())?;
    let model: Arc<dyn LanguageModel> = Arc::new(ModelClient::from_config(&config.llm)?);
    let state = AppState::new(config, model)?;

    let listener = web::bind(port).await?;
    let url = format!("http://{}", listener.local_addr()?);
    println!("🌐 Distil web UI running at {} (Ctrl-C to stop)", url);

    if !no_browser {
        if let Err(e) = open::that(&url) {
            tracing::warn!("Could not open browser: {}", e);
        }
    }

    web::serve(listener, state).await?;
    println!("👋 Server stopped, goodbye!");
    Ok(ExitCode::SUCCESS)
}

fn init(config_path: Option<PathBuf>) -> Result<ExitCode> {
    let path = config_path.unwrap_or_else(Config::config_path);
    if path.exists() {
        return Err(AppError::Config(format!(
            "{} already exists, not overwriting",
            path.display()
        )));
    }

    Config::sample().save(&path)?;
    println!("✅ Wrote sample config to {}", path.display());
    println!("   Edit the feeds and [llm] model, then run `distil run`.");
    Ok(ExitCode::SUCCESS)
}
